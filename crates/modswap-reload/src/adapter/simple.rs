//! Adapter for the simple loader: one record per module file

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use modswap_host::ModLoader;
use modswap_kernel::adapter::{AdapterError, HostAdapter};
use modswap_kernel::instance::{ModInstance, Registration};
use modswap_kernel::manifest::ModTypeDescriptor;
use modswap_kernel::module::LoadedModule;

use super::host_error;

pub struct SimpleLoaderAdapter {
    loader: Arc<ModLoader>,
}

impl SimpleLoaderAdapter {
    pub fn new(loader: Arc<ModLoader>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &Arc<ModLoader> {
        &self.loader
    }
}

impl HostAdapter for SimpleLoaderAdapter {
    fn variant(&self) -> &'static str {
        "simple"
    }

    fn load_and_register(
        &self,
        _previous: &Arc<ModInstance>,
        location: &Path,
        module: Arc<dyn LoadedModule>,
        mod_type: &ModTypeDescriptor,
    ) -> Result<Arc<ModInstance>, AdapterError> {
        let module_name = module.name().to_string();
        let file = Registration::AssemblyFile {
            file: location.to_path_buf(),
            sha256: None,
        };
        let instance = self
            .loader
            .initialize_mod(module, mod_type, file)
            .map_err(|e| host_error(&mod_type.type_name, e))?;

        // the name lookup refuses a second mod with the same name, so it keeps the original
        self.loader.insert_loaded(instance.clone());
        self.loader
            .insert_assembly_lookup(&module_name, instance.clone());
        instance.mark_finished_loading();

        debug!(
            "Registered {} from {} with the simple loader",
            instance.type_name(),
            module_name
        );
        Ok(instance)
    }

    fn remove_registration(&self, instance: &Arc<ModInstance>) -> Result<(), AdapterError> {
        if self.loader.remove_mod(instance) {
            Ok(())
        } else {
            Err(AdapterError::NotRegistered(instance.type_name().to_string()))
        }
    }

    fn resolve_module(&self, module_name: &str) -> Option<Arc<ModInstance>> {
        self.loader.assembly_lookup(module_name)
    }

    fn loaded_mods(&self) -> Vec<Arc<ModInstance>> {
        self.loader.loaded_mods()
    }
}
