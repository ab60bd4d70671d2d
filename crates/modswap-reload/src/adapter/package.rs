//! Adapter for the package loader: one record per package
//!
//! The previous package is shut down through the loader's lifecycle API and
//! a stand-in package wrapping the new instance takes its id.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use modswap_host::{MemoryFileSystem, ModPackage, PackageLoader, PackageVersion};
use modswap_kernel::adapter::{AdapterError, HostAdapter};
use modswap_kernel::instance::{ModInstance, Registration};
use modswap_kernel::manifest::ModTypeDescriptor;
use modswap_kernel::module::LoadedModule;

use super::host_error;

/// Description of packages created by hot reload
pub const HOT_RELOAD_DESCRIPTION: &str = "Hot Reloaded Mod";

pub struct PackageLoaderAdapter {
    loader: Arc<PackageLoader>,
}

impl PackageLoaderAdapter {
    pub fn new(loader: Arc<PackageLoader>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &Arc<PackageLoader> {
        &self.loader
    }

    fn package_id(&self, previous: &Arc<ModInstance>) -> String {
        if let Some(package) = self.loader.package_of(previous) {
            return package.id().to_string();
        }
        match previous.registration() {
            Some(Registration::Package { id, .. }) => id,
            _ => previous.type_name().to_string(),
        }
    }
}

fn package_version(mod_type: &ModTypeDescriptor) -> PackageVersion {
    match mod_type.version.as_deref() {
        Some(version) => PackageVersion::parse(version).unwrap_or_else(|e| {
            warn!("{}; using 1.0.0", e);
            PackageVersion::new(1, 0, 0)
        }),
        None => PackageVersion::new(1, 0, 0),
    }
}

impl HostAdapter for PackageLoaderAdapter {
    fn variant(&self) -> &'static str {
        "package"
    }

    fn load_and_register(
        &self,
        previous: &Arc<ModInstance>,
        location: &Path,
        module: Arc<dyn LoadedModule>,
        mod_type: &ModTypeDescriptor,
    ) -> Result<Arc<ModInstance>, AdapterError> {
        let id = self.package_id(previous);
        let old_package = self
            .loader
            .shutdown_mod(&id)
            .map_err(|e| AdapterError::Shutdown {
                type_name: mod_type.type_name.clone(),
                message: e.to_string(),
            })?;

        let module_name = module.name().to_string();
        let version = package_version(mod_type);
        let instance = ModInstance::construct(mod_type.clone(), module, location).map_err(
            |source| AdapterError::Construct {
                type_name: mod_type.type_name.clone(),
                source,
            },
        )?;
        instance.set_registration(Registration::Package {
            id: id.clone(),
            version: version.to_string(),
        });
        let instance = Arc::new(instance);

        let file_system = MemoryFileSystem::new(&format!("Dummy FileSystem for {id}"));
        let mut package = ModPackage::new(&id, version, file_system)
            .with_project_url(mod_type.link.as_deref().and_then(|l| Url::parse(l).ok()))
            .with_icon_url(old_package.icon_url().cloned())
            .with_target_framework(old_package.target_framework())
            .with_description(HOT_RELOAD_DESCRIPTION)
            .with_hot_reload_support(false)
            .with_mod(instance.clone());
        if let Some(author) = mod_type.author.as_deref() {
            package = package.with_author(author);
        }

        self.loader
            .add_mod(Arc::new(package))
            .map_err(|e| host_error(&mod_type.type_name, e))?;
        self.loader
            .insert_module_lookup(&module_name, instance.clone());
        instance.mark_finished_loading();

        debug!("Replaced package {} with {}", id, module_name);
        Ok(instance)
    }

    fn remove_registration(&self, instance: &Arc<ModInstance>) -> Result<(), AdapterError> {
        let package = self
            .loader
            .package_of(instance)
            .ok_or_else(|| AdapterError::NotRegistered(instance.type_name().to_string()))?;
        self.loader
            .shutdown_mod(package.id())
            .map(|_| ())
            .map_err(|e| host_error(instance.type_name(), e))
    }

    fn resolve_module(&self, module_name: &str) -> Option<Arc<ModInstance>> {
        self.loader.module_lookup(module_name)
    }

    fn loaded_mods(&self) -> Vec<Arc<ModInstance>> {
        self.loader.loaded_mods()
    }
}
