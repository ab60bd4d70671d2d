//! Simple mod loader
//!
//! One record per module file. The loader keeps three tables: the list of
//! loaded mods, a module-name lookup used to find the mod a module defines,
//! and a mod-name lookup that refuses two mods with the same name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use modswap_kernel::instance::{ModInstance, Registration};
use modswap_kernel::manifest::ModTypeDescriptor;
use modswap_kernel::module::LoadedModule;

use crate::error::{HostError, HostResult};
use crate::module_system::WasmModuleSystem;

/// Default extension of module files
pub const MODULE_EXTENSION: &str = "wasm";

/// Whether `path` has the module extension, ignoring case
pub fn is_module_file(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Hex SHA-256 of a module image
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub struct ModLoader {
    modules: Arc<WasmModuleSystem>,
    loaded_mods: RwLock<Vec<Arc<ModInstance>>>,
    assembly_lookup: RwLock<HashMap<String, Arc<ModInstance>>>,
    name_lookup: RwLock<HashMap<String, Arc<ModInstance>>>,
}

impl ModLoader {
    pub fn new(modules: Arc<WasmModuleSystem>) -> Self {
        Self {
            modules,
            loaded_mods: RwLock::new(Vec::new()),
            assembly_lookup: RwLock::new(HashMap::new()),
            name_lookup: RwLock::new(HashMap::new()),
        }
    }

    pub fn modules(&self) -> &Arc<WasmModuleSystem> {
        &self.modules
    }

    /// Load every module file in `dir` and register the mods they declare
    ///
    /// Files that fail to load are logged and skipped.
    pub fn load_mods(&self, dir: &Path) -> HostResult<Vec<Arc<ModInstance>>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_module_file(path, MODULE_EXTENSION))
            .collect();
        files.sort();

        let mut loaded = Vec::new();
        for file in files {
            match self.load_mod_file(&file) {
                Ok(mut instances) => loaded.append(&mut instances),
                Err(e) => warn!("Skipping {}: {}", file.display(), e),
            }
        }

        info!("Loaded {} mods from {}", loaded.len(), dir.display());
        Ok(loaded)
    }

    fn load_mod_file(&self, file: &Path) -> HostResult<Vec<Arc<ModInstance>>> {
        let bytes = std::fs::read(file)?;
        let sha256 = sha256_hex(&bytes);
        let module: Arc<dyn LoadedModule> = self.modules.load_wasm(bytes, file)?;

        let mut instances = Vec::new();
        for descriptor in &module.manifest().mods {
            let instance = self.initialize_mod(
                module.clone(),
                descriptor,
                Registration::AssemblyFile {
                    file: file.to_path_buf(),
                    sha256: Some(sha256.clone()),
                },
            )?;
            self.register_mod(&instance)?;
            instances.push(instance);
        }
        Ok(instances)
    }

    /// Construct a mod instance and attach its file record
    pub fn initialize_mod(
        &self,
        module: Arc<dyn LoadedModule>,
        descriptor: &ModTypeDescriptor,
        file: Registration,
    ) -> HostResult<Arc<ModInstance>> {
        let location = match &file {
            Registration::AssemblyFile { file, .. } => file.clone(),
            Registration::Package { .. } => module.location().to_path_buf(),
        };
        let instance = ModInstance::construct(descriptor.clone(), module, &location)?;
        instance.set_registration(file);
        debug!(
            "Initialized mod {} from module {}",
            instance.type_name(),
            instance.module_name()
        );
        Ok(Arc::new(instance))
    }

    /// Full registration: name lookup, loaded list, module lookup
    pub fn register_mod(&self, instance: &Arc<ModInstance>) -> HostResult<()> {
        let key = instance
            .name()
            .unwrap_or_else(|| instance.type_name())
            .to_string();
        {
            let mut names = self.name_lookup.write();
            if names.contains_key(&key) {
                return Err(HostError::DuplicateModName(key));
            }
            names.insert(key, instance.clone());
        }
        self.insert_loaded(instance.clone());
        self.insert_assembly_lookup(instance.module_name(), instance.clone());
        instance.mark_finished_loading();
        Ok(())
    }

    pub fn insert_loaded(&self, instance: Arc<ModInstance>) {
        self.loaded_mods.write().push(instance);
    }

    pub fn insert_assembly_lookup(&self, module_name: &str, instance: Arc<ModInstance>) {
        self.assembly_lookup
            .write()
            .insert(module_name.to_string(), instance);
    }

    /// Remove an instance from every table; false if it was not loaded
    pub fn remove_mod(&self, instance: &Arc<ModInstance>) -> bool {
        let mut loaded = self.loaded_mods.write();
        let before = loaded.len();
        loaded.retain(|m| !Arc::ptr_eq(m, instance));
        let removed = loaded.len() != before;
        drop(loaded);

        self.assembly_lookup
            .write()
            .retain(|_, m| !Arc::ptr_eq(m, instance));
        self.name_lookup
            .write()
            .retain(|_, m| !Arc::ptr_eq(m, instance));
        removed
    }

    pub fn loaded_mods(&self) -> Vec<Arc<ModInstance>> {
        self.loaded_mods.read().clone()
    }

    pub fn assembly_lookup(&self, module_name: &str) -> Option<Arc<ModInstance>> {
        self.assembly_lookup.read().get(module_name).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<ModInstance>> {
        self.name_lookup.read().get(name).cloned()
    }
}
