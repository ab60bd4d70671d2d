//! wasmtime-backed module system
//!
//! Compiles and instantiates mod modules and keeps them in a table keyed by
//! their self-declared module name. Loading a second module under a name that
//! is already present is refused, so a rebuilt module can only be loaded
//! after its identity has been rewritten.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};
use wasmtime::{Caller, Config, Engine, ExternType, Instance, Linker, Module, Store, ValType};

use modswap_kernel::image::ModuleImage;
use modswap_kernel::instance::InstanceHandle;
use modswap_kernel::manifest::ModManifest;
use modswap_kernel::module::{
    HookError, HookKind, LoadedModule, ModuleError, ModuleLoader, STARTUP_HOOK, TEARDOWN_HOOK,
};

use crate::error::{HostError, HostResult};

/// Import namespace of host functions offered to mods
pub const HOST_NAMESPACE: &str = "modswap";

/// Per-store state
#[derive(Debug, Default)]
pub struct ModuleState {
    /// Values passed to `modswap.trace`
    pub traces: Vec<i64>,
}

struct ModuleRuntime {
    store: Store<ModuleState>,
    instance: Instance,
}

/// A compiled, instantiated mod module
pub struct WasmModule {
    name: String,
    location: PathBuf,
    manifest: ModManifest,
    module: Module,
    runtime: Mutex<ModuleRuntime>,
}

impl WasmModule {
    fn export_takes(&self, name: &str, takes_handle: bool) -> bool {
        match self.module.get_export(name) {
            Some(ExternType::Func(ty)) => {
                let params: Vec<ValType> = ty.params().collect();
                let params_match = if takes_handle {
                    matches!(params.as_slice(), [ValType::I64])
                } else {
                    params.is_empty()
                };
                params_match && ty.results().len() == 0
            }
            _ => false,
        }
    }

    /// Names of all exports
    pub fn exports(&self) -> Vec<String> {
        self.module
            .exports()
            .map(|export| export.name().to_string())
            .collect()
    }

    /// Current value of an exported `i32` global
    pub fn global_i32(&self, name: &str) -> Option<i32> {
        let mut runtime = self.runtime.lock();
        let ModuleRuntime { store, instance } = &mut *runtime;
        let global = instance.get_global(&mut *store, name)?;
        global.get(&mut *store).i32()
    }

    /// Values the module has passed to `modswap.trace`
    pub fn traces(&self) -> Vec<i64> {
        self.runtime.lock().store.data().traces.clone()
    }

    fn hook_error(&self, hook: HookKind, error: wasmtime::Error) -> HookError {
        HookError::Trapped {
            module: self.name.clone(),
            hook,
            message: format!("{error:#}"),
        }
    }

    fn missing(&self, hook: HookKind) -> HookError {
        HookError::Missing {
            module: self.name.clone(),
            hook,
        }
    }
}

impl fmt::Debug for WasmModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmModule")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("mods", &self.manifest.mods.len())
            .finish()
    }
}

impl LoadedModule for WasmModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn manifest(&self) -> &ModManifest {
        &self.manifest
    }

    fn has_hook(&self, hook: HookKind) -> bool {
        match hook {
            HookKind::Teardown => self.export_takes(TEARDOWN_HOOK, false),
            HookKind::Startup => self.export_takes(STARTUP_HOOK, true),
        }
    }

    fn invoke_teardown(&self) -> Result<(), HookError> {
        if !self.has_hook(HookKind::Teardown) {
            return Err(self.missing(HookKind::Teardown));
        }
        let mut runtime = self.runtime.lock();
        let ModuleRuntime { store, instance } = &mut *runtime;
        let func = instance
            .get_typed_func::<(), ()>(&mut *store, TEARDOWN_HOOK)
            .map_err(|e| self.hook_error(HookKind::Teardown, e))?;
        func.call(&mut *store, ())
            .map_err(|e| self.hook_error(HookKind::Teardown, e))
    }

    fn invoke_startup(&self, original: InstanceHandle) -> Result<(), HookError> {
        if !self.has_hook(HookKind::Startup) {
            return Err(self.missing(HookKind::Startup));
        }
        let mut runtime = self.runtime.lock();
        let ModuleRuntime { store, instance } = &mut *runtime;
        let func = instance
            .get_typed_func::<i64, ()>(&mut *store, STARTUP_HOOK)
            .map_err(|e| self.hook_error(HookKind::Startup, e))?;
        func.call(&mut *store, original.as_abi())
            .map_err(|e| self.hook_error(HookKind::Startup, e))
    }
}

/// The host's module system
pub struct WasmModuleSystem {
    engine: Engine,
    linker: Linker<ModuleState>,
    modules: RwLock<HashMap<String, Arc<WasmModule>>>,
}

impl WasmModuleSystem {
    pub fn new() -> HostResult<Self> {
        let engine = Engine::new(&Config::new())
            .map_err(|e| HostError::Engine(format!("Failed to create engine: {e}")))?;

        let mut linker = Linker::new(&engine);
        linker
            .func_wrap(
                HOST_NAMESPACE,
                "trace",
                |mut caller: Caller<'_, ModuleState>, value: i64| {
                    debug!("mod trace: {}", value);
                    caller.data_mut().traces.push(value);
                },
            )
            .map_err(|e| HostError::Engine(e.to_string()))?;

        Ok(Self {
            engine,
            linker,
            modules: RwLock::new(HashMap::new()),
        })
    }

    /// Load a module from memory; `location` is the file it stands for
    pub fn load_wasm(&self, bytes: Vec<u8>, location: &Path) -> Result<Arc<WasmModule>, ModuleError> {
        let image = ModuleImage::parse(&bytes)?;
        let name = match image.module_name()? {
            Some(name) => name,
            None => file_stem(location),
        };
        let manifest =
            ModManifest::from_image(&image)?.ok_or_else(|| ModuleError::NoManifest(name.clone()))?;

        if self.modules.read().contains_key(&name) {
            return Err(ModuleError::DuplicateIdentity(name));
        }

        let module = Module::new(&self.engine, &bytes).map_err(|e| ModuleError::Compile {
            name: name.clone(),
            message: format!("{e:#}"),
        })?;
        let mut store = Store::new(&self.engine, ModuleState::default());
        let instance =
            self.linker
                .instantiate(&mut store, &module)
                .map_err(|e| ModuleError::Instantiate {
                    name: name.clone(),
                    message: format!("{e:#}"),
                })?;

        let loaded = Arc::new(WasmModule {
            name: name.clone(),
            location: location.to_path_buf(),
            manifest,
            module,
            runtime: Mutex::new(ModuleRuntime { store, instance }),
        });

        let mut modules = self.modules.write();
        if modules.contains_key(&name) {
            return Err(ModuleError::DuplicateIdentity(name));
        }
        modules.insert(name.clone(), loaded.clone());
        drop(modules);

        info!("Loaded module {} from {}", name, location.display());
        Ok(loaded)
    }

    /// Loaded module by name, with its concrete type
    pub fn wasm_module(&self, name: &str) -> Option<Arc<WasmModule>> {
        self.modules.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}

impl ModuleLoader for WasmModuleSystem {
    fn load_image(
        &self,
        bytes: Vec<u8>,
        location: &Path,
    ) -> Result<Arc<dyn LoadedModule>, ModuleError> {
        let module: Arc<dyn LoadedModule> = self.load_wasm(bytes, location)?;
        Ok(module)
    }

    fn module(&self, name: &str) -> Option<Arc<dyn LoadedModule>> {
        self.wasm_module(name)
            .map(|module| module as Arc<dyn LoadedModule>)
    }

    fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
        names.sort();
        names
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
