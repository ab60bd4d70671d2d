use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use modswap_host::{ActionMenu, ModLoader, PackageLoader, WasmModule, WasmModuleSystem};
use modswap_kernel::adapter::HostAdapter;
use modswap_kernel::instance::ModInstance;
use modswap_reload::{HotReloadSettings, HotReloader, PackageLoaderAdapter, SimpleLoaderAdapter};

use crate::fixture::ModFixture;

/// Host loader layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Simple,
    Package,
}

enum Loader {
    Simple(Arc<ModLoader>),
    Package(Arc<PackageLoader>),
}

/// A host over a temporary mods directory
pub struct TestHost {
    dir: TempDir,
    modules: Arc<WasmModuleSystem>,
    loader: Loader,
    menu: Arc<ActionMenu>,
    reloader: Arc<HotReloader>,
}

impl TestHost {
    pub fn new(variant: Variant) -> anyhow::Result<Self> {
        Self::with_settings(variant, HotReloadSettings::default())
    }

    pub fn with_settings(variant: Variant, settings: HotReloadSettings) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let modules = Arc::new(WasmModuleSystem::new()?);
        let menu = Arc::new(ActionMenu::initialized());

        let (loader, adapter): (Loader, Arc<dyn HostAdapter>) = match variant {
            Variant::Simple => {
                let loader = Arc::new(ModLoader::new(modules.clone()));
                (
                    Loader::Simple(loader.clone()),
                    Arc::new(SimpleLoaderAdapter::new(loader)),
                )
            }
            Variant::Package => {
                let loader = Arc::new(PackageLoader::new(modules.clone()));
                (
                    Loader::Package(loader.clone()),
                    Arc::new(PackageLoaderAdapter::new(loader)),
                )
            }
        };

        let reloader = HotReloader::new(adapter, modules.clone(), menu.clone(), settings);
        Ok(Self {
            dir,
            modules,
            loader,
            menu,
            reloader,
        })
    }

    pub fn mods_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.dir
            .path()
            .join(&self.reloader.settings().watched_directory)
    }

    pub fn reloader(&self) -> &Arc<HotReloader> {
        &self.reloader
    }

    pub fn menu(&self) -> &Arc<ActionMenu> {
        &self.menu
    }

    pub fn modules(&self) -> &Arc<WasmModuleSystem> {
        &self.modules
    }

    pub fn package_loader(&self) -> Option<&Arc<PackageLoader>> {
        match &self.loader {
            Loader::Package(loader) => Some(loader),
            Loader::Simple(_) => None,
        }
    }

    /// Write `fixture` to `<mods>/<file_name>` and load it through the host loader
    pub fn install(&self, file_name: &str, fixture: &ModFixture) -> anyhow::Result<Vec<Arc<ModInstance>>> {
        let path = self.dir.path().join(file_name);
        fixture.write(&path)?;
        let instances = match &self.loader {
            Loader::Simple(loader) => {
                let before = loader.loaded_mods().len();
                loader.load_mods(self.dir.path())?;
                loader.loaded_mods().split_off(before)
            }
            Loader::Package(loader) => loader.load_package(&path)?.mods().to_vec(),
        };
        Ok(instances)
    }

    /// Install `fixture` and register its first mod for hot reload
    pub fn install_registered(&self, file_name: &str, fixture: &ModFixture) -> anyhow::Result<Arc<ModInstance>> {
        let instance = self
            .install(file_name, fixture)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("{file_name} declares no mods"))?;
        self.reloader.register_for_hot_reload(&instance)?;
        Ok(instance)
    }

    /// Write `fixture` into the replacement directory as `file_name`
    pub fn stage(&self, file_name: &str, fixture: &ModFixture) -> anyhow::Result<PathBuf> {
        let staging = self.staging_dir();
        std::fs::create_dir_all(&staging)?;
        let path = staging.join(file_name);
        fixture.write(&path)?;
        Ok(path)
    }

    pub fn loaded_mods(&self) -> Vec<Arc<ModInstance>> {
        self.reloader.adapter().loaded_mods()
    }

    pub fn labels(&self) -> Vec<String> {
        self.menu.labels(&self.reloader.settings().menu_path)
    }

    /// Invoke the reload trigger labelled `label`
    pub fn invoke(&self, label: &str) -> bool {
        self.menu.invoke(&self.reloader.settings().menu_path, label)
    }

    pub fn current(&self, type_name: &str) -> Option<Arc<ModInstance>> {
        self.reloader.registry().find_by_type_name(type_name)
    }

    pub fn wasm_module(&self, name: &str) -> Option<Arc<WasmModule>> {
        self.modules.wasm_module(name)
    }

    /// How often the teardown hook of module `name` ran
    pub fn teardown_count(&self, name: &str) -> i32 {
        self.wasm_module(name)
            .and_then(|m| m.global_i32("torn_down"))
            .unwrap_or(0)
    }

    /// Handles the startup hook of module `name` was called with
    pub fn startup_handles(&self, name: &str) -> Vec<i64> {
        self.wasm_module(name).map(|m| m.traces()).unwrap_or_default()
    }
}
