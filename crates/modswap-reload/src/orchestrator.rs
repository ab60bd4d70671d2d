//! Hot reload orchestrator
//!
//! [`HotReloader`] drives one reload of a registered mod from start to
//! finish. It runs synchronously on the caller's thread and stops at the
//! first failing step; nothing done before that step is rolled back.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use modswap_host::is_module_file;
use modswap_kernel::adapter::HostAdapter;
use modswap_kernel::instance::ModInstance;
use modswap_kernel::module::{HookKind, ModuleLoader};
use modswap_kernel::trigger::{TriggerAction, TriggerSurface};

use crate::error::{ReloadError, ReloadResult};
use crate::migrator::{ConfigMigrator, MigrationReport};
use crate::registry::ReloadRegistry;
use crate::rewriter::IdentityRewriter;
use crate::settings::HotReloadSettings;
use crate::watcher::{ReplacementWatcher, WatchConfig};

/// Outcome of a successful reload
#[derive(Debug, Clone)]
pub struct ReloadReport {
    /// Full type name of the reloaded mod
    pub type_name: String,
    /// Module name the new binary was loaded under
    pub module_name: String,
    /// Replacement file that was loaded
    pub location: PathBuf,
    /// Reload count after this reload
    pub reload_count: u32,
    /// `None` when the new instance has no configuration
    pub migration: Option<MigrationReport>,
    pub duration: Duration,
}

pub struct HotReloader {
    settings: HotReloadSettings,
    adapter: Arc<dyn HostAdapter>,
    modules: Arc<dyn ModuleLoader>,
    registry: ReloadRegistry,
    watcher: Mutex<Option<ReplacementWatcher>>,
    self_ref: Weak<HotReloader>,
}

impl HotReloader {
    pub fn new(
        adapter: Arc<dyn HostAdapter>,
        modules: Arc<dyn ModuleLoader>,
        menu: Arc<dyn TriggerSurface>,
        settings: HotReloadSettings,
    ) -> Arc<Self> {
        info!("Hot reload using the {} host adapter", adapter.variant());
        Arc::new_cyclic(|self_ref| Self {
            registry: ReloadRegistry::new(menu, &settings.menu_path),
            settings,
            adapter,
            modules,
            watcher: Mutex::new(None),
            self_ref: self_ref.clone(),
        })
    }

    pub fn settings(&self) -> &HotReloadSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ReloadRegistry {
        &self.registry
    }

    pub fn adapter(&self) -> &Arc<dyn HostAdapter> {
        &self.adapter
    }

    /// Opt `instance` into hot reload and add its reload trigger
    pub fn register_for_hot_reload(&self, instance: &Arc<ModInstance>) -> ReloadResult<()> {
        let trigger = self.trigger_for(instance.type_name());
        self.registry.register(instance, trigger)?;

        if let Some(watcher) = self.watcher.lock().as_ref() {
            watcher.watch(&self.replacement_dir(instance))?;
        }
        Ok(())
    }

    pub fn reload_count_of_type(&self, type_name: &str) -> u32 {
        self.registry.reload_count_of_type(type_name)
    }

    /// Remove any menu action by path and label
    pub fn remove_menu_option(&self, path: &str, label: &str) -> bool {
        self.registry.menu().remove_action(path, label)
    }

    fn trigger_for(&self, type_name: &str) -> TriggerAction {
        let reloader = self.self_ref.clone();
        let type_name = type_name.to_string();
        Arc::new(move || {
            let Some(reloader) = reloader.upgrade() else {
                return;
            };
            match reloader.hot_reload(&type_name) {
                Ok(report) => info!(
                    "Hot reloaded {} as {} (reload {}) in {:?}",
                    report.type_name, report.module_name, report.reload_count, report.duration
                ),
                Err(e) => error!("Hot reload of {} failed: {}", type_name, e),
            }
        })
    }

    /// Replacement directory next to the file `instance` was loaded from
    pub fn replacement_dir(&self, instance: &ModInstance) -> PathBuf {
        instance
            .location()
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&self.settings.watched_directory)
    }

    /// Locate the replacement for `original` in the watched directory
    ///
    /// The file name is matched ignoring case, among module files only.
    pub fn find_replacement(&self, original: &ModInstance) -> ReloadResult<PathBuf> {
        let dir = self.replacement_dir(original);
        if !dir.is_dir() {
            return Err(ReloadError::WatchedDirectoryMissing(dir));
        }

        let Some(file_name) = original.location().file_name().and_then(|n| n.to_str()) else {
            return Err(ReloadError::ReplacementMissing(dir));
        };
        let expected = dir.join(file_name);

        let found = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_module_file(path, &self.settings.module_extension))
            .find(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.eq_ignore_ascii_case(file_name))
                    .unwrap_or(false)
            });

        found.ok_or(ReloadError::ReplacementMissing(expected))
    }

    /// Reload the mod registered under `type_name` from its replacement file
    pub fn hot_reload(&self, type_name: &str) -> ReloadResult<ReloadReport> {
        let started = Instant::now();
        info!("Hot reloading {}", type_name);

        let entry = self
            .registry
            .entry_for_type(type_name)
            .ok_or_else(|| ReloadError::NotRegistered(type_name.to_string()))?;
        let original = entry.original;
        let current = entry.current;

        let location = self.find_replacement(&original)?;
        debug!("Found replacement {}", location.display());

        if !current.module().has_hook(HookKind::Teardown) {
            return Err(ReloadError::MissingTeardownHook {
                type_name: type_name.to_string(),
            });
        }

        self.registry.remove_trigger(&current);

        debug!("Running teardown hook of {}", current.module_name());
        current.module().invoke_teardown()?;

        let rewritten = IdentityRewriter::rewrite(&location)?;
        let module = self
            .modules
            .load_image(rewritten.bytes, &location)
            .map_err(ReloadError::LoadFailed)?;

        let Some(mod_type) = module.find_mod_type(type_name).cloned() else {
            return Err(ReloadError::ModTypeNotFound {
                type_name: type_name.to_string(),
                module: module.name().to_string(),
            });
        };
        if !module.has_hook(HookKind::Startup) {
            return Err(ReloadError::MissingStartupHook {
                module: module.name().to_string(),
            });
        }

        let instance = self
            .adapter
            .load_and_register(&current, &location, module.clone(), &mod_type)?;
        match self.adapter.resolve_module(module.name()) {
            Some(resolved) if Arc::ptr_eq(&resolved, &instance) => {}
            _ => warn!(
                "{} adapter does not resolve module {} to the new instance",
                self.adapter.variant(),
                module.name()
            ),
        }

        let migration = ConfigMigrator::hand_off(&original, &instance);

        let reload_count = self.registry.bump_count(&current)?;
        self.registry
            .rebind_trigger(&current, &instance, self.trigger_for(type_name))?;

        debug!("Running startup hook of {}", module.name());
        module.invoke_startup(original.handle())?;

        let report = ReloadReport {
            type_name: type_name.to_string(),
            module_name: module.name().to_string(),
            location,
            reload_count,
            migration,
            duration: started.elapsed(),
        };
        info!(
            "Hot reload of {} complete: module {}, reload {}",
            type_name, report.module_name, reload_count
        );
        Ok(report)
    }

    /// Watch the replacement directories of every registered mod
    ///
    /// Mods registered later are watched as they register.
    pub fn start_watching(&self) -> ReloadResult<()> {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            return Ok(());
        }

        let watcher = ReplacementWatcher::new(WatchConfig::from_settings(&self.settings))?;
        for entry in self.registry.entries() {
            watcher.watch(&self.replacement_dir(&entry.original))?;
        }
        *slot = Some(watcher);
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Drain queued watcher events and react to changed replacement files
    ///
    /// With `auto_reload` each affected mod is reloaded once; otherwise the
    /// change is only logged. Returns the outcome of every reload attempted.
    pub fn process_watch_events(&self) -> Vec<(String, ReloadResult<ReloadReport>)> {
        let events = match self.watcher.lock().as_ref() {
            Some(watcher) => watcher.drain(),
            None => return Vec::new(),
        };

        let mut changed: Vec<String> = Vec::new();
        for event in events.iter().filter(|e| e.is_replacement()) {
            for entry in self.registry.entries() {
                let type_name = entry.original.type_name();
                if self.is_replacement_of(&event.path, &entry.original)
                    && !changed.iter().any(|t| t == type_name)
                {
                    changed.push(type_name.to_string());
                }
            }
        }

        if !self.settings.auto_reload {
            for type_name in &changed {
                info!("Replacement for {} is ready; trigger its reload from the menu", type_name);
            }
            return Vec::new();
        }

        changed
            .into_iter()
            .map(|type_name| {
                let result = self.hot_reload(&type_name);
                if let Err(e) = &result {
                    error!("Automatic reload of {} failed: {}", type_name, e);
                }
                (type_name, result)
            })
            .collect()
    }

    fn is_replacement_of(&self, path: &Path, original: &ModInstance) -> bool {
        let same_dir = path.parent() == Some(self.replacement_dir(original).as_path());
        let same_name = match (path.file_name(), original.location().file_name()) {
            (Some(a), Some(b)) => match (a.to_str(), b.to_str()) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => a == b,
            },
            _ => false,
        };
        same_dir && same_name
    }
}
