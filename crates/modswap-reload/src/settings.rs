//! Hot reload settings
//!
//! Loaded from a YAML, TOML or JSON file through the kernel's settings
//! loader, with `MODSWAP_*` environment overrides:
//!
//! ```yaml
//! watched_directory: HotReloadMods
//! menu_path: Hot Reload Mods
//! auto_reload: true
//! debounce_ms: 250
//! ```

use std::path::Path;
use std::time::Duration;

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};

use modswap_kernel::config::{load_env, load_with_env};
use modswap_kernel::error::{KernelError, KernelResult};

/// Default name of the replacement directory next to the mods directory
pub const DEFAULT_WATCHED_DIRECTORY: &str = "HotReloadMods";

/// Default category path of reload triggers in the action menu
pub const DEFAULT_MENU_PATH: &str = "Hot Reload Mods";

/// Prefix of environment overrides, e.g. `MODSWAP_AUTO_RELOAD=true`
pub const ENV_PREFIX: &str = "MODSWAP";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("Watched directory must be a single path component, got {0:?}")]
    InvalidWatchedDirectory(String),

    #[error("Menu path must not be empty")]
    EmptyMenuPath,

    #[error("Module extension must not be empty")]
    EmptyModuleExtension,
}

/// Hot reload settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotReloadSettings {
    /// Replacement directory name, resolved next to each mod's file
    pub watched_directory: String,
    /// Menu category the reload triggers are added under
    pub menu_path: String,
    /// Extension of module files, without the dot
    pub module_extension: String,
    /// Reload as soon as the watcher sees a replacement file change
    pub auto_reload: bool,
    /// Watcher debounce window in milliseconds
    pub debounce_ms: u64,
    /// File name patterns the watcher ignores
    pub ignore_patterns: Vec<String>,
}

impl Default for HotReloadSettings {
    fn default() -> Self {
        Self {
            watched_directory: DEFAULT_WATCHED_DIRECTORY.to_string(),
            menu_path: DEFAULT_MENU_PATH.to_string(),
            module_extension: "wasm".to_string(),
            auto_reload: false,
            debounce_ms: 500,
            ignore_patterns: vec!["*.tmp".to_string(), "*.swp".to_string(), "*~".to_string()],
        }
    }
}

impl HotReloadSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watched_directory(mut self, name: &str) -> Self {
        self.watched_directory = name.to_string();
        self
    }

    pub fn with_menu_path(mut self, path: &str) -> Self {
        self.menu_path = path.to_string();
        self
    }

    pub fn with_module_extension(mut self, extension: &str) -> Self {
        self.module_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn with_auto_reload(mut self, enabled: bool) -> Self {
        self.auto_reload = enabled;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = debounce.as_millis() as u64;
        self
    }

    pub fn with_ignore_pattern(mut self, pattern: &str) -> Self {
        self.ignore_patterns.push(pattern.to_string());
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Check values the loader cannot express as types
    pub fn validate(&self) -> Result<(), SettingsError> {
        let watched = Path::new(&self.watched_directory);
        if self.watched_directory.is_empty() || watched.components().count() != 1 {
            return Err(SettingsError::InvalidWatchedDirectory(
                self.watched_directory.clone(),
            ));
        }
        if self.menu_path.trim().is_empty() {
            return Err(SettingsError::EmptyMenuPath);
        }
        if self.module_extension.is_empty() {
            return Err(SettingsError::EmptyModuleExtension);
        }
        Ok(())
    }

    /// Load settings from a file with environment overrides
    pub fn load(path: impl AsRef<Path>) -> KernelResult<Self> {
        let path = path.as_ref();
        let settings: Self = load_with_env(path, ENV_PREFIX)
            .map_err(KernelError::from)
            .map_err(Report::new)
            .attach(format!("loading hot reload settings from {}", path.display()))?;

        settings
            .validate()
            .map_err(|e| Report::new(KernelError::Internal(e.to_string())))
            .attach(format!("validating {}", path.display()))?;
        Ok(settings)
    }

    /// Defaults with `MODSWAP_*` environment overrides, for hosts without a settings file
    pub fn from_env() -> KernelResult<Self> {
        Self::from_env_prefix(ENV_PREFIX)
    }

    fn from_env_prefix(prefix: &str) -> KernelResult<Self> {
        let settings: Self = load_env(prefix)
            .map_err(KernelError::from)
            .map_err(Report::new)
            .attach(format!("reading {prefix}_* hot reload settings"))?;

        settings
            .validate()
            .map_err(|e| Report::new(KernelError::Internal(e.to_string())))
            .attach(format!("validating {prefix}_* hot reload settings"))?;
        Ok(settings)
    }
}
