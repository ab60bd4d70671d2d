//! modswap Reload
//!
//! In-process hot reload for mods. A developer drops a rebuilt module into
//! the `HotReloadMods` directory next to the mod's file and triggers a
//! reload; the [`HotReloader`]:
//!
//! 1. runs the old module's `before_hot_reload` hook,
//! 2. rewrites the new module's identity so the module system accepts it,
//! 3. registers the new instance through a [`HostAdapter`],
//! 4. carries configuration values over to the new instance,
//! 5. rebinds the reload trigger and runs `on_hot_reload`.
//!
//! ```rust,ignore
//! use modswap_host::{ActionMenu, ModLoader, WasmModuleSystem};
//! use modswap_reload::{HotReloadSettings, HotReloader, SimpleLoaderAdapter};
//!
//! let modules = Arc::new(WasmModuleSystem::new()?);
//! let loader = Arc::new(ModLoader::new(modules.clone()));
//! let reloader = HotReloader::new(
//!     Arc::new(SimpleLoaderAdapter::new(loader.clone())),
//!     modules,
//!     Arc::new(ActionMenu::initialized()),
//!     HotReloadSettings::default(),
//! );
//! for instance in loader.load_mods(mods_dir)? {
//!     reloader.register_for_hot_reload(&instance)?;
//! }
//! ```
//!
//! [`HostAdapter`]: modswap_kernel::adapter::HostAdapter

pub mod adapter;
pub mod conversion;
pub mod error;
pub mod migrator;
pub mod orchestrator;
pub mod registry;
pub mod rewriter;
pub mod settings;
pub mod watcher;


pub use adapter::{PackageLoaderAdapter, SimpleLoaderAdapter};
pub use conversion::{ConversionError, convert};
pub use error::{ReloadError, ReloadResult};
pub use migrator::{ConfigMigrator, MigrationReport, SkipReason, SkippedKey};
pub use orchestrator::{HotReloader, ReloadReport};
pub use registry::{RegistryEntry, ReloadRegistry, trigger_label};
pub use rewriter::{IdentityRewriter, RewriteError, RewrittenImage, next_suffix};
pub use settings::{HotReloadSettings, SettingsError};
pub use watcher::{ReplacementWatcher, WatchConfig, WatchError, WatchEvent, WatchEventKind};
