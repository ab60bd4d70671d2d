//! Hot reload errors

use std::path::PathBuf;

use modswap_kernel::adapter::AdapterError;
use modswap_kernel::module::{HookError, ModuleError};

use crate::rewriter::RewriteError;

/// Errors that abort a hot reload, or reject a registration
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ReloadError {
    #[error("Mod {0} is already registered for hot reload")]
    AlreadyRegistered(String),

    #[error("Mod {0} is not registered for hot reload")]
    NotRegistered(String),

    #[error("Mod instance {0} is not tracked by the reload registry")]
    NotTracked(String),

    #[error("Hot reload directory does not exist: {}", .0.display())]
    WatchedDirectoryMissing(PathBuf),

    #[error("Replacement module file does not exist: {}", .0.display())]
    ReplacementMissing(PathBuf),

    #[error("Mod {type_name} does not export the teardown hook")]
    MissingTeardownHook { type_name: String },

    #[error("Module {module} does not export the startup hook")]
    MissingStartupHook { module: String },

    #[error("Module {module} does not declare mod type {type_name}")]
    ModTypeNotFound { type_name: String, module: String },

    #[error("Failed to rewrite module identity: {0}")]
    RewriteFailed(#[from] RewriteError),

    #[error("Failed to load rewritten module: {0}")]
    LoadFailed(#[source] ModuleError),

    #[error("Host registration failed: {0}")]
    HostRegistration(#[from] AdapterError),

    #[error("Mod hook failed: {0}")]
    HookFailed(#[from] HookError),

    #[error("Watcher error: {0}")]
    Watch(#[from] crate::watcher::WatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReloadResult<T> = Result<T, ReloadError>;
