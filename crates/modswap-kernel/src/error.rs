//! Crate-level error types for `modswap-kernel`.
//!
//! [`KernelError`] composes the typed errors of every kernel sub-module and is
//! carried inside an [`error_stack::Report`] so callers can attach context as
//! the error propagates.
//!
//! ```rust,ignore
//! use error_stack::ResultExt;
//! use modswap_kernel::error::{KernelError, KernelResult};
//!
//! fn read_image(path: &std::path::Path) -> KernelResult<ModuleImage> {
//!     let bytes = std::fs::read(path)
//!         .map_err(KernelError::from)
//!         .map_err(error_stack::Report::new)
//!         .attach(format!("reading {}", path.display()))?;
//!     ModuleImage::parse(&bytes)
//!         .map_err(KernelError::from)
//!         .map_err(error_stack::Report::new)
//! }
//! ```

use thiserror::Error;

use crate::adapter::AdapterError;
use crate::image::ImageError;
use crate::instance::InstanceError;
use crate::manifest::ManifestError;
use crate::module::ModuleError;
use crate::schema::ConfigValueError;

/// Crate-level error type for `modswap-kernel`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    /// Settings file error (requires the `config` feature).
    #[cfg(feature = "config")]
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Instance error: {0}")]
    Instance(#[from] InstanceError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Configuration value error: {0}")]
    ConfigValue(#[from] ConfigValueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

/// Convenience result alias using [`error_stack::Report`].
pub type KernelResult<T> = Result<T, error_stack::Report<KernelError>>;
