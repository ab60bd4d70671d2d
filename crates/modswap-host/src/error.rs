use modswap_kernel::instance::InstanceError;
use modswap_kernel::module::ModuleError;

/// Host errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HostError {
    #[error("Module engine error: {0}")]
    Engine(String),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error("A mod named {0} is already loaded")]
    DuplicateModName(String),

    #[error("Package {0} is already loaded")]
    DuplicatePackage(String),

    #[error("Package {0} is not loaded")]
    PackageNotFound(String),

    #[error("Invalid package version {version}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HostResult<T> = Result<T, HostError>;
