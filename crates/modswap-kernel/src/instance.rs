//! Mod instances
//!
//! A [`ModInstance`] is the host's object for one loaded mod: the mod type it
//! was constructed from, the module that defines it, its live configuration
//! and the loader record that owns it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::manifest::ModTypeDescriptor;
use crate::module::LoadedModule;
use crate::schema::{ConfigValueError, ModConfiguration};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Process-unique numeric handle of a mod instance, passed across the module ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceHandle(u64);

impl InstanceHandle {
    fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// Value handed to the module's startup hook
    pub fn as_abi(&self) -> i64 {
        self.0 as i64
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The loader record a mod instance is registered under
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Simple loader: one record per module file
    AssemblyFile {
        file: PathBuf,
        sha256: Option<String>,
    },
    /// Package loader: one record per package
    Package { id: String, version: String },
}

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum InstanceError {
    #[error("Mod {0} has not finished loading")]
    NotFinishedLoading(String),

    #[error("Mod type {type_name} builds an invalid configuration: {source}")]
    Configuration {
        type_name: String,
        #[source]
        source: ConfigValueError,
    },
}

pub struct ModInstance {
    instance_id: Uuid,
    handle: InstanceHandle,
    descriptor: ModTypeDescriptor,
    module: Arc<dyn LoadedModule>,
    location: PathBuf,
    configuration: RwLock<Option<ModConfiguration>>,
    registration: RwLock<Option<Registration>>,
    finished_loading: AtomicBool,
}

impl ModInstance {
    /// Construct an instance of `descriptor` and build its configuration
    pub fn construct(
        descriptor: ModTypeDescriptor,
        module: Arc<dyn LoadedModule>,
        location: &Path,
    ) -> Result<Self, InstanceError> {
        let configuration = descriptor
            .build_configuration_definition(module.name())
            .map_err(|source| InstanceError::Configuration {
                type_name: descriptor.type_name.clone(),
                source,
            })?
            .map(ModConfiguration::new);

        Ok(Self {
            instance_id: Uuid::now_v7(),
            handle: InstanceHandle::next(),
            descriptor,
            module,
            location: location.to_path_buf(),
            configuration: RwLock::new(configuration),
            registration: RwLock::new(None),
            finished_loading: AtomicBool::new(false),
        })
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn handle(&self) -> InstanceHandle {
        self.handle
    }

    pub fn descriptor(&self) -> &ModTypeDescriptor {
        &self.descriptor
    }

    /// Full type name, stable across reloads
    pub fn type_name(&self) -> &str {
        &self.descriptor.type_name
    }

    pub fn module(&self) -> &Arc<dyn LoadedModule> {
        &self.module
    }

    /// Name of the defining module; changes on every reload
    pub fn module_name(&self) -> &str {
        self.module.name()
    }

    /// File the defining module was loaded from
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn name(&self) -> Option<&str> {
        self.descriptor.name.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.descriptor.author.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.descriptor.version.as_deref()
    }

    pub fn link(&self) -> Option<&str> {
        self.descriptor.link.as_deref()
    }

    /// Live configuration; fails until the loader marks the instance loaded
    pub fn configuration(&self) -> Result<Option<ModConfiguration>, InstanceError> {
        if !self.is_finished_loading() {
            return Err(InstanceError::NotFinishedLoading(
                self.type_name().to_string(),
            ));
        }
        Ok(self.configuration.read().clone())
    }

    /// Configuration regardless of loading state, for the loader itself
    pub fn raw_configuration(&self) -> Option<ModConfiguration> {
        self.configuration.read().clone()
    }

    pub fn set_configuration(&self, configuration: Option<ModConfiguration>) {
        *self.configuration.write() = configuration;
    }

    pub fn registration(&self) -> Option<Registration> {
        self.registration.read().clone()
    }

    pub fn set_registration(&self, registration: Registration) {
        *self.registration.write() = Some(registration);
    }

    pub fn is_finished_loading(&self) -> bool {
        self.finished_loading.load(Ordering::Acquire)
    }

    pub fn mark_finished_loading(&self) {
        self.finished_loading.store(true, Ordering::Release);
    }
}

impl fmt::Debug for ModInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModInstance")
            .field("instance_id", &self.instance_id)
            .field("handle", &self.handle)
            .field("type_name", &self.descriptor.type_name)
            .field("module", &self.module.name())
            .field("location", &self.location)
            .field("finished_loading", &self.is_finished_loading())
            .finish()
    }
}
