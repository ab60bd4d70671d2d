//! Package-oriented mod loader
//!
//! Mods are grouped into packages with an identity (id + version), authors,
//! a project url and a file system. Packages have a lifecycle: added, then
//! shut down. A separate module lookup table maps module names to the mod
//! they define.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use modswap_kernel::instance::{ModInstance, Registration};
use modswap_kernel::module::{LoadedModule, ModuleError};

use crate::error::{HostError, HostResult};
use crate::module_system::WasmModuleSystem;

/// Target framework every package built for this host declares
pub const TARGET_FRAMEWORK: &str = "wasm32-unknown-unknown";

/// Package version (e.g. "1.2.3-alpha+build5")
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

impl PackageVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse from string (e.g., "1.2.3-alpha+build123")
    pub fn parse(version: &str) -> HostResult<Self> {
        let version = version.trim();
        let invalid = |reason: String| HostError::InvalidVersion {
            version: version.to_string(),
            reason,
        };

        let (version_pre, build) = match version.split_once('+') {
            Some((v, b)) => (v, Some(b.to_string())),
            None => (version, None),
        };
        let (version_core, prerelease) = match version_pre.split_once('-') {
            Some((v, p)) => (v, Some(p.to_string())),
            None => (version_pre, None),
        };

        let parts: Vec<&str> = version_core.split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(invalid("expected major.minor[.patch]".to_string()));
        }

        let number = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| invalid(format!("invalid component {part}")))
        };
        let major = number(parts[0])?;
        let minor = number(parts[1])?;
        let patch = match parts.get(2) {
            Some(part) => number(part)?,
            None => 0,
        };

        Ok(Self {
            major,
            minor,
            patch,
            prerelease,
            build,
        })
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }
        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

/// In-memory file system attached to a package
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    name: String,
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileSystem {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            files: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn write_file(&self, path: &Path, contents: Vec<u8>) {
        self.files.write().insert(path.to_path_buf(), contents);
    }

    pub fn read_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().get(path).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    Created,
    Running,
    ShutDown,
}

#[derive(Debug)]
pub struct ModPackage {
    id: String,
    version: PackageVersion,
    authors: Vec<String>,
    project_url: Option<Url>,
    icon_url: Option<Url>,
    file_system: MemoryFileSystem,
    target_framework: String,
    description: String,
    supports_hot_reload: bool,
    mods: Vec<Arc<ModInstance>>,
    state: RwLock<PackageState>,
}

impl ModPackage {
    pub fn new(id: &str, version: PackageVersion, file_system: MemoryFileSystem) -> Self {
        Self {
            id: id.to_string(),
            version,
            authors: Vec::new(),
            project_url: None,
            icon_url: None,
            file_system,
            target_framework: TARGET_FRAMEWORK.to_string(),
            description: String::new(),
            supports_hot_reload: false,
            mods: Vec::new(),
            state: RwLock::new(PackageState::Created),
        }
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.authors.push(author.to_string());
        self
    }

    pub fn with_project_url(mut self, url: Option<Url>) -> Self {
        self.project_url = url;
        self
    }

    pub fn with_icon_url(mut self, url: Option<Url>) -> Self {
        self.icon_url = url;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_target_framework(mut self, target_framework: &str) -> Self {
        self.target_framework = target_framework.to_string();
        self
    }

    pub fn with_hot_reload_support(mut self, supports: bool) -> Self {
        self.supports_hot_reload = supports;
        self
    }

    pub fn with_mod(mut self, instance: Arc<ModInstance>) -> Self {
        self.mods.push(instance);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &PackageVersion {
        &self.version
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn project_url(&self) -> Option<&Url> {
        self.project_url.as_ref()
    }

    pub fn icon_url(&self) -> Option<&Url> {
        self.icon_url.as_ref()
    }

    pub fn file_system(&self) -> &MemoryFileSystem {
        &self.file_system
    }

    pub fn target_framework(&self) -> &str {
        &self.target_framework
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn supports_hot_reload(&self) -> bool {
        self.supports_hot_reload
    }

    pub fn mods(&self) -> &[Arc<ModInstance>] {
        &self.mods
    }

    pub fn state(&self) -> PackageState {
        *self.state.read()
    }

    fn set_state(&self, state: PackageState) {
        *self.state.write() = state;
    }
}

pub struct PackageLoader {
    modules: Arc<WasmModuleSystem>,
    packages: RwLock<Vec<Arc<ModPackage>>>,
    module_lookup: RwLock<HashMap<String, Arc<ModInstance>>>,
}

impl PackageLoader {
    pub fn new(modules: Arc<WasmModuleSystem>) -> Self {
        Self {
            modules,
            packages: RwLock::new(Vec::new()),
            module_lookup: RwLock::new(HashMap::new()),
        }
    }

    pub fn modules(&self) -> &Arc<WasmModuleSystem> {
        &self.modules
    }

    /// Load a module file as a package of the mods it declares
    pub fn load_package(&self, path: &Path) -> HostResult<Arc<ModPackage>> {
        let bytes = std::fs::read(path)?;
        let module = self.modules.load_wasm(bytes.clone(), path)?;
        let manifest = module.manifest().clone();

        let Some(first) = manifest.mods.first() else {
            return Err(ModuleError::NoManifest(module.name().to_string()).into());
        };
        let id = first.type_name.clone();
        let version = match first.version.as_deref() {
            Some(v) => PackageVersion::parse(v).unwrap_or_else(|e| {
                warn!("{}; using 1.0.0", e);
                PackageVersion::new(1, 0, 0)
            }),
            None => PackageVersion::new(1, 0, 0),
        };

        let file_system = MemoryFileSystem::new(&path.display().to_string());
        if let Some(file_name) = path.file_name() {
            file_system.write_file(Path::new(file_name), bytes);
        }

        let mut package = ModPackage::new(&id, version.clone(), file_system)
            .with_project_url(first.link.as_deref().and_then(|l| Url::parse(l).ok()));
        if let Some(author) = first.author.as_deref() {
            package = package.with_author(author);
        }

        for descriptor in &manifest.mods {
            let instance = ModInstance::construct(descriptor.clone(), module.clone(), path)?;
            instance.set_registration(Registration::Package {
                id: id.clone(),
                version: version.to_string(),
            });
            instance.mark_finished_loading();
            package = package.with_mod(Arc::new(instance));
        }

        let package = Arc::new(package);
        self.add_mod(package.clone())?;
        for instance in package.mods() {
            self.insert_module_lookup(instance.module_name(), instance.clone());
        }
        Ok(package)
    }

    /// Add a package and start it
    pub fn add_mod(&self, package: Arc<ModPackage>) -> HostResult<()> {
        let mut packages = self.packages.write();
        if packages.iter().any(|p| p.id() == package.id()) {
            return Err(HostError::DuplicatePackage(package.id().to_string()));
        }
        package.set_state(PackageState::Running);
        info!("Added package {} {}", package.id(), package.version());
        packages.push(package);
        Ok(())
    }

    /// Shut down a running package and drop it from the loader
    pub fn shutdown_mod(&self, id: &str) -> HostResult<Arc<ModPackage>> {
        let package = {
            let mut packages = self.packages.write();
            let index = packages
                .iter()
                .position(|p| p.id() == id)
                .ok_or_else(|| HostError::PackageNotFound(id.to_string()))?;
            packages.remove(index)
        };

        package.set_state(PackageState::ShutDown);
        self.module_lookup
            .write()
            .retain(|_, m| !package.mods().iter().any(|p| Arc::ptr_eq(p, m)));
        info!("Shut down package {}", id);
        Ok(package)
    }

    pub fn insert_module_lookup(&self, module_name: &str, instance: Arc<ModInstance>) {
        debug!("Module lookup {} -> {}", module_name, instance.type_name());
        self.module_lookup
            .write()
            .insert(module_name.to_string(), instance);
    }

    pub fn module_lookup(&self, module_name: &str) -> Option<Arc<ModInstance>> {
        self.module_lookup.read().get(module_name).cloned()
    }

    pub fn package(&self, id: &str) -> Option<Arc<ModPackage>> {
        self.packages.read().iter().find(|p| p.id() == id).cloned()
    }

    /// Package containing `instance`
    pub fn package_of(&self, instance: &Arc<ModInstance>) -> Option<Arc<ModPackage>> {
        self.packages
            .read()
            .iter()
            .find(|p| p.mods().iter().any(|m| Arc::ptr_eq(m, instance)))
            .cloned()
    }

    pub fn packages(&self) -> Vec<Arc<ModPackage>> {
        self.packages.read().clone()
    }

    /// Mods of every running package
    pub fn loaded_mods(&self) -> Vec<Arc<ModInstance>> {
        self.packages
            .read()
            .iter()
            .flat_map(|p| p.mods().iter().cloned())
            .collect()
    }
}
