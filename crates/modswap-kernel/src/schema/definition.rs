//! Configuration schema and the live configuration handle

use std::sync::Arc;

use parking_lot::RwLock;

use super::key::ConfigKey;
use super::value::{ConfigValue, ConfigValueError};

/// Ordered set of configuration keys declared by one mod type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModConfigurationDefinition {
    owner: String,
    version: Option<String>,
    keys: Vec<ConfigKey>,
}

impl ModConfigurationDefinition {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            version: None,
            keys: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Append a key; names are unique within a definition
    pub fn with_key(mut self, key: ConfigKey) -> Result<Self, ConfigValueError> {
        self.push(key)?;
        Ok(self)
    }

    pub fn push(&mut self, key: ConfigKey) -> Result<(), ConfigValueError> {
        if self.key(key.name()).is_some() {
            return Err(ConfigValueError::DuplicateKey(key.name().to_string()));
        }
        self.keys.push(key);
        Ok(())
    }

    /// Type name of the mod that declared this schema
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn keys(&self) -> &[ConfigKey] {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut [ConfigKey] {
        &mut self.keys
    }

    pub fn key(&self, name: &str) -> Option<&ConfigKey> {
        self.keys.iter().find(|k| k.name() == name)
    }

    pub fn key_mut(&mut self, name: &str) -> Option<&mut ConfigKey> {
        self.keys.iter_mut().find(|k| k.name() == name)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Live configuration of a mod instance
///
/// Cloning yields another handle onto the same configuration; hot reload
/// carries one handle across instances and swaps its definition in place.
#[derive(Debug, Clone)]
pub struct ModConfiguration {
    inner: Arc<RwLock<ModConfigurationDefinition>>,
}

impl ModConfiguration {
    pub fn new(definition: ModConfigurationDefinition) -> Self {
        Self {
            inner: Arc::new(RwLock::new(definition)),
        }
    }

    /// Current value of a key (explicit value or default)
    pub fn get(&self, name: &str) -> Option<ConfigValue> {
        self.inner.read().key(name).and_then(|k| k.value().cloned())
    }

    /// Whether the key holds an explicit value
    pub fn has_value(&self, name: &str) -> bool {
        self.inner
            .read()
            .key(name)
            .map(|k| k.has_value())
            .unwrap_or(false)
    }

    pub fn set(&self, name: &str, value: ConfigValue) -> Result<(), ConfigValueError> {
        let mut definition = self.inner.write();
        let key = definition
            .key_mut(name)
            .ok_or_else(|| ConfigValueError::KeyNotFound(name.to_string()))?;
        key.set(value)
    }

    pub fn unset(&self, name: &str) -> Result<(), ConfigValueError> {
        let mut definition = self.inner.write();
        let key = definition
            .key_mut(name)
            .ok_or_else(|| ConfigValueError::KeyNotFound(name.to_string()))?;
        key.unset();
        Ok(())
    }

    /// Snapshot of the current definition
    pub fn definition(&self) -> ModConfigurationDefinition {
        self.inner.read().clone()
    }

    /// Replace the whole definition, returning the previous one
    pub fn replace_definition(
        &self,
        definition: ModConfigurationDefinition,
    ) -> ModConfigurationDefinition {
        std::mem::replace(&mut *self.inner.write(), definition)
    }

    /// Whether two handles refer to the same configuration
    pub fn ptr_eq(&self, other: &ModConfiguration) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
