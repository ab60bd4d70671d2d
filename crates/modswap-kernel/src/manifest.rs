//! Mod manifest
//!
//! A module declares the mod types it contains in the `modswap.manifest`
//! custom section as JSON. Each type carries its display metadata and the
//! configuration schema it builds.

use serde::{Deserialize, Serialize};

use crate::image::{MANIFEST_SECTION, ModuleImage};
use crate::schema::{
    ConfigKey, ConfigValue, ConfigValueError, EnumType, EnumVariant, IntRepr,
    ModConfigurationDefinition, Validator, ValueType,
};

/// Manifest errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ManifestError {
    #[error("Manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Manifest declares no mod types")]
    Empty,
}

/// Declared type of a configuration key in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    /// Scalar by full name: `bool`, `i8`..`u64`, `f32`, `f64`, `string`
    Scalar(String),
    /// Enum declared by the mod
    Enum {
        #[serde(rename = "enum")]
        name: String,
        repr: IntRepr,
        variants: Vec<EnumVariant>,
    },
}

impl TypeSpec {
    /// Resolve to a value type; enums are tagged with the defining module
    pub fn resolve(&self, origin: &str) -> Result<ValueType, ConfigValueError> {
        match self {
            TypeSpec::Scalar(name) => ValueType::scalar(name),
            TypeSpec::Enum {
                name,
                repr,
                variants,
            } => {
                let mut ty = EnumType::new(name, *repr).with_origin(origin);
                ty.variants = variants.clone();
                Ok(ValueType::Enum(ty))
            }
        }
    }
}

/// One configuration key as declared in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigKeySpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<Validator>,
}

impl ConfigKeySpec {
    pub fn new(name: &str, ty: TypeSpec) -> Self {
        Self {
            name: name.to_string(),
            ty,
            description: None,
            default: None,
            validator: None,
        }
    }

    pub fn scalar(name: &str, ty: &str) -> Self {
        Self::new(name, TypeSpec::Scalar(ty.to_string()))
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Build the live key for a module named `origin`
    pub fn build(&self, origin: &str) -> Result<ConfigKey, ConfigValueError> {
        let value_type = self.ty.resolve(origin)?;
        let mut key = ConfigKey::new(&self.name, value_type.clone());
        if let Some(description) = &self.description {
            key = key.with_description(description);
        }
        if let Some(validator) = &self.validator {
            key = key.with_validator(validator.clone());
        }
        if let Some(default) = &self.default {
            key = key.with_default(ConfigValue::from_json(default, &value_type)?)?;
        }
        Ok(key)
    }
}

/// A mod type contained in a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModTypeDescriptor {
    /// Full type name; stable across reloads
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<ConfigKeySpec>,
}

impl ModTypeDescriptor {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            name: None,
            author: None,
            version: None,
            link: None,
            config: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }

    pub fn with_config_key(mut self, key: ConfigKeySpec) -> Self {
        self.config.push(key);
        self
    }

    /// Build a fresh configuration schema; `None` if the type declares no keys
    pub fn build_configuration_definition(
        &self,
        origin: &str,
    ) -> Result<Option<ModConfigurationDefinition>, ConfigValueError> {
        if self.config.is_empty() {
            return Ok(None);
        }

        let mut definition = ModConfigurationDefinition::new(&self.type_name);
        if let Some(version) = &self.version {
            definition = definition.with_version(version);
        }
        for spec in &self.config {
            definition.push(spec.build(origin)?)?;
        }
        Ok(Some(definition))
    }
}

/// All mod types declared by one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModManifest {
    pub mods: Vec<ModTypeDescriptor>,
}

impl ModManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mod(mut self, descriptor: ModTypeDescriptor) -> Self {
        self.mods.push(descriptor);
        self
    }

    /// Read the manifest section of an image; `None` if the module has none
    pub fn from_image(image: &ModuleImage) -> Result<Option<Self>, ManifestError> {
        match image.custom_section(MANIFEST_SECTION) {
            Some(payload) => {
                let manifest: ModManifest = serde_json::from_slice(payload)?;
                if manifest.mods.is_empty() {
                    return Err(ManifestError::Empty);
                }
                Ok(Some(manifest))
            }
            None => Ok(None),
        }
    }

    /// Embed this manifest into an image
    pub fn write_to(&self, image: &mut ModuleImage) -> Result<(), ManifestError> {
        image.set_custom_section(MANIFEST_SECTION, serde_json::to_vec(self)?);
        Ok(())
    }

    pub fn find(&self, type_name: &str) -> Option<&ModTypeDescriptor> {
        self.mods.iter().find(|m| m.type_name == type_name)
    }
}
