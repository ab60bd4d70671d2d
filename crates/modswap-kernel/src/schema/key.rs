//! Configuration keys and their validation predicates

use serde::{Deserialize, Serialize};

use super::value::{ConfigValue, ConfigValueError, ValueType};

/// Validation predicate attached to a configuration key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validator {
    /// Accept any value of the key's type
    #[default]
    Any,
    /// Numeric value within `[min, max]`
    Range { min: f64, max: f64 },
    /// String value from a fixed list
    OneOf { values: Vec<String> },
    /// Non-empty string
    NonEmpty,
    /// String no longer than `max` characters
    MaxLength { max: usize },
}

impl Validator {
    pub fn accepts(&self, value: &ConfigValue) -> bool {
        match self {
            Validator::Any => true,
            Validator::Range { min, max } => value
                .as_f64()
                .map(|v| v.is_finite() && v >= *min && v <= *max)
                .unwrap_or(false),
            Validator::OneOf { values } => value
                .as_str()
                .map(|s| values.iter().any(|v| v == s))
                .unwrap_or(false),
            Validator::NonEmpty => value.as_str().map(|s| !s.is_empty()).unwrap_or(false),
            Validator::MaxLength { max } => value
                .as_str()
                .map(|s| s.chars().count() <= *max)
                .unwrap_or(false),
        }
    }
}

/// A named, typed configuration entry
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigKey {
    name: String,
    description: Option<String>,
    value_type: ValueType,
    default: Option<ConfigValue>,
    value: Option<ConfigValue>,
    has_value: bool,
    validator: Validator,
}

impl ConfigKey {
    pub fn new(name: &str, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            value_type,
            default: None,
            value: None,
            has_value: false,
            validator: Validator::Any,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Set the default value; it must be of the key's type and pass validation
    pub fn with_default(mut self, default: ConfigValue) -> Result<Self, ConfigValueError> {
        self.check(&default)?;
        self.default = Some(default);
        Ok(self)
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn default_value(&self) -> Option<&ConfigValue> {
        self.default.as_ref()
    }

    /// Whether an explicit value has been set
    pub fn has_value(&self) -> bool {
        self.has_value
    }

    /// The explicit value, if one has been set
    pub fn explicit_value(&self) -> Option<&ConfigValue> {
        if self.has_value {
            self.value.as_ref()
        } else {
            None
        }
    }

    /// The explicit value, falling back to the default
    pub fn value(&self) -> Option<&ConfigValue> {
        self.explicit_value().or(self.default.as_ref())
    }

    /// Whether `value` is of this key's type and passes its validator
    pub fn validate(&self, value: &ConfigValue) -> bool {
        value.is_of(&self.value_type) && self.validator.accepts(value)
    }

    fn check(&self, value: &ConfigValue) -> Result<(), ConfigValueError> {
        if !value.is_of(&self.value_type) {
            return Err(ConfigValueError::TypeMismatch {
                expected: self.value_type.to_string(),
                value: value.to_string(),
            });
        }
        if !self.validator.accepts(value) {
            return Err(ConfigValueError::Rejected {
                key: self.name.clone(),
                value: value.to_string(),
            });
        }
        Ok(())
    }

    /// Assign an explicit value after validating it
    pub fn set(&mut self, value: ConfigValue) -> Result<(), ConfigValueError> {
        self.check(&value)?;
        self.value = Some(value);
        self.has_value = true;
        Ok(())
    }

    /// Drop the explicit value, reverting to the default
    pub fn unset(&mut self) {
        self.value = None;
        self.has_value = false;
    }
}
