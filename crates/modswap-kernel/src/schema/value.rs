//! Configuration value model
//!
//! Typed values held by mod configuration keys. Keys are matched across
//! reloads by value-type *full name*; enum types additionally remember the
//! module that defined them, so the "same" enum coming from two different
//! module loads is a different concrete type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors raised while building or assigning configuration values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigValueError {
    #[error("Unknown value type: {0}")]
    UnknownType(String),

    #[error("Value {value} is not valid for type {expected}")]
    TypeMismatch { expected: String, value: String },

    #[error("Value {value} rejected by validator of key {key}")]
    Rejected { key: String, value: String },

    #[error("Configuration key not found: {0}")]
    KeyNotFound(String),

    #[error("Duplicate configuration key: {0}")]
    DuplicateKey(String),
}

/// Underlying integer representation of integer and enum values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntRepr {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntRepr {
    /// All representations, in declaration order
    pub const ALL: [IntRepr; 8] = [
        IntRepr::I8,
        IntRepr::I16,
        IntRepr::I32,
        IntRepr::I64,
        IntRepr::U8,
        IntRepr::U16,
        IntRepr::U32,
        IntRepr::U64,
    ];

    pub fn full_name(&self) -> &'static str {
        match self {
            IntRepr::I8 => "i8",
            IntRepr::I16 => "i16",
            IntRepr::I32 => "i32",
            IntRepr::I64 => "i64",
            IntRepr::U8 => "u8",
            IntRepr::U16 => "u16",
            IntRepr::U32 => "u32",
            IntRepr::U64 => "u64",
        }
    }

    pub fn min(&self) -> i128 {
        match self {
            IntRepr::I8 => i8::MIN as i128,
            IntRepr::I16 => i16::MIN as i128,
            IntRepr::I32 => i32::MIN as i128,
            IntRepr::I64 => i64::MIN as i128,
            IntRepr::U8 | IntRepr::U16 | IntRepr::U32 | IntRepr::U64 => 0,
        }
    }

    pub fn max(&self) -> i128 {
        match self {
            IntRepr::I8 => i8::MAX as i128,
            IntRepr::I16 => i16::MAX as i128,
            IntRepr::I32 => i32::MAX as i128,
            IntRepr::I64 => i64::MAX as i128,
            IntRepr::U8 => u8::MAX as i128,
            IntRepr::U16 => u16::MAX as i128,
            IntRepr::U32 => u32::MAX as i128,
            IntRepr::U64 => u64::MAX as i128,
        }
    }

    /// Whether `value` fits this representation
    pub fn contains(&self, value: i128) -> bool {
        value >= self.min() && value <= self.max()
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|repr| repr.full_name() == name)
    }
}

/// Floating point representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatRepr {
    F32,
    F64,
}

impl FloatRepr {
    pub fn full_name(&self) -> &'static str {
        match self {
            FloatRepr::F32 => "f32",
            FloatRepr::F64 => "f64",
        }
    }
}

/// A named variant of an enum type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

impl EnumVariant {
    pub fn new(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// An enum type declared by a mod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    /// Full type name, e.g. `Foo.Quality`
    pub full_name: String,
    /// Underlying storage type
    pub repr: IntRepr,
    /// Declared variants
    pub variants: Vec<EnumVariant>,
    /// Name of the module that defined this enum
    #[serde(default)]
    pub origin: Option<String>,
}

impl EnumType {
    pub fn new(full_name: &str, repr: IntRepr) -> Self {
        Self {
            full_name: full_name.to_string(),
            repr,
            variants: Vec::new(),
            origin: None,
        }
    }

    pub fn with_variant(mut self, name: &str, value: i64) -> Self {
        self.variants.push(EnumVariant::new(name, value));
        self
    }

    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_string());
        self
    }

    pub fn is_defined(&self, value: i128) -> bool {
        self.variants.iter().any(|v| v.value as i128 == value)
    }

    pub fn variant_name(&self, value: i128) -> Option<&str> {
        self.variants
            .iter()
            .find(|v| v.value as i128 == value)
            .map(|v| v.name.as_str())
    }

    pub fn variant_value(&self, name: &str) -> Option<i64> {
        self.variants.iter().find(|v| v.name == name).map(|v| v.value)
    }

    /// Same concrete type: same full name *and* same defining module
    pub fn same_identity(&self, other: &EnumType) -> bool {
        self.full_name == other.full_name && self.origin == other.origin
    }
}

/// The declared type of a configuration key
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    Bool,
    Int(IntRepr),
    Float(FloatRepr),
    String,
    Enum(EnumType),
}

impl ValueType {
    /// Resolve a scalar type from its full name
    pub fn scalar(name: &str) -> Result<Self, ConfigValueError> {
        match name {
            "bool" => Ok(ValueType::Bool),
            "string" => Ok(ValueType::String),
            "f32" => Ok(ValueType::Float(FloatRepr::F32)),
            "f64" => Ok(ValueType::Float(FloatRepr::F64)),
            other => IntRepr::from_name(other)
                .map(ValueType::Int)
                .ok_or_else(|| ConfigValueError::UnknownType(other.to_string())),
        }
    }

    /// Full type name used for key matching
    pub fn full_name(&self) -> &str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int(repr) => repr.full_name(),
            ValueType::Float(repr) => repr.full_name(),
            ValueType::String => "string",
            ValueType::Enum(e) => &e.full_name,
        }
    }

    /// Same concrete type, including the defining module for enums
    pub fn same_identity(&self, other: &ValueType) -> bool {
        match (self, other) {
            (ValueType::Enum(a), ValueType::Enum(b)) => a.same_identity(b),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Enum(e) => match &e.origin {
                Some(origin) => write!(f, "{} ({})", e.full_name, origin),
                None => write!(f, "{}", e.full_name),
            },
            other => write!(f, "{}", other.full_name()),
        }
    }
}

/// A concrete configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int { repr: IntRepr, value: i128 },
    Float { repr: FloatRepr, value: f64 },
    String(String),
    Enum { ty: EnumType, value: i128 },
}

impl ConfigValue {
    pub fn i32(value: i32) -> Self {
        ConfigValue::Int {
            repr: IntRepr::I32,
            value: value as i128,
        }
    }

    pub fn i64(value: i64) -> Self {
        ConfigValue::Int {
            repr: IntRepr::I64,
            value: value as i128,
        }
    }

    pub fn f32(value: f32) -> Self {
        ConfigValue::Float {
            repr: FloatRepr::F32,
            value: value as f64,
        }
    }

    pub fn f64(value: f64) -> Self {
        ConfigValue::Float {
            repr: FloatRepr::F64,
            value,
        }
    }

    pub fn string(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }

    /// The concrete type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            ConfigValue::Bool(_) => ValueType::Bool,
            ConfigValue::Int { repr, .. } => ValueType::Int(*repr),
            ConfigValue::Float { repr, .. } => ValueType::Float(*repr),
            ConfigValue::String(_) => ValueType::String,
            ConfigValue::Enum { ty, .. } => ValueType::Enum(ty.clone()),
        }
    }

    /// Whether this value is exactly of the given type
    pub fn is_of(&self, ty: &ValueType) -> bool {
        match (self, ty) {
            (ConfigValue::Bool(_), ValueType::Bool) => true,
            (ConfigValue::Int { repr, .. }, ValueType::Int(expected)) => repr == expected,
            (ConfigValue::Float { repr, .. }, ValueType::Float(expected)) => repr == expected,
            (ConfigValue::String(_), ValueType::String) => true,
            (ConfigValue::Enum { ty: actual, .. }, ValueType::Enum(expected)) => {
                actual.same_identity(expected)
            }
            _ => false,
        }
    }

    /// Numeric view, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Int { value, .. } => Some(*value as f64),
            ConfigValue::Float { value, .. } => Some(*value),
            ConfigValue::Enum { value, .. } => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Build a value of type `ty` from a manifest JSON literal
    pub fn from_json(json: &serde_json::Value, ty: &ValueType) -> Result<Self, ConfigValueError> {
        let mismatch = || ConfigValueError::TypeMismatch {
            expected: ty.full_name().to_string(),
            value: json.to_string(),
        };

        match ty {
            ValueType::Bool => json.as_bool().map(ConfigValue::Bool).ok_or_else(mismatch),
            ValueType::Int(repr) => {
                let value = json
                    .as_i64()
                    .map(|v| v as i128)
                    .or_else(|| json.as_u64().map(|v| v as i128))
                    .ok_or_else(mismatch)?;
                if !repr.contains(value) {
                    return Err(mismatch());
                }
                Ok(ConfigValue::Int { repr: *repr, value })
            }
            ValueType::Float(repr) => {
                let value = json.as_f64().ok_or_else(mismatch)?;
                let value = match repr {
                    FloatRepr::F64 => value,
                    FloatRepr::F32 => {
                        let narrowed = value as f32;
                        if !narrowed.is_finite() {
                            return Err(mismatch());
                        }
                        narrowed as f64
                    }
                };
                Ok(ConfigValue::Float { repr: *repr, value })
            }
            ValueType::String => json
                .as_str()
                .map(|s| ConfigValue::String(s.to_string()))
                .ok_or_else(mismatch),
            ValueType::Enum(e) => {
                let value = match json {
                    serde_json::Value::String(name) => e.variant_value(name).map(|v| v as i128),
                    other => other.as_i64().map(|v| v as i128),
                }
                .ok_or_else(mismatch)?;
                if !e.is_defined(value) {
                    return Err(mismatch());
                }
                Ok(ConfigValue::Enum {
                    ty: e.clone(),
                    value,
                })
            }
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int { value, .. } => write!(f, "{}", value),
            ConfigValue::Float { value, .. } => write!(f, "{}", value),
            ConfigValue::String(s) => write!(f, "{}", s),
            ConfigValue::Enum { ty, value } => match ty.variant_name(*value) {
                Some(name) => write!(f, "{}::{}", ty.full_name, name),
                None => write!(f, "{}({})", ty.full_name, value),
            },
        }
    }
}
