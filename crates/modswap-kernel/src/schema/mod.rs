//! Mod configuration schema
//!
//! Named, typed, validated settings declared by a mod type, and the live
//! configuration handle that hot reload carries across instances.

mod definition;
mod key;
mod value;

pub use definition::{ModConfiguration, ModConfigurationDefinition};
pub use key::{ConfigKey, Validator};
pub use value::{
    ConfigValue, ConfigValueError, EnumType, EnumVariant, FloatRepr, IntRepr, ValueType,
};
