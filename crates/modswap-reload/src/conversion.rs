//! Value conversion policy for configuration migration
//!
//! A closed table. Anything not listed is refused.
//!
//! | from \ to | bool | integer | float | string | enum |
//! |---|---|---|---|---|---|
//! | bool | = | 0/1 | 0.0/1.0 | `true`/`false` | no |
//! | integer | != 0 | range checked | cast | decimal | no |
//! | float | != 0.0 | round half to even, range checked | widen/narrow | display | no |
//! | string | parse | parse | parse | = | no |
//! | enum | no | underlying value, range checked | no | variant name | same repr, defined variant |

use modswap_kernel::schema::{ConfigValue, EnumType, FloatRepr, IntRepr, ValueType};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ConversionError {
    #[error("No conversion from {from} to {to}")]
    Unsupported { from: String, to: String },

    #[error("{value} is out of range for {to}")]
    OutOfRange { value: String, to: String },

    #[error("{value} is not a finite number")]
    NotFinite { value: String },

    #[error("Cannot parse {value:?} as {to}")]
    Parse { value: String, to: String },

    #[error("{value} is not a defined variant of {to}")]
    UndefinedVariant { value: String, to: String },

    #[error("Enums {from} and {to} have different underlying types")]
    ReprMismatch { from: String, to: String },
}

/// Convert `value` to `target`, or explain why it cannot be
pub fn convert(value: &ConfigValue, target: &ValueType) -> Result<ConfigValue, ConversionError> {
    if value.is_of(target) {
        return Ok(value.clone());
    }

    let unsupported = || ConversionError::Unsupported {
        from: value.value_type().to_string(),
        to: target.to_string(),
    };

    match (value, target) {
        (ConfigValue::Bool(b), ValueType::Bool) => Ok(ConfigValue::Bool(*b)),
        (ConfigValue::Bool(b), ValueType::Int(repr)) => int(*repr, i128::from(*b)),
        (ConfigValue::Bool(b), ValueType::Float(repr)) => float(*repr, if *b { 1.0 } else { 0.0 }),
        (ConfigValue::Bool(b), ValueType::String) => Ok(ConfigValue::String(b.to_string())),

        (ConfigValue::Int { value, .. }, ValueType::Bool) => Ok(ConfigValue::Bool(*value != 0)),
        (ConfigValue::Int { value, .. }, ValueType::Int(repr)) => int(*repr, *value),
        (ConfigValue::Int { value, .. }, ValueType::Float(repr)) => float(*repr, *value as f64),
        (ConfigValue::Int { value, .. }, ValueType::String) => {
            Ok(ConfigValue::String(value.to_string()))
        }

        (ConfigValue::Float { value, .. }, ValueType::Bool) => {
            finite(*value)?;
            Ok(ConfigValue::Bool(*value != 0.0))
        }
        (ConfigValue::Float { value, .. }, ValueType::Int(repr)) => round_to_int(*repr, *value),
        (ConfigValue::Float { value, .. }, ValueType::Float(repr)) => float(*repr, *value),
        (ConfigValue::Float { repr, value }, ValueType::String) => {
            Ok(ConfigValue::String(display_float(*repr, *value)))
        }

        (ConfigValue::String(s), ValueType::Bool) => parse_bool(s),
        (ConfigValue::String(s), ValueType::Int(repr)) => {
            let parsed = s.trim().parse::<i128>().map_err(|_| ConversionError::Parse {
                value: s.clone(),
                to: repr.full_name().to_string(),
            })?;
            int(*repr, parsed)
        }
        (ConfigValue::String(s), ValueType::Float(repr)) => {
            let parsed = s.trim().parse::<f64>().map_err(|_| ConversionError::Parse {
                value: s.clone(),
                to: repr.full_name().to_string(),
            })?;
            float(*repr, parsed)
        }
        (ConfigValue::String(s), ValueType::String) => Ok(ConfigValue::String(s.clone())),

        (ConfigValue::Enum { value, .. }, ValueType::Int(repr)) => int(*repr, *value),
        (ConfigValue::Enum { ty, value }, ValueType::String) => Ok(ConfigValue::String(
            ty.variant_name(*value)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
        )),
        (ConfigValue::Enum { ty, value }, ValueType::Enum(to)) => enum_to_enum(ty, *value, to),

        _ => Err(unsupported()),
    }
}

fn int(repr: IntRepr, value: i128) -> Result<ConfigValue, ConversionError> {
    if !repr.contains(value) {
        return Err(ConversionError::OutOfRange {
            value: value.to_string(),
            to: repr.full_name().to_string(),
        });
    }
    Ok(ConfigValue::Int { repr, value })
}

fn finite(value: f64) -> Result<(), ConversionError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConversionError::NotFinite {
            value: value.to_string(),
        })
    }
}

fn float(repr: FloatRepr, value: f64) -> Result<ConfigValue, ConversionError> {
    finite(value)?;
    let value = match repr {
        FloatRepr::F64 => value,
        FloatRepr::F32 => {
            let narrowed = value as f32;
            if !narrowed.is_finite() {
                return Err(ConversionError::OutOfRange {
                    value: value.to_string(),
                    to: repr.full_name().to_string(),
                });
            }
            narrowed as f64
        }
    };
    Ok(ConfigValue::Float { repr, value })
}

fn round_to_int(repr: IntRepr, value: f64) -> Result<ConfigValue, ConversionError> {
    finite(value)?;
    let rounded = value.round_ties_even();
    let out_of_range = || ConversionError::OutOfRange {
        value: value.to_string(),
        to: repr.full_name().to_string(),
    };
    // bounds of the 64-bit reprs are not exact in f64; the i128 check settles them
    if rounded < repr.min() as f64 || rounded > repr.max() as f64 {
        return Err(out_of_range());
    }
    let value = rounded as i128;
    if !repr.contains(value) {
        return Err(out_of_range());
    }
    Ok(ConfigValue::Int { repr, value })
}

fn display_float(repr: FloatRepr, value: f64) -> String {
    match repr {
        FloatRepr::F32 => (value as f32).to_string(),
        FloatRepr::F64 => value.to_string(),
    }
}

fn parse_bool(s: &str) -> Result<ConfigValue, ConversionError> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(ConfigValue::Bool(true))
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(ConfigValue::Bool(false))
    } else {
        Err(ConversionError::Parse {
            value: s.to_string(),
            to: "bool".to_string(),
        })
    }
}

fn enum_to_enum(from: &EnumType, value: i128, to: &EnumType) -> Result<ConfigValue, ConversionError> {
    if from.repr != to.repr {
        return Err(ConversionError::ReprMismatch {
            from: from.full_name.clone(),
            to: to.full_name.clone(),
        });
    }
    if !to.is_defined(value) {
        return Err(ConversionError::UndefinedVariant {
            value: value.to_string(),
            to: to.full_name.clone(),
        });
    }
    Ok(ConfigValue::Enum {
        ty: to.clone(),
        value,
    })
}
