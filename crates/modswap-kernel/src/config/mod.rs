//! Settings file loader
//!
//! Loads host and reload settings from YAML, TOML, JSON, INI, RON or JSON5
//! files.
//!
//! ## Features
//!
//! - Format detection from the file extension
//! - Environment variable substitution (`${VAR}` and `$VAR` syntax)
//! - Environment overrides with a prefix (`MODSWAP_AUTO_RELOAD=true`), with or
//!   without a settings file

use std::path::Path;
use std::sync::OnceLock;

use config::{Config as Cfg, Environment, File};
use regex::Regex;
use serde::de::DeserializeOwned;

pub use config::FileFormat;

/// Settings loading errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for settings operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Detect the settings format from a file extension
///
/// ```rust,ignore
/// use modswap_kernel::config::{detect_format, FileFormat};
///
/// assert_eq!(detect_format("modswap.toml").unwrap(), FileFormat::Toml);
/// ```
pub fn detect_format(path: impl AsRef<Path>) -> ConfigResult<FileFormat> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat(format!("{} has no extension", path.display())))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "ini" => Ok(FileFormat::Ini),
        "ron" => Ok(FileFormat::Ron),
        "json5" => Ok(FileFormat::Json5),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

fn braced_var() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex")
    })
}

fn bare_var() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("static regex")
    })
}

/// Substitute environment variables in settings text
///
/// `${VAR}` is replaced first, then `$VAR`. Unset variables are left as
/// written.
pub fn substitute_env_vars(content: &str) -> String {
    let lookup = |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    };

    let braced = braced_var().replace_all(content, lookup);
    bare_var().replace_all(&braced, lookup).into_owned()
}

fn build<T>(builder: config::ConfigBuilder<config::builder::DefaultState>) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    builder
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

fn env_source(env_prefix: &str) -> Environment {
    Environment::with_prefix(env_prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Load a settings file, then apply `{prefix}_KEY` environment overrides
///
/// Nested keys are separated by `__`, e.g. `{prefix}_SECTION__KEY`.
pub fn load_with_env<T>(path: impl AsRef<Path>, env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let substituted = substitute_env_vars(&content);

    build(
        Cfg::builder()
            .add_source(File::from_str(&substituted, format))
            .add_source(env_source(env_prefix)),
    )
}

/// Settings from `{prefix}_KEY` environment variables alone
///
/// Keys that are not set fall back to the type's serde defaults.
pub fn load_env<T>(env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    build(Cfg::builder().add_source(env_source(env_prefix)))
}
