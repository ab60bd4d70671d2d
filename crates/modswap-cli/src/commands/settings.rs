//! `modswap settings` command implementation

use modswap_reload::HotReloadSettings;

use crate::cli::SettingsFormat;

/// Execute the `modswap settings` command
pub fn run(format: SettingsFormat) -> anyhow::Result<()> {
    let settings = HotReloadSettings::default();
    let rendered = match format {
        SettingsFormat::Yaml => serde_yaml::to_string(&settings)?,
        SettingsFormat::Toml => toml::to_string_pretty(&settings)?,
        SettingsFormat::Json => serde_json::to_string_pretty(&settings)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
