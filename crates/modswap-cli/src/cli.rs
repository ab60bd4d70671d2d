//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// modswap - hot reload for wasm mods
#[derive(Parser)]
#[command(name = "modswap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short = 'o', long, global = true, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Mod loader layout the development host uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum HostVariant {
    /// One record per module file
    #[default]
    Simple,
    /// One package per module file
    Package,
}

/// Settings file formats `modswap settings` can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SettingsFormat {
    #[default]
    Yaml,
    Toml,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a module's name, declared mods, configuration and hooks
    Inspect {
        /// Module file
        module: PathBuf,
    },

    /// Write a copy of a module under a fresh module name
    Rewrite {
        /// Module file
        module: PathBuf,

        /// Output file (defaults to `<stem>.rewritten.wasm` next to the input)
        #[arg(short = 'O', long = "out")]
        out: Option<PathBuf>,
    },

    /// Run a development host over a mods directory
    Host {
        /// Directory holding the mod modules
        mods_dir: PathBuf,

        /// Mod loader layout
        #[arg(long, value_enum, default_value_t = HostVariant::Simple)]
        variant: HostVariant,

        /// Hot reload settings file
        #[arg(short = 's', long, env = "MODSWAP_SETTINGS")]
        settings: Option<PathBuf>,

        /// Reload as soon as a replacement file changes
        #[arg(long)]
        auto_reload: bool,

        /// Reload these mod types once after loading
        #[arg(short = 'r', long = "reload", value_name = "TYPE")]
        reload: Vec<String>,

        /// Keep running and watch the replacement directories
        #[arg(short, long)]
        watch: bool,

        /// Watcher poll interval in milliseconds
        #[arg(long, default_value_t = 200)]
        poll_ms: u64,
    },

    /// Print the default hot reload settings
    Settings {
        #[arg(short, long, value_enum, default_value_t = SettingsFormat::Yaml)]
        format: SettingsFormat,
    },
}
