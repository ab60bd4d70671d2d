//! `modswap host` command implementation
//!
//! A development host: loads every mod in a directory, registers each for
//! hot reload and lists the reload triggers. Reloads can be requested up
//! front with `--reload`, or driven by the replacement watcher with
//! `--watch`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use modswap_host::{
    ActionMenu, MODULE_EXTENSION, ModLoader, PackageLoader, WasmModuleSystem, is_module_file,
};
use modswap_kernel::adapter::HostAdapter;
use modswap_kernel::instance::ModInstance;
use modswap_reload::{
    HotReloadSettings, HotReloader, PackageLoaderAdapter, ReloadError, ReloadReport,
    SimpleLoaderAdapter,
};

use crate::cli::HostVariant;
use crate::output::{self, OutputFormat};

pub struct HostOptions {
    pub mods_dir: PathBuf,
    pub variant: HostVariant,
    pub settings: Option<PathBuf>,
    pub auto_reload: bool,
    pub reload: Vec<String>,
    pub watch: bool,
    pub poll: Duration,
}

#[derive(Debug, Serialize)]
struct TriggerInfo {
    type_name: String,
    module_name: String,
    label: String,
    reload_count: u32,
}

#[derive(Debug, Serialize)]
struct ReloadOutcome {
    type_name: String,
    success: bool,
    module_name: Option<String>,
    reload_count: Option<u32>,
    migrated: Vec<String>,
    skipped: Vec<String>,
    error: Option<String>,
}

impl ReloadOutcome {
    fn new(type_name: &str, result: &Result<ReloadReport, ReloadError>) -> Self {
        match result {
            Ok(report) => {
                let (migrated, skipped) = report
                    .migration
                    .as_ref()
                    .map(|m| {
                        (
                            m.migrated.clone(),
                            m.skipped.iter().map(|s| s.key.clone()).collect(),
                        )
                    })
                    .unwrap_or_default();
                Self {
                    type_name: type_name.to_string(),
                    success: true,
                    module_name: Some(report.module_name.clone()),
                    reload_count: Some(report.reload_count),
                    migrated,
                    skipped,
                    error: None,
                }
            }
            Err(e) => Self {
                type_name: type_name.to_string(),
                success: false,
                module_name: None,
                reload_count: None,
                migrated: Vec::new(),
                skipped: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct HostSummary {
    variant: &'static str,
    mods_dir: String,
    triggers: Vec<TriggerInfo>,
    reloads: Vec<ReloadOutcome>,
}

fn load_settings(options: &HostOptions) -> anyhow::Result<HotReloadSettings> {
    let mut settings = match &options.settings {
        Some(path) => HotReloadSettings::load(path).map_err(|report| anyhow::anyhow!("{report:?}"))?,
        None => HotReloadSettings::from_env().map_err(|report| anyhow::anyhow!("{report:?}"))?,
    };
    if options.auto_reload {
        settings.auto_reload = true;
    }
    Ok(settings)
}

fn load_simple(
    modules: &Arc<WasmModuleSystem>,
    dir: &Path,
) -> anyhow::Result<(Arc<dyn HostAdapter>, Vec<Arc<ModInstance>>)> {
    let loader = Arc::new(ModLoader::new(modules.clone()));
    let instances = loader.load_mods(dir)?;
    Ok((Arc::new(SimpleLoaderAdapter::new(loader)), instances))
}

fn load_packages(
    modules: &Arc<WasmModuleSystem>,
    dir: &Path,
) -> anyhow::Result<(Arc<dyn HostAdapter>, Vec<Arc<ModInstance>>)> {
    let loader = Arc::new(PackageLoader::new(modules.clone()));
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_module_file(path, MODULE_EXTENSION))
        .collect();
    files.sort();

    let mut instances = Vec::new();
    for file in files {
        match loader.load_package(&file) {
            Ok(package) => instances.extend(package.mods().iter().cloned()),
            Err(e) => warn!("Skipping {}: {}", file.display(), e),
        }
    }
    Ok((Arc::new(PackageLoaderAdapter::new(loader)), instances))
}

fn triggers(reloader: &HotReloader) -> Vec<TriggerInfo> {
    reloader
        .registry()
        .entries()
        .into_iter()
        .map(|entry| TriggerInfo {
            type_name: entry.current.type_name().to_string(),
            module_name: entry.current.module_name().to_string(),
            label: entry.label,
            reload_count: entry.reload_count,
        })
        .collect()
}

fn print_triggers(reloader: &HotReloader) {
    output::section(&format!("Triggers ({})", reloader.settings().menu_path));
    let mut table = output::table(&["Mod type", "Module", "Trigger"]);
    for trigger in triggers(reloader) {
        table.add_row(vec![trigger.type_name, trigger.module_name, trigger.label]);
    }
    println!("{table}");
}

fn print_outcome(outcome: &ReloadOutcome) {
    match (&outcome.error, &outcome.module_name) {
        (None, Some(module)) => output::success(&format!(
            "Reloaded {} as {} (reload {}, {} config keys carried)",
            outcome.type_name,
            module,
            outcome.reload_count.unwrap_or_default(),
            outcome.migrated.len()
        )),
        (Some(error), _) => output::failure(&format!("{}: {}", outcome.type_name, error)),
        _ => {}
    }
}

/// Execute the `modswap host` command
pub fn run(options: HostOptions, format: OutputFormat) -> anyhow::Result<()> {
    let settings = load_settings(&options)?;
    let modules = Arc::new(WasmModuleSystem::new()?);
    let menu = Arc::new(ActionMenu::new());

    let (adapter, instances) = match options.variant {
        HostVariant::Simple => load_simple(&modules, &options.mods_dir)?,
        HostVariant::Package => load_packages(&modules, &options.mods_dir)?,
    };
    let variant = adapter.variant();
    let reloader = HotReloader::new(adapter, modules, menu.clone(), settings);

    for instance in &instances {
        if let Err(e) = reloader.register_for_hot_reload(instance) {
            warn!("Not registering {}: {}", instance.type_name(), e);
        }
    }
    menu.mark_initialized();
    info!("Registered {} mods for hot reload", reloader.registry().len());

    let mut reloads = Vec::new();
    for type_name in &options.reload {
        let result = reloader.hot_reload(type_name);
        reloads.push(ReloadOutcome::new(type_name, &result));
    }

    match format {
        OutputFormat::Json => output::print_json(&HostSummary {
            variant,
            mods_dir: options.mods_dir.display().to_string(),
            triggers: triggers(&reloader),
            reloads,
        })?,
        OutputFormat::Text => {
            reloads.iter().for_each(print_outcome);
            print_triggers(&reloader);
        }
    }

    if !options.watch {
        return Ok(());
    }

    reloader.start_watching()?;
    info!(
        "Watching {} directories (auto reload: {})",
        reloader.settings().watched_directory,
        reloader.settings().auto_reload
    );
    loop {
        for (type_name, result) in reloader.process_watch_events() {
            let outcome = ReloadOutcome::new(&type_name, &result);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string(&outcome)?),
                OutputFormat::Text => print_outcome(&outcome),
            }
        }
        std::thread::sleep(options.poll);
    }
}
