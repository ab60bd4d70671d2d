//! `modswap inspect` command implementation

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use modswap_host::WasmModuleSystem;
use modswap_kernel::image::ModuleImage;
use modswap_kernel::module::{HookKind, LoadedModule};

use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct ModuleInfo {
    file: String,
    module_name: String,
    /// False when the name falls back to the file stem
    declared_name: bool,
    teardown_hook: bool,
    startup_hook: bool,
    mods: Vec<ModInfo>,
}

#[derive(Debug, Serialize)]
struct ModInfo {
    type_name: String,
    name: Option<String>,
    author: Option<String>,
    version: Option<String>,
    link: Option<String>,
    config: Vec<KeyInfo>,
}

#[derive(Debug, Serialize)]
struct KeyInfo {
    name: String,
    #[serde(rename = "type")]
    value_type: String,
    default: Option<String>,
    description: Option<String>,
}

/// Execute the `modswap inspect` command
pub fn run(path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let declared_name = ModuleImage::parse(&bytes)?.module_name()?.is_some();

    let modules = WasmModuleSystem::new()?;
    let module = modules.load_wasm(bytes, path)?;

    let mut mods = Vec::new();
    for descriptor in &module.manifest().mods {
        let config = descriptor
            .build_configuration_definition(module.name())?
            .map(|definition| {
                definition
                    .keys()
                    .iter()
                    .map(|key| KeyInfo {
                        name: key.name().to_string(),
                        value_type: key.value_type().to_string(),
                        default: key.default_value().map(ToString::to_string),
                        description: key.description().map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();

        mods.push(ModInfo {
            type_name: descriptor.type_name.clone(),
            name: descriptor.name.clone(),
            author: descriptor.author.clone(),
            version: descriptor.version.clone(),
            link: descriptor.link.clone(),
            config,
        });
    }

    let info = ModuleInfo {
        file: path.display().to_string(),
        module_name: module.name().to_string(),
        declared_name,
        teardown_hook: module.has_hook(HookKind::Teardown),
        startup_hook: module.has_hook(HookKind::Startup),
        mods,
    };

    match format {
        OutputFormat::Json => output::print_json(&info),
        OutputFormat::Text => {
            print_text(&info);
            Ok(())
        }
    }
}

fn print_text(info: &ModuleInfo) {
    let yes_no = |b: bool| if b { "yes" } else { "no" };

    output::section("Module");
    println!("    File:     {}", info.file);
    if info.declared_name {
        println!("    Name:     {}", info.module_name);
    } else {
        println!("    Name:     {} (from file name)", info.module_name);
    }
    println!("    Teardown: {}", yes_no(info.teardown_hook));
    println!("    Startup:  {}", yes_no(info.startup_hook));

    for m in &info.mods {
        output::section(&m.type_name);
        println!("    Name:    {}", m.name.as_deref().unwrap_or("-"));
        println!("    Author:  {}", m.author.as_deref().unwrap_or("-"));
        println!("    Version: {}", m.version.as_deref().unwrap_or("-"));
        if let Some(link) = &m.link {
            println!("    Link:    {}", link);
        }
        if !m.config.is_empty() {
            let mut table = output::table(&["Key", "Type", "Default", "Description"]);
            for key in &m.config {
                table.add_row(vec![
                    key.name.as_str(),
                    key.value_type.as_str(),
                    key.default.as_deref().unwrap_or("-"),
                    key.description.as_deref().unwrap_or(""),
                ]);
            }
            println!("{table}");
        }
    }
    println!();
}
