//! `modswap rewrite` command implementation

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use modswap_reload::IdentityRewriter;

use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct RewriteInfo {
    source: String,
    output: String,
    original_name: String,
    new_name: String,
}

fn default_output(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("module");
    path.with_file_name(format!("{stem}.rewritten.wasm"))
}

/// Execute the `modswap rewrite` command
pub fn run(path: &Path, out: Option<&Path>, format: OutputFormat) -> anyhow::Result<()> {
    let rewritten = IdentityRewriter::rewrite(path)?;
    let out = out.map(Path::to_path_buf).unwrap_or_else(|| default_output(path));
    std::fs::write(&out, &rewritten.bytes)
        .with_context(|| format!("writing {}", out.display()))?;

    let info = RewriteInfo {
        source: path.display().to_string(),
        output: out.display().to_string(),
        original_name: rewritten.original_name,
        new_name: rewritten.new_name,
    };
    match format {
        OutputFormat::Json => output::print_json(&info),
        OutputFormat::Text => {
            output::success(&format!(
                "{} -> {} ({})",
                info.original_name, info.new_name, info.output
            ));
            Ok(())
        }
    }
}
