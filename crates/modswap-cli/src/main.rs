//! modswap CLI - inspect mod modules and run a development host with hot reload

mod cli;
mod commands;
mod output;

use std::time::Duration;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("info")
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Inspect { module } => commands::inspect::run(&module, cli.output),

        Commands::Rewrite { module, out } => {
            commands::rewrite::run(&module, out.as_deref(), cli.output)
        }

        Commands::Host {
            mods_dir,
            variant,
            settings,
            auto_reload,
            reload,
            watch,
            poll_ms,
        } => commands::host::run(
            commands::host::HostOptions {
                mods_dir,
                variant,
                settings,
                auto_reload,
                reload,
                watch,
                poll: Duration::from_millis(poll_ms),
            },
            cli.output,
        ),

        Commands::Settings { format } => commands::settings::run(format),
    }
}
