mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .expect("failed to set Ctrl+C handler");

    let cli = Cli::parse();

    // dotinterop info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("dotinterop", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Generate {
            config,
            winmd,
            output,
            dry_run,
        } => commands::generate::run(
            config,
            &commands::generate::GenerateOptions {
                winmd: winmd.as_deref(),
                output: output.as_deref(),
                dry_run: *dry_run,
            },
            &cli.global,
        ),
        Command::Select { config, winmd } => {
            commands::select::run(config, winmd.as_deref(), &cli.global)
        }
        Command::Types {
            path,
            namespace,
            kind,
        } => commands::types::run(path, namespace.as_deref(), kind.as_deref(), &cli.global),
    }
}
