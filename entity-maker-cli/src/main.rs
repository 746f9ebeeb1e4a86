//! entity-maker CLI tool

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use entity_maker::observability::{self, ObservabilityConfig};
use entity_maker_cli_lib::{FieldsCommand, GlobalArgs, MakeCommand};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "entity-maker")]
#[command(version)]
#[command(about = "Scaffold Doctrine entities, fields, and relations", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an entity or add properties to it
    Make(MakeCommand),
    /// List the properties an entity declares
    Fields(FieldsCommand),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    observability::init(
        &ObservabilityConfig::new(cli.global.log_format).with_default_directive("warn"),
    )?;
    let config = cli.global.load_config()?;
    tracing::debug!(root = %config.project.root.display(), "configuration loaded");

    match cli.command {
        Commands::Make(cmd) => {
            if cmd.execute(&config)?.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Fields(cmd) => {
            cmd.execute(&config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
