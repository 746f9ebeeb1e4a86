//! entity-maker CLI library

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod commands;

use anyhow::{Context, Result};
use clap::Args;
use entity_maker::config::EntityMakerConfig;
use entity_maker::observability::LogFormat;
use std::path::{Path, PathBuf};

pub use commands::{FieldsCommand, MakeCommand};

/// Options shared by every subcommand
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Configuration file, used instead of the layered lookup
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format (pretty or json)
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl GlobalArgs {
    /// Resolve the configuration for this invocation
    ///
    /// An explicit `--config` file is loaded on its own; otherwise the layered lookup
    /// runs for the project root. `--root` always wins over a configured root.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory is unavailable or the configuration
    /// cannot be loaded.
    pub fn load_config(&self) -> Result<EntityMakerConfig> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to get current directory")?,
        };

        let mut config = match &self.config {
            Some(path) => EntityMakerConfig::load_from(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => EntityMakerConfig::load_for_project(&root)
                .with_context(|| format!("Failed to load configuration for {}", root.display()))?,
        };

        if self.root.is_some() || config.project.root == Path::new(".") {
            config.project.root = root;
        }
        Ok(config)
    }
}
