//! `make` command: create or extend an entity
//!
//! # Example
//!
//! ```bash
//! entity-maker make Product \
//!   title:string:length=120:unique \
//!   price:float \
//!   category:many_to_one:Category:required
//! ```

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use entity_maker::config::EntityMakerConfig;
use entity_maker::prelude::*;
use entity_maker::store::PendingChange;
use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments of `entity-maker make`
#[derive(Debug, Clone, Default, Args)]
pub struct MakeCommand {
    /// Entity name (`Product`, `Admin\User`, or `\Vendor\Entity\Class`)
    #[arg(required_unless_present = "from")]
    pub entity: Option<String>,

    /// Property definitions (e.g. `title:string:length=120`, `category:many_to_one:Category`)
    pub fields: Vec<String>,

    /// Read the request from a JSON or TOML document
    #[arg(long, value_name = "FILE")]
    pub from: Option<PathBuf>,

    /// Add `#[ApiResource]` to a newly created entity
    #[arg(long)]
    pub api_resource: bool,

    /// Rewrite the existing accessors of the entity
    #[arg(long)]
    pub regenerate: bool,

    /// Keep existing accessors that collide with generated ones
    #[arg(long)]
    pub no_overwrite: bool,

    /// Show the changes as diffs without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl MakeCommand {
    /// Build the generation request from the document and the command line
    ///
    /// Command-line properties are appended after the document's; flags only ever
    /// switch options on.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or decoded, a property
    /// definition is invalid, or no entity name is given.
    pub fn build_request(&self, config: &EntityMakerConfig) -> Result<EntityGenerationRequest> {
        let mut request = match &self.from {
            Some(path) => read_request(path, config.generation.overwrite)?,
            None => {
                let entity = self.entity.as_deref().context("An entity name is required")?;
                EntityGenerationRequest::new(entity).with_overwrite(config.generation.overwrite)
            }
        };

        if let Some(entity) = &self.entity {
            request.entity_name.clone_from(entity);
        }
        for spec in &self.fields {
            request.properties.push(PropertyRequest::parse(spec)?);
        }
        request.api_resource |= self.api_resource;
        request.regenerate |= self.regenerate;
        if self.no_overwrite {
            request.overwrite = false;
        }

        Ok(request)
    }

    /// Run the command
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built. Generation failures are
    /// reported and returned as [`GenerationOutcome::Failure`].
    pub fn execute(&self, config: &EntityMakerConfig) -> Result<GenerationOutcome> {
        let request = self.build_request(config)?;

        println!(
            "\n{} {}{}",
            style("Generating").cyan().bold(),
            style(&request.entity_name).green().bold(),
            if self.dry_run {
                style(" (dry run)").yellow().to_string()
            } else {
                String::new()
            }
        );

        let registry = Psr4Registry::new(&config.project);
        let store = FsStore::new(&config.project.root);

        if self.dry_run {
            let mut maker =
                EntityMaker::new(registry, OverlayStore::new(store), config.generation.clone())?;
            let outcome = report(maker.generate(&request));

            let overlay = maker.into_store();
            let changes = overlay.changes()?;
            if changes.is_empty() {
                println!("\n{}", style("No changes").dim());
            }
            for change in &changes {
                print_diff(&unified_diff(change));
            }
            return Ok(outcome);
        }

        let mut maker = EntityMaker::new(registry, store, config.generation.clone())?;
        Ok(report(maker.generate(&request)))
    }
}

fn read_request(path: &Path, default_overwrite: bool) -> Result<EntityGenerationRequest> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path.display()))?;

    let request = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml")) {
        EntityGenerationRequest::from_toml_with_overwrite(&input, default_overwrite)
    } else {
        EntityGenerationRequest::from_json_with_overwrite(&input, default_overwrite)
    };
    request.with_context(|| format!("Failed to decode request file: {}", path.display()))
}

fn report(result: entity_maker::Result<GenerationReport>) -> GenerationOutcome {
    let outcome = GenerationOutcome::from(&result);
    match result {
        Ok(report) => {
            let verb = if report.created { "Created" } else { "Updated" };
            println!(
                "\n{} {} ({})",
                style(verb).green().bold(),
                style(&report.entity_class).bold(),
                style(report.entity_path.display()).dim()
            );
            for path in &report.written {
                println!("  {} {}", style("✓").green(), style(path.display()).dim());
            }
            if !report.fields.is_empty() {
                println!("  fields: {}", report.fields.join(", "));
            }
        }
        Err(err) => {
            eprintln!(
                "\n{} {} [{}]",
                style("✗").red().bold(),
                style(&err).red(),
                err.kind()
            );
            eprintln!("  files flushed before the failure were kept");
        }
    }
    outcome
}

/// Unified diff of one pending change, `/dev/null` standing in for new files
#[must_use]
pub fn unified_diff(change: &PendingChange<'_>) -> String {
    let path = change.path.display();
    let old_header = change
        .before
        .as_ref()
        .map_or_else(|| "/dev/null".to_string(), |_| format!("a/{path}"));
    let new_header = format!("b/{path}");

    let diff = TextDiff::from_lines(change.before.as_deref().unwrap_or_default(), change.after);
    let mut unified = diff.unified_diff();
    unified.context_radius(3).header(&old_header, &new_header);
    unified.to_string()
}

fn print_diff(diff: &str) {
    println!();
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", style(line).bold());
        } else if line.starts_with("@@") {
            println!("{}", style(line).cyan());
        } else if line.starts_with('+') {
            println!("{}", style(line).green());
        } else if line.starts_with('-') {
            println!("{}", style(line).red());
        } else {
            println!("{line}");
        }
    }
}
