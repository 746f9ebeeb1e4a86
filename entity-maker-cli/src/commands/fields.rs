//! `fields` command: list the properties an entity declares

use anyhow::{bail, Result};
use clap::Args;
use console::style;
use entity_maker::config::EntityMakerConfig;
use entity_maker::prelude::*;

/// Arguments of `entity-maker fields`
#[derive(Debug, Clone, Args)]
pub struct FieldsCommand {
    /// Entity name
    pub entity: String,
}

impl FieldsCommand {
    /// Print and return the entity's property names
    ///
    /// # Errors
    ///
    /// Returns an error if the entity has no source or its source cannot be parsed.
    pub fn execute(&self, config: &EntityMakerConfig) -> Result<Vec<String>> {
        let registry = Psr4Registry::new(&config.project);
        let store = FsStore::new(&config.project.root);

        let class = registry.qualify(&self.entity);
        let path = registry.path_of(&class);
        if !store.exists(&path) {
            bail!("{class} has no source at {}", path.display());
        }

        let maker = EntityMaker::new(registry, store, config.generation.clone())?;
        let fields = maker.field_names(&self.entity)?;

        println!("{} ({})", style(&class).bold(), style(path.display()).dim());
        for field in &fields {
            println!("  {field}");
        }
        Ok(fields)
    }
}
