//! New entity classes
//!
//! Renders the minimal entity a request starts from, plus its repository.

use crate::error::{EntityMakerError, Result};
use crate::naming::Naming;
use crate::registry::EntityRegistry;
use crate::store::SourceStore;
use crate::templates::{self, TemplateRegistry};
use minijinja::context;
use std::path::PathBuf;

const API_RESOURCE: &str = "ApiPlatform\\Metadata\\ApiResource";
const ORM_MAPPING: &str = "Doctrine\\ORM\\Mapping as ORM";
const SERVICE_ENTITY_REPOSITORY: &str =
    "Doctrine\\Bundle\\DoctrineBundle\\Repository\\ServiceEntityRepository";
const MANAGER_REGISTRY: &str = "Doctrine\\Persistence\\ManagerRegistry";

/// Files written for a new entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSkeleton {
    /// Entity source
    pub entity_path: PathBuf,
    /// Repository source, when it did not exist yet
    pub repository_path: Option<PathBuf>,
}

/// Writes entity and repository skeletons
#[derive(Debug)]
pub struct EntityClassGenerator {
    templates: TemplateRegistry,
}

fn sorted_imports(imports: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut imports: Vec<String> = imports.into_iter().collect();
    imports.sort_by_key(|import| import.to_ascii_lowercase());
    imports.dedup();
    imports
}

impl EntityClassGenerator {
    /// Generator with the embedded templates
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to parse.
    pub fn new() -> Result<Self> {
        Ok(Self {
            templates: TemplateRegistry::new()?,
        })
    }

    /// Render the source of a new entity class
    ///
    /// # Errors
    ///
    /// Returns [`EntityMakerError::InvalidEntityName`] for a class in the global
    /// namespace, or a template error.
    pub fn render_entity(&self, class: &str, repository: &str, api_resource: bool) -> Result<String> {
        let namespace = Naming::namespace_of(class);
        if namespace.is_empty() {
            return Err(EntityMakerError::InvalidEntityName(class.to_string()));
        }

        let mut imports = vec![ORM_MAPPING.to_string()];
        if api_resource {
            imports.push(API_RESOURCE.to_string());
        }
        if Naming::namespace_of(repository) != namespace {
            imports.push(repository.to_string());
        }

        let mut source = self.templates.render(
            templates::ENTITY,
            context! {
                namespace,
                imports => sorted_imports(imports),
                class_name => Naming::short_class_name(class),
                repository_short => Naming::short_class_name(repository),
                api_resource,
            },
        )?;
        source.push('\n');
        Ok(source)
    }

    /// Render the source of a repository for `entity`
    ///
    /// # Errors
    ///
    /// Returns [`EntityMakerError::InvalidEntityName`] for a repository in the global
    /// namespace, or a template error.
    pub fn render_repository(&self, repository: &str, entity: &str) -> Result<String> {
        let namespace = Naming::namespace_of(repository);
        if namespace.is_empty() {
            return Err(EntityMakerError::InvalidEntityName(repository.to_string()));
        }

        let mut imports = vec![
            SERVICE_ENTITY_REPOSITORY.to_string(),
            MANAGER_REGISTRY.to_string(),
        ];
        if Naming::namespace_of(entity) != namespace {
            imports.push(entity.to_string());
        }

        let mut source = self.templates.render(
            templates::REPOSITORY,
            context! {
                namespace,
                imports => sorted_imports(imports),
                class_name => Naming::short_class_name(repository),
                entity_short => Naming::short_class_name(entity),
            },
        )?;
        source.push('\n');
        Ok(source)
    }

    /// Write a new entity class and, if absent, its repository
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    pub fn generate<R, S>(
        &self,
        registry: &R,
        store: &mut S,
        class: &str,
        api_resource: bool,
    ) -> Result<GeneratedSkeleton>
    where
        R: EntityRegistry + ?Sized,
        S: SourceStore + ?Sized,
    {
        let repository = registry.repository_of(class);

        let entity_path = registry.path_of(class);
        let entity_source = self.render_entity(class, &repository, api_resource)?;
        store.write(&entity_path, &entity_source)?;
        tracing::info!(class, path = %entity_path.display(), api_resource, "created entity");

        let candidate = registry.path_of(&repository);
        let repository_path = if store.exists(&candidate) {
            None
        } else {
            let source = self.render_repository(&repository, class)?;
            store.write(&candidate, &source)?;
            tracing::info!(class = %repository, path = %candidate.display(), "created repository");
            Some(candidate)
        };

        Ok(GeneratedSkeleton {
            entity_path,
            repository_path,
        })
    }
}
