//! entity-maker: declarative scaffolding for Doctrine entity classes
//!
//! Given an entity name and an ordered list of properties, the engine creates the entity
//! class if needed and adds fields and relations to it. For every relation it decides
//! which side owns the association, derives the name of the other side, refuses to edit
//! classes outside user-editable source, and keeps each touched file consistent after
//! every property.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use entity_maker::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = EntityMakerConfig::load_for_project(std::path::Path::new("."))?;
//! let registry = Psr4Registry::new(&config.project);
//! let store = FsStore::new(&config.project.root);
//! let mut maker = EntityMaker::new(registry, store, config.generation)?;
//!
//! let request = EntityGenerationRequest::new("Product")
//!     .with_property(PropertyRequest::scalar("title", ScalarKind::String).with_max_length(120))
//!     .with_property(PropertyRequest::relation("category", RelationType::ManyToOne, "Category"));
//!
//! let report = maker.generate(&request)?;
//! for path in &report.written {
//!     println!("wrote {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`field::FieldResolver`] splits requests into scalar columns and relation requests
//! - [`relation::RelationResolver`] decides relation ownership and naming
//! - [`maker::EntityMaker`] sequences edits and writes
//! - [`mutator::SourceMutator`] edits class text; [`mutator::PhpClassManipulator`] is the
//!   Doctrine implementation
//! - [`registry::EntityRegistry`] and [`store::SourceStore`] resolve and persist sources

pub mod config;
pub mod error;
pub mod field;
pub mod maker;
pub mod mutator;
pub mod naming;
pub mod observability;
pub mod registry;
pub mod relation;
pub mod request;
pub mod skeleton;
pub mod store;
pub mod templates;

pub use error::{EntityMakerError, ErrorKind, GenerationOutcome, Result};

pub mod prelude {
    //! Convenience re-exports
    //!
    //! ```rust
    //! use entity_maker::prelude::*;
    //! ```

    pub use crate::config::{EntityMakerConfig, GenerationSettings, NullabilityPolicy, ProjectSettings};
    pub use crate::error::{EntityMakerError, ErrorKind, GenerationOutcome};
    pub use crate::maker::{EntityMaker, GenerationReport};
    pub use crate::mutator::{PhpClassManipulator, SourceMutator};
    pub use crate::registry::{EntityRegistry, Psr4Registry};
    pub use crate::request::{
        EntityGenerationRequest, PropertyKind, PropertyRequest, RelationType, ScalarKind,
    };
    pub use crate::store::{FsStore, MemoryStore, OverlayStore, SourceStore};
}
