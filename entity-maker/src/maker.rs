//! Generation orchestrator
//!
//! Drives one [`EntityGenerationRequest`] end to end: creates the entity when it does not
//! exist, then applies every requested property in order, flushing the touched files
//! after each one. Processing stops at the first failure; files flushed before it stay
//! written.

use crate::config::GenerationSettings;
use crate::error::{EntityMakerError, GenerationOutcome, Result};
use crate::field::{FieldClassification, FieldResolver};
use crate::mutator::{PhpClassManipulator, SourceMutator};
use crate::naming::{validate_class_name, validate_field_name};
use crate::registry::EntityRegistry;
use crate::relation::{RelationDescriptor, RelationKind, RelationResolver, RelationSide};
use crate::request::EntityGenerationRequest;
use crate::skeleton::EntityClassGenerator;
use crate::store::SourceStore;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// What a successful run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// Fully-qualified entity class
    pub entity_class: String,
    /// Entity source path
    pub entity_path: PathBuf,
    /// The entity did not exist and was created
    pub created: bool,
    /// Every write, in order
    pub written: Vec<PathBuf>,
    /// Properties added to the entity itself
    pub fields: Vec<String>,
}

/// A class other than the target, loaded for a single step
struct OtherClass<M> {
    class: String,
    path: PathBuf,
    mutator: M,
}

/// Entity generation engine
///
/// `M` is the source mutator used for every class; it defaults to
/// [`PhpClassManipulator`].
pub struct EntityMaker<R, S, M = PhpClassManipulator> {
    registry: R,
    store: S,
    settings: GenerationSettings,
    skeletons: EntityClassGenerator,
    mutator: PhantomData<fn() -> M>,
}

impl<R: EntityRegistry, S: SourceStore> EntityMaker<R, S> {
    /// Engine editing PHP sources
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded templates fail to load.
    pub fn new(registry: R, store: S, settings: GenerationSettings) -> Result<Self> {
        Self::with_mutator(registry, store, settings)
    }
}

impl<R, S, M> EntityMaker<R, S, M>
where
    R: EntityRegistry,
    S: SourceStore,
    M: SourceMutator,
{
    /// Engine with a custom source mutator
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded templates fail to load.
    pub fn with_mutator(registry: R, store: S, settings: GenerationSettings) -> Result<Self> {
        Ok(Self {
            registry,
            store,
            settings,
            skeletons: EntityClassGenerator::new()?,
            mutator: PhantomData,
        })
    }

    /// Entity registry
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Source store
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Consume the engine, returning its store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Current property names of an entity, empty if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the entity source cannot be read or parsed.
    pub fn field_names(&self, entity: &str) -> Result<Vec<String>> {
        validate_class_name(entity)?;
        let path = self.registry.path_of(&self.registry.qualify(entity));
        if !self.store.exists(&path) {
            return Ok(Vec::new());
        }
        Ok(M::load(&self.store.read(&path)?, false)?.property_names())
    }

    /// Run a request, collapsing the result into an outcome
    pub fn run(&mut self, request: &EntityGenerationRequest) -> GenerationOutcome {
        let result = self.generate(request);
        if let Err(err) = &result {
            tracing::error!(entity = %request.entity_name, error = %err, "generation failed");
        }
        GenerationOutcome::from(&result)
    }

    /// Run a request
    ///
    /// # Errors
    ///
    /// Returns the first failure; properties before it have already been written.
    pub fn generate(&mut self, request: &EntityGenerationRequest) -> Result<GenerationReport> {
        let span = tracing::info_span!("generate", entity = %request.entity_name);
        let _guard = span.enter();

        validate_class_name(&request.entity_name)?;
        let class = self.registry.qualify(&request.entity_name);
        let path = self.registry.path_of(&class);
        if self.registry.is_externally_owned(&class) {
            return Err(EntityMakerError::InvalidEntityName(format!(
                "{class} (externally owned, at {})",
                path.display()
            )));
        }

        let mut report = GenerationReport {
            entity_class: class.clone(),
            entity_path: path.clone(),
            created: false,
            written: Vec::new(),
            fields: Vec::new(),
        };

        if !self.store.exists(&path) {
            let skeleton =
                self.skeletons
                    .generate(&self.registry, &mut self.store, &class, request.api_resource)?;
            report.created = true;
            report.written.push(skeleton.entity_path);
            report.written.extend(skeleton.repository_path);
        } else if request.regenerate {
            tracing::info!(class = %class, "regenerating accessors of existing entity");
        }

        let mut target = M::load(
            &self.store.read(&path)?,
            request.overwrite || request.regenerate,
        )?;
        let mut known_fields = target.property_names();

        let field_resolver = FieldResolver::from_settings(&self.settings);
        let relation_resolver = RelationResolver::new(&self.registry, self.settings.nullability);

        for property in &request.properties {
            validate_field_name(&property.name)?;
            if known_fields.contains(&property.name) {
                return Err(EntityMakerError::invalid_field(
                    &property.name,
                    format!("already defined on {class}"),
                ));
            }

            let mut other: Option<OtherClass<M>> = None;
            let mut added = vec![property.name.clone()];

            match field_resolver.classify(property)? {
                FieldClassification::Scalar(field) => {
                    tracing::debug!(field = %field.name, kind = %field.kind, nullable = field.nullable, "resolved field");
                    target.add_scalar_field(&field)?;
                }
                FieldClassification::Relation(relation_request) => {
                    let relation = relation_resolver.resolve(&class, &relation_request)?;

                    // the owning side of a one-to-many lives on the related entity
                    if relation.owning_class() != class
                        && (!relation.map_inverse()
                            || self.registry.is_externally_owned(relation.owning_class()))
                    {
                        return Err(EntityMakerError::InverseMappingInconsistency(format!(
                            "one-to-many '{}' needs the many-to-one side on {}, which cannot be edited",
                            property.name,
                            relation.owning_class()
                        )));
                    }

                    if relation.is_self_referencing() {
                        // both sides land on the target; the one not requested is derived
                        if let Some(inverse) = relation.inverse_side() {
                            let derived = if inverse.property == property.name {
                                relation.owning_property().to_string()
                            } else {
                                inverse.property
                            };
                            if known_fields.contains(&derived) {
                                return Err(EntityMakerError::invalid_field(
                                    derived,
                                    format!("already defined on {class}"),
                                ));
                            }
                            added.push(derived);
                        }
                    } else {
                        other = self.load_other(&class, &relation, request.overwrite)?;
                        if let Some(other) = &other {
                            let derived = other_side_property(&class, &relation);
                            if other.mutator.property_names().iter().any(|name| name == derived) {
                                return Err(EntityMakerError::invalid_field(
                                    derived,
                                    format!("already defined on {}", other.class),
                                ));
                            }
                        }
                    }

                    let owning = relation.owning_side();
                    let inverse = relation.inverse_side();

                    if relation.owning_class() == class {
                        apply_side(&mut target, &owning)?;
                    } else if let Some(other) = other.as_mut() {
                        apply_side(&mut other.mutator, &owning)?;
                    }

                    if let Some(inverse) = inverse {
                        if relation.inverse_class() == class {
                            apply_side(&mut target, &inverse)?;
                        } else if let Some(other) = other.as_mut() {
                            apply_side(&mut other.mutator, &inverse)?;
                        }
                    }
                }
            }

            let mut pending = BTreeMap::new();
            pending.insert(path.clone(), target.rendered_source());
            if let Some(other) = &other {
                pending.insert(other.path.clone(), other.mutator.rendered_source());
            }
            for (file, contents) in pending {
                self.store.write(&file, &contents)?;
                tracing::info!(path = %file.display(), property = %property.name, "flushed");
                report.written.push(file);
            }

            report.fields.push(property.name.clone());
            known_fields.extend(added);
        }

        Ok(report)
    }

    /// Load the non-target class a relation step touches, if any
    fn load_other(
        &self,
        class: &str,
        relation: &RelationDescriptor,
        overwrite: bool,
    ) -> Result<Option<OtherClass<M>>> {
        let other_class = if relation.owning_class() == class {
            if !relation.map_inverse() {
                return Ok(None);
            }
            relation.inverse_class()
        } else {
            relation.owning_class()
        };

        let path = self.registry.path_of(other_class);
        if !self.store.exists(&path) {
            return Err(missing_entity(other_class, &path));
        }
        let mutator = M::load(&self.store.read(&path)?, overwrite)?;

        Ok(Some(OtherClass {
            class: other_class.to_string(),
            path,
            mutator,
        }))
    }
}

fn missing_entity(class: &str, path: &Path) -> EntityMakerError {
    EntityMakerError::InvalidEntityName(format!(
        "{class} (no source at {})",
        path.display()
    ))
}

/// Property a relation places on the class other than `class`
fn other_side_property<'d>(class: &str, relation: &'d RelationDescriptor) -> &'d str {
    if relation.owning_class() == class {
        relation.inverse_property().unwrap_or_default()
    } else {
        relation.owning_property()
    }
}

fn apply_side<M: SourceMutator>(mutator: &mut M, side: &RelationSide) -> Result<()> {
    match (side.kind, side.owning) {
        (RelationKind::ManyToOne, true) => mutator.add_many_to_one(side),
        (RelationKind::ManyToOne, false) => mutator.add_one_to_many(side),
        (RelationKind::ManyToMany, _) => mutator.add_many_to_many(side),
        (RelationKind::OneToOne, _) => mutator.add_one_to_one(side),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ScalarFieldDescriptor;
    use crate::registry::Psr4Registry;
    use crate::request::{PropertyRequest, RelationType, ScalarKind};
    use crate::store::MemoryStore;
    use std::sync::{Mutex, PoisonError};

    static LOG: Mutex<Vec<String>> = Mutex::new(Vec::new());

    /// Mutator that records calls and renders its property list
    struct Recording {
        class: String,
        properties: Vec<String>,
    }

    impl Recording {
        fn record(&mut self, call: &str, property: &str) {
            LOG.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(format!("{}::{call}({property})", self.class));
            self.properties.push(property.to_string());
        }
    }

    impl SourceMutator for Recording {
        fn load(source: &str, _overwrite: bool) -> Result<Self> {
            let mut lines = source.lines();
            let class = lines
                .next()
                .ok_or_else(|| EntityMakerError::MalformedSource("empty".to_string()))?
                .to_string();
            Ok(Self {
                class,
                properties: lines.map(str::to_string).collect(),
            })
        }

        fn property_names(&self) -> Vec<String> {
            self.properties.clone()
        }

        fn add_scalar_field(&mut self, field: &ScalarFieldDescriptor) -> Result<()> {
            self.record("scalar", &field.name);
            Ok(())
        }

        fn add_many_to_one(&mut self, side: &RelationSide) -> Result<()> {
            self.record("many_to_one", &side.property);
            Ok(())
        }

        fn add_one_to_many(&mut self, side: &RelationSide) -> Result<()> {
            self.record("one_to_many", &side.property);
            Ok(())
        }

        fn add_many_to_many(&mut self, side: &RelationSide) -> Result<()> {
            self.record("many_to_many", &side.property);
            Ok(())
        }

        fn add_one_to_one(&mut self, side: &RelationSide) -> Result<()> {
            self.record("one_to_one", &side.property);
            Ok(())
        }

        fn rendered_source(&self) -> String {
            let mut lines = vec![self.class.clone()];
            lines.extend(self.properties.iter().cloned());
            lines.join("\n")
        }
    }

    fn maker(store: MemoryStore) -> EntityMaker<Psr4Registry, MemoryStore, Recording> {
        EntityMaker::with_mutator(Psr4Registry::default(), store, GenerationSettings::default())
            .unwrap()
    }

    fn take_log(prefix: &str) -> Vec<String> {
        let mut log = LOG.lock().unwrap_or_else(PoisonError::into_inner);
        let (mine, rest): (Vec<String>, Vec<String>) =
            log.drain(..).partition(|entry| entry.starts_with(prefix));
        *log = rest;
        mine
    }

    #[test]
    fn test_self_reference_shares_one_mutator() {
        let store = MemoryStore::new().with_file("src/Entity/Node.php", "Node\nid");
        let mut maker = maker(store);

        let request = EntityGenerationRequest::new("Node").with_property(PropertyRequest::relation(
            "parent",
            RelationType::ManyToOne,
            "Node",
        ));
        let report = maker.generate(&request).unwrap();

        assert_eq!(
            take_log("Node::"),
            vec!["Node::many_to_one(parent)", "Node::one_to_many(nodes)"]
        );
        assert_eq!(report.written, vec![PathBuf::from("src/Entity/Node.php")]);
        assert_eq!(
            maker.store().get("src/Entity/Node.php"),
            Some("Node\nid\nparent\nnodes")
        );
    }

    #[test]
    fn test_each_file_written_once_per_step() {
        let store = MemoryStore::new()
            .with_file("src/Entity/Shelf.php", "Shelf\nid")
            .with_file("src/Entity/Book.php", "Book\nid");
        let mut maker = maker(store);

        let request = EntityGenerationRequest::new("Book")
            .with_property(PropertyRequest::scalar("title", ScalarKind::String))
            .with_property(PropertyRequest::relation("shelf", RelationType::ManyToOne, "Shelf"));
        maker.generate(&request).unwrap();

        let store = maker.store();
        assert_eq!(store.write_count("src/Entity/Book.php"), 2);
        assert_eq!(store.write_count("src/Entity/Shelf.php"), 1);
        assert_eq!(store.get("src/Entity/Shelf.php"), Some("Shelf\nid\nbooks"));
        take_log("Book::");
        take_log("Shelf::");
    }

    #[test]
    fn test_one_to_many_owned_by_related_entity() {
        let store = MemoryStore::new()
            .with_file("src/Entity/Basket.php", "Basket\nid")
            .with_file("src/Entity/Fruit.php", "Fruit\nid");
        let mut maker = maker(store);

        let request = EntityGenerationRequest::new("Basket").with_property(
            PropertyRequest::relation("fruits", RelationType::OneToMany, "Fruit"),
        );
        let report = maker.generate(&request).unwrap();

        assert_eq!(take_log("Fruit::"), vec!["Fruit::many_to_one(basket)"]);
        assert_eq!(take_log("Basket::"), vec!["Basket::one_to_many(fruits)"]);
        assert_eq!(report.fields, vec!["fruits"]);
    }

    #[test]
    fn test_collision_on_other_entity() {
        let store = MemoryStore::new()
            .with_file("src/Entity/Author.php", "Author\nid")
            .with_file("src/Entity/Post.php", "Post\nid\nauthors");
        let mut maker = maker(store);

        let request = EntityGenerationRequest::new("Author").with_property(
            PropertyRequest::relation("posts", RelationType::ManyToMany, "Post"),
        );
        let err = maker.generate(&request).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidFieldName);
        assert!(maker.store().writes().is_empty());
        assert!(take_log("Author::").is_empty());
    }

    #[test]
    fn test_missing_related_entity() {
        let store = MemoryStore::new().with_file("src/Entity/Order.php", "Order\nid");
        let mut maker = maker(store);

        let request = EntityGenerationRequest::new("Order").with_property(
            PropertyRequest::relation("customer", RelationType::ManyToOne, "Customer"),
        );
        assert_eq!(
            maker.run(&request),
            GenerationOutcome::Failure(crate::ErrorKind::InvalidEntityName)
        );
    }

    #[test]
    fn test_field_names() {
        let store = MemoryStore::new().with_file("src/Entity/Tag.php", "Tag\nid\nlabel");
        let maker = maker(store);
        assert_eq!(maker.field_names("Tag").unwrap(), vec!["id", "label"]);
        assert!(maker.field_names("Missing").unwrap().is_empty());
    }
}
