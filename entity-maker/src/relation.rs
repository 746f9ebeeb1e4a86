//! Relation resolution
//!
//! Doctrine declares an association on its *owning* side (the one holding the foreign
//! key or join table) and optionally mirrors it on the *inverse* side. The resolver
//! decides that topology for a requested relation:
//!
//! | Requested      | Owning side       | Inverse side      | Canonical kind |
//! |----------------|-------------------|-------------------|----------------|
//! | many-to-one    | requesting entity | related entity    | many-to-one    |
//! | one-to-many    | related entity    | requesting entity | many-to-one    |
//! | many-to-many   | requesting entity | related entity    | many-to-many   |
//! | one-to-one     | requesting entity | related entity    | one-to-one     |
//!
//! The inverse side is never mapped onto an externally owned class, and is not mapped
//! for one-to-one unless explicitly asked for.

use crate::config::NullabilityPolicy;
use crate::error::Result;
use crate::field::RelationRequest;
use crate::naming::{validate_class_name, validate_field_name, Naming};
use crate::registry::EntityRegistry;
use crate::request::RelationType;
use std::fmt;

/// Canonical association kinds; one-to-many is an inverted many-to-one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Owning many-to-one, inverse one-to-many
    ManyToOne,
    /// Many-to-many on both sides
    ManyToMany,
    /// One-to-one on both sides
    OneToOne,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManyToOne => write!(f, "ManyToOne"),
            Self::ManyToMany => write!(f, "ManyToMany"),
            Self::OneToOne => write!(f, "OneToOne"),
        }
    }
}

/// Fully resolved relation
///
/// Only [`RelationResolver::resolve`] builds these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    kind: RelationKind,
    owning_class: String,
    inverse_class: String,
    owning_property: String,
    inverse_property: Option<String>,
    nullable: bool,
    orphan_removal: bool,
    map_inverse: bool,
}

impl RelationDescriptor {
    fn new(kind: RelationKind, owning_class: String, inverse_class: String) -> Self {
        Self {
            kind,
            owning_class,
            inverse_class,
            owning_property: String::new(),
            inverse_property: None,
            nullable: false,
            orphan_removal: false,
            map_inverse: true,
        }
    }

    /// Canonical kind
    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Class holding the foreign key / join table
    #[must_use]
    pub fn owning_class(&self) -> &str {
        &self.owning_class
    }

    /// Class on the other side
    #[must_use]
    pub fn inverse_class(&self) -> &str {
        &self.inverse_class
    }

    /// Property on the owning class
    #[must_use]
    pub fn owning_property(&self) -> &str {
        &self.owning_property
    }

    /// Property on the inverse class, absent when the inverse side is not mapped
    #[must_use]
    pub fn inverse_property(&self) -> Option<&str> {
        self.inverse_property.as_deref()
    }

    /// Whether the association may be null
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Orphan removal policy
    #[must_use]
    pub const fn orphan_removal(&self) -> bool {
        self.orphan_removal
    }

    /// Whether the inverse side gets a property
    #[must_use]
    pub const fn map_inverse(&self) -> bool {
        self.map_inverse
    }

    /// Owning and inverse class are the same
    #[must_use]
    pub fn is_self_referencing(&self) -> bool {
        self.owning_class == self.inverse_class
    }

    /// The owning side as seen by the owning class
    #[must_use]
    pub fn owning_side(&self) -> RelationSide {
        RelationSide {
            kind: self.kind,
            property: self.owning_property.clone(),
            target_class: self.inverse_class.clone(),
            target_property: self.inverse_property.clone().filter(|_| self.map_inverse),
            owning: true,
            nullable: self.nullable,
            orphan_removal: self.orphan_removal,
        }
    }

    /// The inverse side as seen by the inverse class, if mapped
    #[must_use]
    pub fn inverse_side(&self) -> Option<RelationSide> {
        let property = self.inverse_property.clone().filter(|_| self.map_inverse)?;
        Some(RelationSide {
            kind: self.kind,
            property,
            target_class: self.owning_class.clone(),
            target_property: Some(self.owning_property.clone()),
            owning: false,
            nullable: self.nullable,
            orphan_removal: self.orphan_removal,
        })
    }
}

/// One end of a relation, as handed to a source mutator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSide {
    /// Canonical kind of the whole relation
    pub kind: RelationKind,
    /// Property declared on this side
    pub property: String,
    /// Class on the other end
    pub target_class: String,
    /// Property on the other end, if that end is mapped
    pub target_property: Option<String>,
    /// This side holds the association
    pub owning: bool,
    /// Association may be null
    pub nullable: bool,
    /// Orphan removal policy
    pub orphan_removal: bool,
}

/// Resolves requested relations into descriptors
pub struct RelationResolver<'r, R: ?Sized> {
    registry: &'r R,
    nullability: NullabilityPolicy,
}

impl<'r, R: EntityRegistry + ?Sized> RelationResolver<'r, R> {
    /// Resolver backed by `registry`
    pub const fn new(registry: &'r R, nullability: NullabilityPolicy) -> Self {
        Self {
            registry,
            nullability,
        }
    }

    /// Resolve a relation requested on `owner_class`
    ///
    /// # Errors
    ///
    /// Returns [`crate::EntityMakerError::InvalidEntityName`] for an invalid related
    /// entity and [`crate::EntityMakerError::InvalidFieldName`] when a derived property
    /// name is not a legal field name.
    pub fn resolve(&self, owner_class: &str, request: &RelationRequest<'_>) -> Result<RelationDescriptor> {
        validate_class_name(request.target)?;
        let target_class = self.registry.qualify(request.target);
        let nullable = self.nullability.nullable(request.required);

        let descriptor = match request.relation {
            RelationType::ManyToOne => {
                let mut relation = RelationDescriptor::new(
                    RelationKind::ManyToOne,
                    owner_class.to_string(),
                    target_class,
                );
                relation.owning_property = request.property.to_string();
                relation.nullable = nullable;
                self.decide_inverse(&mut relation, request.map_inverse);

                if relation.map_inverse {
                    relation.inverse_property = Some(derived_name(
                        request.inverse_property,
                        || Naming::plural_camel_case(Naming::short_class_name(owner_class)),
                    )?);

                    // orphan removal only applies if the inverse relation is set
                    if !relation.nullable {
                        relation.orphan_removal = request.orphan_removal;
                    }
                }
                relation
            }
            RelationType::OneToMany => {
                // the related entity owns a many-to-one back to the requesting entity
                let mut relation = RelationDescriptor::new(
                    RelationKind::ManyToOne,
                    target_class,
                    owner_class.to_string(),
                );
                relation.inverse_property = Some(request.property.to_string());
                relation.owning_property = derived_name(request.inverse_property, || {
                    Naming::to_lower_camel_case(Naming::short_class_name(owner_class))
                })?;
                relation.nullable = nullable;
                relation.map_inverse = !self.registry.is_externally_owned(&relation.inverse_class);

                if !relation.nullable {
                    relation.orphan_removal = request.orphan_removal;
                }
                relation
            }
            RelationType::ManyToMany => {
                let mut relation = RelationDescriptor::new(
                    RelationKind::ManyToMany,
                    owner_class.to_string(),
                    target_class,
                );
                relation.owning_property = request.property.to_string();
                self.decide_inverse(&mut relation, request.map_inverse);

                if relation.map_inverse {
                    relation.inverse_property = Some(derived_name(
                        request.inverse_property,
                        || Naming::plural_camel_case(Naming::short_class_name(owner_class)),
                    )?);
                }
                relation
            }
            RelationType::OneToOne => {
                let mut relation = RelationDescriptor::new(
                    RelationKind::OneToOne,
                    owner_class.to_string(),
                    target_class,
                );
                relation.owning_property = request.property.to_string();
                relation.nullable = nullable;
                self.decide_inverse(&mut relation, request.map_inverse);

                if relation.map_inverse {
                    relation.inverse_property = Some(derived_name(request.inverse_property, || {
                        Naming::to_lower_camel_case(Naming::short_class_name(owner_class))
                    })?);
                }
                if !relation.nullable {
                    relation.orphan_removal = request.orphan_removal;
                }
                relation
            }
        };

        if descriptor.is_self_referencing()
            && descriptor.inverse_property() == Some(descriptor.owning_property())
        {
            return Err(crate::EntityMakerError::invalid_field(
                descriptor.owning_property(),
                "both sides of a self-referencing relation would share this name",
            ));
        }

        tracing::debug!(
            kind = %descriptor.kind,
            owning = %descriptor.owning_class,
            owning_property = %descriptor.owning_property,
            inverse = %descriptor.inverse_class,
            inverse_property = ?descriptor.inverse_property,
            nullable = descriptor.nullable,
            orphan_removal = descriptor.orphan_removal,
            "resolved relation"
        );

        Ok(descriptor)
    }

    fn decide_inverse(&self, relation: &mut RelationDescriptor, requested: Option<bool>) {
        if self.registry.is_externally_owned(&relation.inverse_class) {
            tracing::warn!(
                class = %relation.inverse_class,
                "inverse side not mapped: class is not user-editable"
            );
            relation.map_inverse = false;
            return;
        }

        // one-to-one inverse sides are opt-in
        let recommended = relation.kind != RelationKind::OneToOne;
        relation.map_inverse = requested.unwrap_or(recommended);
    }
}

fn derived_name(explicit: Option<&str>, derive: impl FnOnce() -> String) -> Result<String> {
    let name = explicit.map_or_else(derive, str::to_string);
    validate_field_name(&name)?;
    Ok(name)
}
