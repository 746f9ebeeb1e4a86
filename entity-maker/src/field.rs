//! Field descriptor resolution
//!
//! Splits a [`PropertyRequest`] into either a fully resolved scalar column or a
//! relation request that still has to go through the relation resolver.

use crate::config::{GenerationSettings, NullabilityPolicy};
use crate::error::Result;
use crate::request::{PropertyKind, PropertyRequest, RelationType, ScalarKind};

/// Resolved scalar column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarFieldDescriptor {
    /// Property name
    pub name: String,
    /// Storage kind
    pub kind: ScalarKind,
    /// Column length, only ever set for strings
    pub length: Option<u32>,
    /// Nullable column
    pub nullable: bool,
    /// Unique constraint
    pub unique: bool,
}

/// Relation half of a classification, borrowed from the originating request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationRequest<'a> {
    /// Property name on the requesting entity
    pub property: &'a str,
    /// Requested relation kind
    pub relation: RelationType,
    /// Related entity as requested (short or fully qualified)
    pub target: &'a str,
    /// Required flag
    pub required: bool,
    /// Orphan removal as requested
    pub orphan_removal: bool,
    /// Explicit inverse mapping choice
    pub map_inverse: Option<bool>,
    /// Explicit name for the other side
    pub inverse_property: Option<&'a str>,
}

/// Outcome of classifying a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldClassification<'a> {
    /// Plain column, ready for the source mutator
    Scalar(ScalarFieldDescriptor),
    /// Association, to be resolved by [`crate::relation::RelationResolver`]
    Relation(RelationRequest<'a>),
}

/// Classifies property requests
#[derive(Debug, Clone, Copy)]
pub struct FieldResolver {
    nullability: NullabilityPolicy,
    default_string_length: Option<u32>,
}

impl FieldResolver {
    /// Resolver with an explicit policy and default string length
    #[must_use]
    pub const fn new(nullability: NullabilityPolicy, default_string_length: Option<u32>) -> Self {
        Self {
            nullability,
            default_string_length,
        }
    }

    /// Resolver configured from generation settings
    #[must_use]
    pub const fn from_settings(settings: &GenerationSettings) -> Self {
        Self::new(settings.nullability, settings.default_string_length)
    }

    /// Classify one property request
    ///
    /// # Errors
    ///
    /// Returns [`crate::EntityMakerError::MissingRelatedEntity`] for a relation
    /// without a related entity.
    pub fn classify<'a>(&self, request: &'a PropertyRequest) -> Result<FieldClassification<'a>> {
        request.validate()?;

        match request.kind {
            PropertyKind::Scalar(kind) => {
                let length = match kind {
                    ScalarKind::String => request.max_length.or(self.default_string_length),
                    _ => None,
                };

                Ok(FieldClassification::Scalar(ScalarFieldDescriptor {
                    name: request.name.clone(),
                    kind,
                    length,
                    nullable: self.nullability.nullable(request.required),
                    unique: request.unique,
                }))
            }
            PropertyKind::Relation(relation) => Ok(FieldClassification::Relation(RelationRequest {
                property: &request.name,
                relation,
                target: request.related_entity.as_deref().unwrap_or_default(),
                required: request.required,
                orphan_removal: request.orphan_removal,
                map_inverse: request.map_inverse,
                inverse_property: request.inverse_property.as_deref(),
            })),
        }
    }
}

impl Default for FieldResolver {
    fn default() -> Self {
        Self::from_settings(&GenerationSettings::default())
    }
}
