//! Generation requests
//!
//! An [`EntityGenerationRequest`] names the entity to create or extend and lists the
//! properties to add, in order. Requests are built programmatically, parsed from
//! compact CLI specs, or decoded from JSON/TOML documents.
//!
//! # Compact property specs
//!
//! ```text
//! title:string:length=120:required:unique   → string column, 120 chars
//! price:float                               → float column
//! category:many_to_one:Category:required    → owning many-to-one to Category
//! variants:one_to_many:ProductVariant       → inverse collection, owner is ProductVariant
//! tags:many_to_many:Tag:no_inverse          → unidirectional many-to-many
//! profile:one_to_one:Profile:inverse        → one-to-one with the inverse side mapped
//! ```

use crate::error::{EntityMakerError, Result};
use inflector::Inflector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// Scalar column kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Bounded string (`VARCHAR`)
    String,
    /// Unbounded text
    Text,
    /// Integer
    Integer,
    /// Floating point
    Float,
    /// Immutable date-time
    Timestamp,
}

/// Relation kinds as a caller requests them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// Many of this entity point at one related entity
    ManyToOne,
    /// This entity holds a collection of related entities which own the association
    OneToMany,
    /// Join-table association
    ManyToMany,
    /// Single reference on both sides
    OneToOne,
}

/// Requested property kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Plain column
    Scalar(ScalarKind),
    /// Association to another entity
    Relation(RelationType),
}

impl FromStr for ScalarKind {
    type Err = EntityMakerError;

    fn from_str(input: &str) -> Result<Self> {
        match input.trim().to_snake_case().as_str() {
            "string" => Ok(Self::String),
            "text" => Ok(Self::Text),
            "integer" | "int" => Ok(Self::Integer),
            "float" | "double" => Ok(Self::Float),
            "timestamp" | "datetime" | "datetime_immutable" => Ok(Self::Timestamp),
            _ => Err(EntityMakerError::UnknownPropertyKind(input.to_string())),
        }
    }
}

impl FromStr for RelationType {
    type Err = EntityMakerError;

    fn from_str(input: &str) -> Result<Self> {
        match input.trim().to_snake_case().as_str() {
            "many_to_one" | "references" | "belongs_to" => Ok(Self::ManyToOne),
            "one_to_many" | "has_many" => Ok(Self::OneToMany),
            "many_to_many" => Ok(Self::ManyToMany),
            "one_to_one" | "has_one" => Ok(Self::OneToOne),
            _ => Err(EntityMakerError::InvalidRelationKind(input.to_string())),
        }
    }
}

impl FromStr for PropertyKind {
    type Err = EntityMakerError;

    fn from_str(input: &str) -> Result<Self> {
        ScalarKind::from_str(input)
            .map(Self::Scalar)
            .or_else(|_| RelationType::from_str(input).map(Self::Relation))
            .map_err(|_| EntityMakerError::UnknownPropertyKind(input.to_string()))
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Text => write!(f, "text"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Timestamp => write!(f, "timestamp"),
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManyToOne => write!(f, "many_to_one"),
            Self::OneToMany => write!(f, "one_to_many"),
            Self::ManyToMany => write!(f, "many_to_many"),
            Self::OneToOne => write!(f, "one_to_one"),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => kind.fmt(f),
            Self::Relation(kind) => kind.fmt(f),
        }
    }
}

/// One property to add to an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPropertyRequest", into = "RawPropertyRequest")]
pub struct PropertyRequest {
    /// Property name on the requesting entity
    pub name: String,
    /// Scalar or relation kind
    pub kind: PropertyKind,
    /// Maximum length, only meaningful for [`ScalarKind::String`]
    pub max_length: Option<u32>,
    /// Required flag, mapped to nullability by the configured policy
    pub required: bool,
    /// Unique constraint (scalars only)
    pub unique: bool,
    /// Related entity, mandatory for relation kinds
    pub related_entity: Option<String>,
    /// Orphan removal, honoured only on non-nullable relations
    pub orphan_removal: bool,
    /// Explicitly map (or skip) the inverse side; `None` takes the recommendation
    pub map_inverse: Option<bool>,
    /// Override for the name derived for the other side of a relation
    pub inverse_property: Option<String>,
}

impl PropertyRequest {
    /// Scalar property
    #[must_use]
    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Scalar(kind),
            max_length: None,
            required: false,
            unique: false,
            related_entity: None,
            orphan_removal: false,
            map_inverse: None,
            inverse_property: None,
        }
    }

    /// Relation property targeting `related_entity`
    #[must_use]
    pub fn relation(
        name: impl Into<String>,
        kind: RelationType,
        related_entity: impl Into<String>,
    ) -> Self {
        Self {
            kind: PropertyKind::Relation(kind),
            related_entity: Some(related_entity.into()),
            ..Self::scalar(name, ScalarKind::String)
        }
    }

    /// Set the maximum length
    #[must_use]
    pub const fn with_max_length(mut self, length: u32) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Mark as required
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark as unique
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Request orphan removal
    #[must_use]
    pub const fn with_orphan_removal(mut self) -> Self {
        self.orphan_removal = true;
        self
    }

    /// Explicitly map or skip the inverse side
    #[must_use]
    pub const fn with_map_inverse(mut self, map: bool) -> Self {
        self.map_inverse = Some(map);
        self
    }

    /// Override the derived name for the other side
    #[must_use]
    pub fn with_inverse_property(mut self, name: impl Into<String>) -> Self {
        self.inverse_property = Some(name.into());
        self
    }

    /// Check the relation-kind ⇒ related-entity invariant and the length bound
    ///
    /// # Errors
    ///
    /// Returns [`EntityMakerError::MissingRelatedEntity`] for a relation without a
    /// (non-blank) related entity, and [`EntityMakerError::InvalidPropertySpec`] for a
    /// zero maximum length.
    pub fn validate(&self) -> Result<()> {
        if self.max_length == Some(0) {
            return Err(EntityMakerError::InvalidPropertySpec {
                spec: self.name.clone(),
                reason: "length must be a positive integer".to_string(),
            });
        }
        if matches!(self.kind, PropertyKind::Relation(_))
            && self
                .related_entity
                .as_deref()
                .is_none_or(|entity| entity.trim().is_empty())
        {
            return Err(EntityMakerError::MissingRelatedEntity(self.name.clone()));
        }
        Ok(())
    }

    /// Parse a compact spec: `name:kind[:Target][:modifier]*`
    ///
    /// # Errors
    ///
    /// Returns an error if the spec lacks a name or kind, names an unknown kind or
    /// modifier, or declares a relation without a target.
    ///
    /// ```
    /// # use entity_maker::request::{PropertyKind, PropertyRequest, RelationType};
    /// let prop = PropertyRequest::parse("category:many_to_one:Category:required").unwrap();
    /// assert_eq!(prop.kind, PropertyKind::Relation(RelationType::ManyToOne));
    /// assert_eq!(prop.related_entity.as_deref(), Some("Category"));
    /// assert!(prop.required);
    /// ```
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| EntityMakerError::InvalidPropertySpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = spec.split(':').map(str::trim).collect();
        if parts.len() < 2 || parts[1].is_empty() {
            return Err(invalid("expected format name:kind[:Target][:modifiers]"));
        }
        let name = parts[0];
        if name.is_empty() {
            return Err(invalid("property name cannot be empty"));
        }

        let mut rest = &parts[2..];
        let kind = match PropertyKind::from_str(parts[1]) {
            Ok(kind) => kind,
            // An unknown kind followed by a target was meant as a relation
            Err(_) if rest.first().is_some_and(|next| !is_modifier(next)) => {
                return Err(EntityMakerError::InvalidRelationKind(parts[1].to_string()));
            }
            Err(err) => return Err(err),
        };

        let mut request = match kind {
            PropertyKind::Scalar(scalar) => Self::scalar(name, scalar),
            PropertyKind::Relation(relation) => {
                let Some((target, tail)) = rest.split_first().filter(|(t, _)| !is_modifier(t))
                else {
                    return Err(EntityMakerError::MissingRelatedEntity(name.to_string()));
                };
                rest = tail;
                Self::relation(name, relation, *target)
            }
        };

        for modifier in rest {
            let (key, value) = modifier
                .split_once('=')
                .map_or((*modifier, None), |(k, v)| (k, Some(v.trim())));
            match (key.trim().to_snake_case().as_str(), value) {
                ("required", None) => request.required = true,
                ("unique", None) => request.unique = true,
                ("orphan_removal" | "orphan", None) => request.orphan_removal = true,
                ("inverse", None) => request.map_inverse = Some(true),
                ("no_inverse", None) => request.map_inverse = Some(false),
                ("length", Some(value)) => {
                    let length: NonZeroU32 = value
                        .parse()
                        .map_err(|_| invalid("length must be a positive integer"))?;
                    request.max_length = Some(length.get());
                }
                ("inverse_name", Some(value)) if !value.is_empty() => {
                    request.inverse_property = Some(value.to_string());
                }
                _ => {
                    return Err(invalid(&format!(
                        "unknown modifier '{modifier}'. Valid modifiers: required, unique, orphan_removal, inverse, no_inverse, length=N, inverse_name=NAME"
                    )));
                }
            }
        }

        Ok(request)
    }
}

/// Modifiers start lower-case; `Inverse` or `Unique` in target position are class names
fn is_modifier(part: &str) -> bool {
    let key = part.split_once('=').map_or(part, |(key, _)| key).trim();
    key.starts_with(|c: char| c.is_ascii_lowercase())
        && matches!(
            key.to_snake_case().as_str(),
            "required" | "unique" | "orphan_removal" | "orphan" | "inverse" | "no_inverse" | "length" | "inverse_name"
        )
}

/// Wire shape of a [`PropertyRequest`]; the kind is kept as a string until validated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPropertyRequest {
    name: String,
    #[serde(default = "default_kind")]
    kind: String,
    #[serde(default, alias = "length")]
    max_length: Option<u32>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    related_entity: Option<String>,
    #[serde(default)]
    orphan_removal: bool,
    #[serde(default)]
    map_inverse: Option<bool>,
    #[serde(default)]
    inverse_property: Option<String>,
}

fn default_kind() -> String {
    "string".to_string()
}

impl TryFrom<RawPropertyRequest> for PropertyRequest {
    type Error = EntityMakerError;

    fn try_from(raw: RawPropertyRequest) -> Result<Self> {
        let kind = match PropertyKind::from_str(&raw.kind) {
            Ok(kind) => kind,
            Err(_) if raw.related_entity.is_some() => {
                return Err(EntityMakerError::InvalidRelationKind(raw.kind));
            }
            Err(err) => return Err(err),
        };

        let request = Self {
            name: raw.name,
            kind,
            max_length: raw.max_length,
            required: raw.required,
            unique: raw.unique,
            related_entity: raw.related_entity,
            orphan_removal: raw.orphan_removal,
            map_inverse: raw.map_inverse,
            inverse_property: raw.inverse_property,
        };
        request.validate()?;
        Ok(request)
    }
}

impl From<PropertyRequest> for RawPropertyRequest {
    fn from(request: PropertyRequest) -> Self {
        Self {
            name: request.name,
            kind: request.kind.to_string(),
            max_length: request.max_length,
            required: request.required,
            unique: request.unique,
            related_entity: request.related_entity,
            orphan_removal: request.orphan_removal,
            map_inverse: request.map_inverse,
            inverse_property: request.inverse_property,
        }
    }
}

/// One end-to-end generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RequestDocument")]
pub struct EntityGenerationRequest {
    /// Entity class name, short (`Product`) or namespaced below the entity namespace
    pub entity_name: String,
    /// Add the API Platform `#[ApiResource]` attribute to a newly created entity
    pub api_resource: bool,
    /// Rewrite existing accessors of the target entity
    pub regenerate: bool,
    /// Properties to add, applied in order
    pub properties: Vec<PropertyRequest>,
    /// Replace hand-edited accessors that collide with generated ones
    pub overwrite: bool,
}

/// Wire shape of an [`EntityGenerationRequest`]; `overwrite` stays unset until a default applies
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestDocument {
    entity_name: String,
    #[serde(default, alias = "apiResources")]
    api_resource: bool,
    #[serde(default)]
    regenerate: bool,
    #[serde(default)]
    properties: Vec<PropertyRequest>,
    #[serde(default)]
    overwrite: Option<bool>,
}

impl RequestDocument {
    fn into_request(self, default_overwrite: bool) -> EntityGenerationRequest {
        EntityGenerationRequest {
            entity_name: self.entity_name,
            api_resource: self.api_resource,
            regenerate: self.regenerate,
            properties: self.properties,
            overwrite: self.overwrite.unwrap_or(default_overwrite),
        }
    }
}

impl From<RequestDocument> for EntityGenerationRequest {
    fn from(document: RequestDocument) -> Self {
        document.into_request(true)
    }
}

impl EntityGenerationRequest {
    /// Request for `entity_name` with no properties
    #[must_use]
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            api_resource: false,
            regenerate: false,
            properties: Vec::new(),
            overwrite: true,
        }
    }

    /// Expose the new entity as an API resource
    #[must_use]
    pub const fn with_api_resource(mut self) -> Self {
        self.api_resource = true;
        self
    }

    /// Rewrite existing accessors on the target entity
    #[must_use]
    pub const fn with_regenerate(mut self) -> Self {
        self.regenerate = true;
        self
    }

    /// Set the overwrite flag
    #[must_use]
    pub const fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Append a property
    #[must_use]
    pub fn with_property(mut self, property: PropertyRequest) -> Self {
        self.properties.push(property);
        self
    }

    /// Decode a JSON request document
    ///
    /// # Errors
    ///
    /// Returns [`EntityMakerError::InvalidRequest`] on malformed JSON, or the
    /// property validation error for an invalid property.
    pub fn from_json(input: &str) -> Result<Self> {
        Self::from_json_with_overwrite(input, true)
    }

    /// Decode a JSON request document, using `default_overwrite` when it sets no `overwrite`
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_json`].
    pub fn from_json_with_overwrite(input: &str, default_overwrite: bool) -> Result<Self> {
        serde_json::from_str::<RequestDocument>(input)
            .map(|document| document.into_request(default_overwrite))
            .map_err(|err| EntityMakerError::InvalidRequest(err.to_string()))
    }

    /// Decode a TOML request document
    ///
    /// # Errors
    ///
    /// Returns [`EntityMakerError::InvalidRequest`] on malformed TOML or invalid properties.
    pub fn from_toml(input: &str) -> Result<Self> {
        Self::from_toml_with_overwrite(input, true)
    }

    /// Decode a TOML request document, using `default_overwrite` when it sets no `overwrite`
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_toml`].
    pub fn from_toml_with_overwrite(input: &str, default_overwrite: bool) -> Result<Self> {
        toml::from_str::<RequestDocument>(input)
            .map(|document| document.into_request(default_overwrite))
            .map_err(|err| EntityMakerError::InvalidRequest(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_scalar() {
        let prop = PropertyRequest::parse("title:string:length=120:required:unique").unwrap();
        assert_eq!(prop.name, "title");
        assert_eq!(prop.kind, PropertyKind::Scalar(ScalarKind::String));
        assert_eq!(prop.max_length, Some(120));
        assert!(prop.required);
        assert!(prop.unique);
        assert!(prop.related_entity.is_none());
    }

    #[test]
    fn test_parse_kind_aliases() {
        let cases = [
            ("age:int", PropertyKind::Scalar(ScalarKind::Integer)),
            ("at:datetime", PropertyKind::Scalar(ScalarKind::Timestamp)),
            ("at:datetime_immutable", PropertyKind::Scalar(ScalarKind::Timestamp)),
            ("author:references:User", PropertyKind::Relation(RelationType::ManyToOne)),
            ("author:ManyToOne:User", PropertyKind::Relation(RelationType::ManyToOne)),
            ("tags:ManyToMany:Tag", PropertyKind::Relation(RelationType::ManyToMany)),
            ("items:OneToMany:Item", PropertyKind::Relation(RelationType::OneToMany)),
        ];
        for (spec, expected) in cases {
            assert_eq!(PropertyRequest::parse(spec).unwrap().kind, expected, "{spec}");
        }
    }

    #[test]
    fn test_parse_relation_modifiers() {
        let prop =
            PropertyRequest::parse("profile:one_to_one:Profile:inverse:orphan_removal").unwrap();
        assert_eq!(prop.map_inverse, Some(true));
        assert!(prop.orphan_removal);

        let prop =
            PropertyRequest::parse("author:many_to_one:User:inverse_name=writtenPosts").unwrap();
        assert_eq!(prop.inverse_property.as_deref(), Some("writtenPosts"));
    }

    #[test]
    fn test_parse_relation_without_target() {
        let err = PropertyRequest::parse("author:many_to_one").unwrap_err();
        assert!(matches!(err, EntityMakerError::MissingRelatedEntity(_)));

        let err = PropertyRequest::parse("author:many_to_one:required").unwrap_err();
        assert!(matches!(err, EntityMakerError::MissingRelatedEntity(_)));
    }

    #[test]
    fn test_parse_capitalized_target_named_like_modifier() {
        let prop = PropertyRequest::parse("owner:many_to_one:Inverse").unwrap();
        assert_eq!(prop.related_entity.as_deref(), Some("Inverse"));
        assert_eq!(prop.map_inverse, None);

        let prop = PropertyRequest::parse("badge:one_to_one:Unique:inverse").unwrap();
        assert_eq!(prop.related_entity.as_deref(), Some("Unique"));
        assert_eq!(prop.map_inverse, Some(true));
        assert!(!prop.unique);
    }

    #[test]
    fn test_zero_length_rejected() {
        let err = PropertyRequest::parse("title:string:length=0").unwrap_err();
        assert!(matches!(err, EntityMakerError::InvalidPropertySpec { .. }));

        let prop = PropertyRequest::scalar("title", ScalarKind::String).with_max_length(0);
        assert_eq!(prop.validate().unwrap_err().kind(), ErrorKind::InvalidPropertyRequest);

        let err = EntityGenerationRequest::from_json(
            r#"{"entityName": "Product", "properties": [{"name": "title", "kind": "string", "maxLength": 0}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EntityMakerError::InvalidRequest(_)));
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = PropertyRequest::parse("title:varchar").unwrap_err();
        assert!(matches!(err, EntityMakerError::UnknownPropertyKind(_)));

        let err = PropertyRequest::parse("owner:many_to_few:User").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRelationKind);
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(PropertyRequest::parse("title").is_err());
        assert!(PropertyRequest::parse(":string").is_err());
        assert!(PropertyRequest::parse("title:").is_err());
        assert!(PropertyRequest::parse("title:string:shiny").is_err());
        assert!(PropertyRequest::parse("title:string:length=abc").is_err());
    }

    #[test]
    fn test_validate_missing_related_entity() {
        let mut prop = PropertyRequest::relation("author", RelationType::ManyToOne, "User");
        assert!(prop.validate().is_ok());
        prop.related_entity = Some("  ".to_string());
        assert!(prop.validate().is_err());
        prop.related_entity = None;
        assert!(prop.validate().is_err());
    }

    #[test]
    fn test_request_from_json() {
        let request = EntityGenerationRequest::from_json(
            r#"{
                "entityName": "Product",
                "apiResource": true,
                "properties": [
                    {"name": "title", "kind": "string", "maxLength": 120, "required": true, "unique": true},
                    {"name": "price", "kind": "float"},
                    {"name": "category", "kind": "ManyToOne", "relatedEntity": "Category"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(request.entity_name, "Product");
        assert!(request.api_resource);
        assert!(request.overwrite);
        assert!(!request.regenerate);
        assert_eq!(request.properties.len(), 3);
        assert_eq!(request.properties[0].max_length, Some(120));
        assert_eq!(
            request.properties[2].kind,
            PropertyKind::Relation(RelationType::ManyToOne)
        );
    }

    #[test]
    fn test_request_from_json_rejects_relation_without_target() {
        let err = EntityGenerationRequest::from_json(
            r#"{"entityName": "Product", "properties": [{"name": "category", "kind": "many_to_one"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EntityMakerError::InvalidRequest(_)));
    }

    #[test]
    fn test_request_from_toml() {
        let request = EntityGenerationRequest::from_toml(
            r#"
            entityName = "Category"
            overwrite = false

            [[properties]]
            name = "name"
            kind = "string"
            required = true

            [[properties]]
            name = "parent"
            kind = "one_to_one"
            relatedEntity = "Category"
            orphanRemoval = true
            "#,
        )
        .unwrap();

        assert!(!request.overwrite);
        assert_eq!(request.properties.len(), 2);
        assert!(request.properties[1].orphan_removal);
    }

    #[test]
    fn test_document_overwrite_default() {
        let document = r#"{"entityName": "Product"}"#;
        assert!(EntityGenerationRequest::from_json(document).unwrap().overwrite);
        assert!(!EntityGenerationRequest::from_json_with_overwrite(document, false).unwrap().overwrite);

        let explicit = "entityName = \"Product\"\noverwrite = true\n";
        assert!(EntityGenerationRequest::from_toml_with_overwrite(explicit, false).unwrap().overwrite);
        assert!(!EntityGenerationRequest::from_toml_with_overwrite("entityName = \"Product\"\n", false)
            .unwrap()
            .overwrite);
    }

    #[test]
    fn test_builder() {
        let request = EntityGenerationRequest::new("Product")
            .with_api_resource()
            .with_overwrite(false)
            .with_property(PropertyRequest::scalar("price", ScalarKind::Float));
        assert!(request.api_resource);
        assert!(!request.overwrite);
        assert_eq!(request.properties[0].name, "price");
    }
}
