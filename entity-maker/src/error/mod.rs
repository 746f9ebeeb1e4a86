//! Error types and generation outcomes
//!
//! Every fallible engine operation returns [`EntityMakerError`]. Callers that only
//! care about *what kind* of failure stopped a request can collapse a result into a
//! [`GenerationOutcome`].

use std::path::PathBuf;
use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum EntityMakerError {
    /// A property name is not a legal field identifier or collides with an existing field
    #[error("Invalid field name '{name}': {reason}")]
    InvalidFieldName {
        /// Offending property name
        name: String,
        /// Why the name was rejected
        reason: String,
    },

    /// Entity or related-entity name is not a valid class name
    #[error("Invalid entity name: '{0}'")]
    InvalidEntityName(String),

    /// Property kind string is not one of the supported kinds
    #[error("Unknown property kind: '{0}'. Supported kinds: string, text, integer, float, timestamp, many_to_one, one_to_many, many_to_many, one_to_one")]
    UnknownPropertyKind(String),

    /// A relation was requested with a kind the relation resolver does not know
    #[error("Invalid relation kind: '{0}'. Expected one of many_to_one, one_to_many, many_to_many, one_to_one")]
    InvalidRelationKind(String),

    /// Relation property without a related entity
    #[error("Relation property '{0}' requires a related entity")]
    MissingRelatedEntity(String),

    /// Compact property spec could not be parsed
    #[error("Invalid property definition '{spec}': {reason}")]
    InvalidPropertySpec {
        /// Raw spec as supplied
        spec: String,
        /// Parse failure
        reason: String,
    },

    /// Request document could not be decoded
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),

    /// Resolved relation topology and its inverse-mapping flag disagree
    #[error("Inverse mapping inconsistency: {0}")]
    InverseMappingInconsistency(String),

    /// Existing source does not contain a class the mutator can edit
    #[error("Malformed class source: {0}")]
    MalformedSource(String),

    /// Template rendering failed
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// File access failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, EntityMakerError>;

/// Flat failure classification of an [`EntityMakerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`EntityMakerError::InvalidFieldName`]
    InvalidFieldName,
    /// See [`EntityMakerError::InvalidEntityName`]
    InvalidEntityName,
    /// Unknown kind, missing related entity, or undecodable request
    InvalidPropertyRequest,
    /// See [`EntityMakerError::InvalidRelationKind`]
    InvalidRelationKind,
    /// See [`EntityMakerError::InverseMappingInconsistency`]
    InverseMappingInconsistency,
    /// Source could not be parsed or rendered
    Source,
    /// File system failure
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidFieldName => "invalid_field_name",
            Self::InvalidEntityName => "invalid_entity_name",
            Self::InvalidPropertyRequest => "invalid_property_request",
            Self::InvalidRelationKind => "invalid_relation_kind",
            Self::InverseMappingInconsistency => "inverse_mapping_inconsistency",
            Self::Source => "source",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

impl EntityMakerError {
    /// Build an [`EntityMakerError::InvalidFieldName`]
    pub fn invalid_field(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFieldName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFieldName { .. } => ErrorKind::InvalidFieldName,
            Self::InvalidEntityName(_) => ErrorKind::InvalidEntityName,
            Self::UnknownPropertyKind(_)
            | Self::MissingRelatedEntity(_)
            | Self::InvalidPropertySpec { .. }
            | Self::InvalidRequest(_) => ErrorKind::InvalidPropertyRequest,
            Self::InvalidRelationKind(_) => ErrorKind::InvalidRelationKind,
            Self::InverseMappingInconsistency(_) => ErrorKind::InverseMappingInconsistency,
            Self::MalformedSource(_) | Self::Template(_) => ErrorKind::Source,
            Self::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Terminal result of one generation request
///
/// Files flushed before a failure stay on disk; the outcome carries no record of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Every requested property was applied
    Success,
    /// Processing stopped at the first failure of this kind
    Failure(ErrorKind),
}

impl GenerationOutcome {
    /// Whether the request completed
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl<T> From<&Result<T>> for GenerationOutcome {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(err) => Self::Failure(err.kind()),
        }
    }
}
