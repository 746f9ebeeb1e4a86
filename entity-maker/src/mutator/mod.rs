//! Source mutation
//!
//! A [`SourceMutator`] holds the text of one class and applies field and relation
//! additions to it. The orchestrator never looks inside the text; it only asks for the
//! declared property names and the rendered result.

mod php;

pub use php::PhpClassManipulator;

use crate::error::Result;
use crate::field::ScalarFieldDescriptor;
use crate::relation::RelationSide;

/// Editable class source
pub trait SourceMutator: Sized {
    /// Parse existing class source
    ///
    /// With `overwrite` disabled, accessors that already exist are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EntityMakerError::MalformedSource`] if the source holds no
    /// editable class.
    fn load(source: &str, overwrite: bool) -> Result<Self>;

    /// Names of the properties declared on the class, in declaration order
    fn property_names(&self) -> Vec<String>;

    /// Add a column with its getter and setter
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn add_scalar_field(&mut self, field: &ScalarFieldDescriptor) -> Result<()>;

    /// Add the owning side of a many-to-one
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn add_many_to_one(&mut self, side: &RelationSide) -> Result<()>;

    /// Add the inverse (collection) side of a many-to-one
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn add_one_to_many(&mut self, side: &RelationSide) -> Result<()>;

    /// Add either side of a many-to-many
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn add_many_to_many(&mut self, side: &RelationSide) -> Result<()>;

    /// Add either side of a one-to-one
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn add_one_to_one(&mut self, side: &RelationSide) -> Result<()>;

    /// Current source text
    fn rendered_source(&self) -> String;
}
