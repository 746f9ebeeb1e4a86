//! Naming helpers and identifier validation
//!
//! Class identifiers are PHP fully-qualified names (`App\Entity\Product`); property
//! names are lower camel case (`productVariants`). Pluralization goes through the
//! inflector, applied to the last word of a camel-cased name only.

use crate::error::{EntityMakerError, Result};
use inflector::Inflector;
use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_\x{7f}-\x{ff}][A-Za-z0-9_\x{7f}-\x{ff}]*$").expect("static regex")
});

/// SQL keywords Doctrine refuses as unquoted column names
const RESERVED_FIELD_NAMES: &[&str] = &[
    "add", "all", "alter", "and", "as", "asc", "between", "by", "case", "check", "column",
    "constraint", "create", "default", "delete", "desc", "distinct", "drop", "else", "exists",
    "foreign", "from", "grant", "group", "having", "in", "index", "insert", "into", "is",
    "join", "like", "limit", "not", "null", "on", "or", "order", "primary", "references",
    "select", "set", "table", "then", "to", "union", "unique", "update", "values", "when",
    "where",
];

/// PHP words that cannot name a class
const RESERVED_CLASS_NAMES: &[&str] = &[
    "abstract", "array", "bool", "callable", "class", "clone", "const", "echo", "empty",
    "enum", "extends", "false", "final", "float", "function", "global", "int", "interface",
    "iterable", "list", "match", "mixed", "namespace", "never", "new", "null", "object",
    "parent", "private", "protected", "public", "readonly", "self", "static", "string",
    "trait", "true", "use", "void",
];

/// Naming conventions shared by the resolvers and the class manipulator
pub struct Naming;

impl Naming {
    /// Last segment of a fully-qualified class name
    ///
    /// ```
    /// # use entity_maker::naming::Naming;
    /// assert_eq!(Naming::short_class_name("App\\Entity\\Product"), "Product");
    /// assert_eq!(Naming::short_class_name("Product"), "Product");
    /// ```
    #[must_use]
    pub fn short_class_name(class: &str) -> &str {
        class.rsplit('\\').next().unwrap_or(class)
    }

    /// Namespace part of a fully-qualified class name (empty for the global namespace)
    #[must_use]
    pub fn namespace_of(class: &str) -> &str {
        class.rsplit_once('\\').map_or("", |(namespace, _)| namespace)
    }

    /// Convert to lower camel case
    ///
    /// ```
    /// # use entity_maker::naming::Naming;
    /// assert_eq!(Naming::to_lower_camel_case("ProductVariant"), "productVariant");
    /// assert_eq!(Naming::to_lower_camel_case("published_at"), "publishedAt");
    /// ```
    #[must_use]
    pub fn to_lower_camel_case(input: &str) -> String {
        input.to_camel_case()
    }

    /// Pluralize the last word of a camel-cased name, lower-casing the first letter
    ///
    /// ```
    /// # use entity_maker::naming::Naming;
    /// assert_eq!(Naming::plural_camel_case("Product"), "products");
    /// assert_eq!(Naming::plural_camel_case("Category"), "categories");
    /// assert_eq!(Naming::plural_camel_case("ProductVariant"), "productVariants");
    /// ```
    #[must_use]
    pub fn plural_camel_case(input: &str) -> String {
        input.to_snake_case().to_plural().to_camel_case()
    }

    /// Singularize the last word of a camel-cased name
    ///
    /// ```
    /// # use entity_maker::naming::Naming;
    /// assert_eq!(Naming::singular_camel_case("products"), "product");
    /// assert_eq!(Naming::singular_camel_case("childCategories"), "childCategory");
    /// ```
    #[must_use]
    pub fn singular_camel_case(input: &str) -> String {
        input.to_snake_case().to_singular().to_camel_case()
    }

    /// Accessor suffix for a property (`publishedAt` → `PublishedAt`)
    #[must_use]
    pub fn accessor_suffix(property: &str) -> String {
        let mut chars = property.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }
}

/// Validate a Doctrine field name
///
/// The name must be a PHP identifier and must not be a reserved SQL keyword.
///
/// # Errors
///
/// Returns [`EntityMakerError::InvalidFieldName`] when either rule is violated.
pub fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EntityMakerError::invalid_field(name, "name cannot be empty"));
    }
    if !IDENTIFIER.is_match(name) {
        return Err(EntityMakerError::invalid_field(
            name,
            "must start with a letter or underscore and contain only letters, digits and underscores",
        ));
    }
    if RESERVED_FIELD_NAMES.contains(&name.to_ascii_lowercase().as_str()) {
        return Err(EntityMakerError::invalid_field(name, "reserved SQL keyword"));
    }
    Ok(())
}

/// Validate a (possibly namespaced) class name such as `Product` or `Admin\User`
///
/// # Errors
///
/// Returns [`EntityMakerError::InvalidEntityName`] if any segment is not a PHP
/// identifier or is a reserved word.
pub fn validate_class_name(name: &str) -> Result<()> {
    let trimmed = name.trim_start_matches('\\');
    let valid = !trimmed.is_empty()
        && trimmed.split('\\').all(|segment| {
            IDENTIFIER.is_match(segment)
                && !RESERVED_CLASS_NAMES.contains(&segment.to_ascii_lowercase().as_str())
        });

    if valid {
        Ok(())
    } else {
        Err(EntityMakerError::InvalidEntityName(name.to_string()))
    }
}
