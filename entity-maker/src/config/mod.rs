//! Configuration management for entity-maker
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `ENTITY_MAKER_` prefix, `__` for nesting)
//! 2. `<project root>/entity-maker.toml`
//! 3. `~/.config/entity-maker/config.toml` (user config, XDG)
//! 4. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # entity-maker.toml
//! [project]
//! entity_namespace = "App\\Entity"
//! repository_namespace = "App\\Repository"
//! vendor_dir = "vendor"
//!
//! [project.autoload]
//! "App\\" = "src/"
//!
//! [generation]
//! default_string_length = 255
//! nullability = "required-is-nullable"
//! overwrite = true
//! ```

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name looked up in the project root
pub const PROJECT_CONFIG_FILE: &str = "entity-maker.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ENTITY_MAKER_";

/// How a property's `required` flag maps onto the generated `nullable` attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullabilityPolicy {
    /// `nullable = required`; reproduces the established generator output
    #[default]
    RequiredIsNullable,
    /// `nullable = !required`
    RequiredIsNotNull,
}

impl NullabilityPolicy {
    /// Nullability for a property with the given `required` flag
    #[must_use]
    pub const fn nullable(self, required: bool) -> bool {
        match self {
            Self::RequiredIsNullable => required,
            Self::RequiredIsNotNull => !required,
        }
    }
}

/// Project layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Project root; every other path is relative to it
    pub root: PathBuf,

    /// Namespace new entities are created in
    pub entity_namespace: String,

    /// Namespace repositories are created in
    pub repository_namespace: String,

    /// PSR-4 autoload map: namespace prefix → directory
    pub autoload: BTreeMap<String, PathBuf>,

    /// Third-party code; classes resolving here are never modified
    pub vendor_dir: PathBuf,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            entity_namespace: "App\\Entity".to_string(),
            repository_namespace: "App\\Repository".to_string(),
            autoload: BTreeMap::from([("App\\".to_string(), PathBuf::from("src"))]),
            vendor_dir: PathBuf::from("vendor"),
        }
    }
}

/// Generation defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Length used for string columns requested without one
    pub default_string_length: Option<u32>,

    /// Mapping of `required` onto `nullable`
    pub nullability: NullabilityPolicy,

    /// Default overwrite flag for requests built by the CLI
    pub overwrite: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            default_string_length: Some(255),
            nullability: NullabilityPolicy::default(),
            overwrite: true,
        }
    }
}

/// Complete entity-maker configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMakerConfig {
    /// Project layout
    #[serde(default)]
    pub project: ProjectSettings,

    /// Generation defaults
    #[serde(default)]
    pub generation: GenerationSettings,
}

impl EntityMakerConfig {
    /// Load configuration for the project rooted at `root`
    ///
    /// `project.root` is set to `root` unless a source overrides it.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file cannot be parsed or a value has the
    /// wrong type.
    pub fn load_for_project(root: &Path) -> anyhow::Result<Self> {
        let mut defaults = Self::default();
        defaults.project.root = root.to_path_buf();

        let mut figment = Figment::new().merge(Serialized::defaults(defaults));

        let user_config = Self::recommended_path();
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        let project_config = root.join(PROJECT_CONFIG_FILE);
        if project_config.exists() {
            figment = figment.merge(Toml::file(&project_config));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Ok(figment.extract()?)
    }

    /// Load configuration from a specific file, on top of defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file contains invalid TOML or mistyped values.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// User-level config path (`~/.config/entity-maker/config.toml`)
    #[must_use]
    pub fn recommended_path() -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from("./config.toml"),
            |config_dir| config_dir.join("entity-maker").join("config.toml"),
        )
    }
}
