//! Entity class resolution
//!
//! Maps class names to source paths and decides which classes the engine may edit.
//! Existence is a question for the [`crate::store::SourceStore`]: a class exists iff
//! the store has a file at [`EntityRegistry::path_of`].

use crate::config::ProjectSettings;
use std::path::{Path, PathBuf};

/// Class lookup used by the orchestrator and the relation resolver
pub trait EntityRegistry {
    /// Fully-qualified class for a requested entity name
    ///
    /// Short names (`Product`, `Admin\User`) land in the entity namespace; names with
    /// a leading backslash or an already-mapped namespace prefix are kept as-is.
    fn qualify(&self, name: &str) -> String;

    /// Source path of a class, relative to the project root
    fn path_of(&self, class: &str) -> PathBuf;

    /// Whether the class lives outside user-editable source
    fn is_externally_owned(&self, class: &str) -> bool;

    /// Fully-qualified repository class for an entity class
    fn repository_of(&self, class: &str) -> String;
}

/// PSR-4 autoload based registry
#[derive(Debug, Clone)]
pub struct Psr4Registry {
    entity_namespace: String,
    repository_namespace: String,
    /// Longest prefix first
    autoload: Vec<(String, PathBuf)>,
    vendor_dir: PathBuf,
}

impl Psr4Registry {
    /// Registry for the given project layout
    #[must_use]
    pub fn new(settings: &ProjectSettings) -> Self {
        let mut autoload: Vec<(String, PathBuf)> = settings
            .autoload
            .iter()
            .map(|(prefix, dir)| (normalize_prefix(prefix), dir.clone()))
            .collect();
        autoload.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Self {
            entity_namespace: settings.entity_namespace.trim_matches('\\').to_string(),
            repository_namespace: settings.repository_namespace.trim_matches('\\').to_string(),
            autoload,
            vendor_dir: settings.vendor_dir.clone(),
        }
    }

    fn mapped_prefix(&self, class: &str) -> Option<(&str, &Path)> {
        self.autoload
            .iter()
            .find(|(prefix, _)| class.starts_with(prefix.as_str()))
            .map(|(prefix, dir)| (prefix.as_str(), dir.as_path()))
    }
}

impl Default for Psr4Registry {
    fn default() -> Self {
        Self::new(&ProjectSettings::default())
    }
}

fn normalize_prefix(prefix: &str) -> String {
    format!("{}\\", prefix.trim_matches('\\'))
}

fn class_to_relative_path(class_suffix: &str) -> PathBuf {
    let mut path: PathBuf = class_suffix.split('\\').collect();
    path.set_extension("php");
    path
}

impl EntityRegistry for Psr4Registry {
    fn qualify(&self, name: &str) -> String {
        if let Some(absolute) = name.strip_prefix('\\') {
            return absolute.to_string();
        }
        if name.contains('\\') && self.mapped_prefix(name).is_some() {
            return name.to_string();
        }
        format!("{}\\{name}", self.entity_namespace)
    }

    fn path_of(&self, class: &str) -> PathBuf {
        let class = class.trim_start_matches('\\');
        self.mapped_prefix(class).map_or_else(
            || self.vendor_dir.join(class_to_relative_path(class)),
            |(prefix, dir)| dir.join(class_to_relative_path(&class[prefix.len()..])),
        )
    }

    fn is_externally_owned(&self, class: &str) -> bool {
        self.path_of(class).starts_with(&self.vendor_dir)
    }

    fn repository_of(&self, class: &str) -> String {
        let class = class.trim_start_matches('\\');
        let relative = class
            .strip_prefix(&self.entity_namespace)
            .and_then(|rest| rest.strip_prefix('\\'))
            .unwrap_or_else(|| crate::naming::Naming::short_class_name(class));
        format!("{}\\{relative}Repository", self.repository_namespace)
    }
}
