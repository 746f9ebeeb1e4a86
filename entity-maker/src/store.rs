//! Source storage
//!
//! The engine never touches the file system directly; every read and write goes
//! through a [`SourceStore`]. Paths are relative to the project root.

use crate::error::{EntityMakerError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Read/write access to class sources
pub trait SourceStore {
    /// Whether a file exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Read the file at `path`
    ///
    /// # Errors
    ///
    /// Returns [`EntityMakerError::Io`] if the file is missing or unreadable.
    fn read(&self, path: &Path) -> Result<String>;

    /// Write `contents` to `path`, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns [`EntityMakerError::Io`] if the file cannot be written.
    fn write(&mut self, path: &Path, contents: &str) -> Result<()>;
}

/// Store backed by the file system under a project root
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl SourceStore for FsStore {
    fn exists(&self, path: &Path) -> bool {
        self.absolute(path).is_file()
    }

    fn read(&self, path: &Path) -> Result<String> {
        let absolute = self.absolute(path);
        fs::read_to_string(&absolute).map_err(|err| EntityMakerError::io(absolute, err))
    }

    fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        let absolute = self.absolute(path);
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).map_err(|err| EntityMakerError::io(parent, err))?;
        }
        fs::write(&absolute, contents).map_err(|err| EntityMakerError::io(&absolute, err))?;
        tracing::debug!(path = %absolute.display(), bytes = contents.len(), "wrote source");
        Ok(())
    }
}

/// In-memory store that records every write
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<PathBuf, String>,
    writes: Vec<PathBuf>,
}

impl MemoryStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: seed a file without recording a write
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    /// Current contents of a file
    #[must_use]
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    /// Every write in order
    #[must_use]
    pub fn writes(&self) -> &[PathBuf] {
        &self.writes
    }

    /// Number of writes to one path
    #[must_use]
    pub fn write_count(&self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        self.writes.iter().filter(|written| *written == path).count()
    }

    /// All file paths
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }
}

impl SourceStore for MemoryStore {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &Path) -> Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            EntityMakerError::io(path, io::Error::new(io::ErrorKind::NotFound, "no such file"))
        })
    }

    fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        self.files.insert(path.to_path_buf(), contents.to_string());
        self.writes.push(path.to_path_buf());
        Ok(())
    }
}

/// A pending change recorded by an [`OverlayStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange<'a> {
    /// File path
    pub path: &'a Path,
    /// Contents in the underlying store, `None` for new files
    pub before: Option<String>,
    /// Contents after the run
    pub after: &'a str,
}

/// Read-through store that keeps writes in memory
///
/// Used for dry runs: the underlying store is only ever read.
#[derive(Debug)]
pub struct OverlayStore<S> {
    base: S,
    pending: BTreeMap<PathBuf, String>,
}

impl<S: SourceStore> OverlayStore<S> {
    /// Overlay on top of `base`
    pub const fn new(base: S) -> Self {
        Self {
            base,
            pending: BTreeMap::new(),
        }
    }

    /// Underlying store
    pub const fn base(&self) -> &S {
        &self.base
    }

    /// Whether anything was written
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending changes, sorted by path
    ///
    /// Files written with their original contents are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if an original file cannot be read from the base store.
    pub fn changes(&self) -> Result<Vec<PendingChange<'_>>> {
        let mut changes = Vec::with_capacity(self.pending.len());
        for (path, after) in &self.pending {
            let before = if self.base.exists(path) {
                Some(self.base.read(path)?)
            } else {
                None
            };
            if before.as_deref() == Some(after.as_str()) {
                continue;
            }
            changes.push(PendingChange {
                path,
                before,
                after,
            });
        }
        Ok(changes)
    }
}

impl<S: SourceStore> SourceStore for OverlayStore<S> {
    fn exists(&self, path: &Path) -> bool {
        self.pending.contains_key(path) || self.base.exists(path)
    }

    fn read(&self, path: &Path) -> Result<String> {
        match self.pending.get(path) {
            Some(contents) => Ok(contents.clone()),
            None => self.base.read(path),
        }
    }

    fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        self.pending.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}
