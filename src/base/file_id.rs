//! File identifiers.
//!
//! Files are identified by absolute path at the API boundary. Internally every
//! path is mapped once to a small `Copy` id so symbols, references and
//! diagnostics can point at their file cheaply.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

/// A stable identifier for a file known to a registry.
///
/// Ids are never reused within one [`FileSet`]: closing and re-loading the same
/// path yields the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(u32);

impl FileId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Bidirectional path <-> [`FileId`] mapping.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    by_path: FxHashMap<Arc<Path>, FileId>,
    paths: Vec<Arc<Path>>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id for `path`, allocating one on first sight.
    pub fn intern(&mut self, path: &Path) -> FileId {
        if let Some(&id) = self.by_path.get(path) {
            return id;
        }
        let id = FileId::new(self.paths.len() as u32);
        let path: Arc<Path> = Arc::from(path);
        self.paths.push(path.clone());
        self.by_path.insert(path, id);
        id
    }

    /// Look up an id without allocating.
    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    pub fn path(&self, file: FileId) -> Option<&Arc<Path>> {
        self.paths.get(file.0 as usize)
    }

    pub fn path_buf(&self, file: FileId) -> Option<PathBuf> {
        self.path(file).map(|p| p.to_path_buf())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
