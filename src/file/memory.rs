//! In-memory filesystem backend.

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::RwLock,
};

use super::KeyFileSystem;
use crate::{Error, Result};

/// Key filesystem backed by an in-memory map of path to contents.
///
/// Paths are matched exactly; no normalization is applied on lookup.
#[derive(Debug)]
pub struct MemoryFileSystem {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
    temp_path: Option<PathBuf>,
}

impl MemoryFileSystem {
    /// Create an empty in-memory filesystem whose temp directory is the system default.
    pub fn new() -> MemoryFileSystem {
        MemoryFileSystem::with_temp_path(std::env::temp_dir())
    }

    /// Create an empty in-memory filesystem reporting `temp_path` as its temp directory.
    pub fn with_temp_path(temp_path: impl Into<PathBuf>) -> MemoryFileSystem {
        MemoryFileSystem {
            files: RwLock::new(HashMap::new()),
            temp_path: Some(temp_path.into()),
        }
    }

    /// Create an empty in-memory filesystem that has no temp directory.
    pub fn without_temp_path() -> MemoryFileSystem {
        MemoryFileSystem {
            files: RwLock::new(HashMap::new()),
            temp_path: None,
        }
    }

    /// Adds or replaces the file at `path`.
    pub fn insert(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        let mut files = self
            .files
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        files.insert(path.into(), data);
    }

    /// Removes the file at `path`, returning its contents if it existed.
    pub fn remove(&self, path: &Path) -> Option<Vec<u8>> {
        let mut files = self
            .files
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        files.remove(path)
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        MemoryFileSystem::new()
    }
}

impl KeyFileSystem for MemoryFileSystem {
    fn file_exists(&self, path: &Path) -> bool {
        let files = self
            .files
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        files.contains_key(path)
    }

    fn read_all_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self
            .files
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match files.get(path) {
            Some(data) => Ok(data.clone()),
            None => Err(Error::FileError(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Could not find file '{}'.", path.display()),
            ))),
        }
    }

    fn temp_path(&self) -> Option<PathBuf> {
        self.temp_path.clone()
    }
}
