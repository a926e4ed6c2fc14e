//! Filesystem access for strong-name key files.
//!
//! Everything the key pipeline needs from the outside world goes through the
//! [`KeyFileSystem`] trait: an existence probe, a whole-file read and the directory used for
//! temporary signing output. Two backends are provided, mirroring each other:
//!
//! - [`PhysicalFileSystem`] - Reads from disk via [`std::fs`]
//! - [`MemoryFileSystem`] - Serves files from an in-memory map, for deterministic tests and for
//!   hosts that keep key material outside of the filesystem
//!
//! Path lookup against search directories lives in [`resolver`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotsign::file::{KeyFileSystem, MemoryFileSystem};
//! use std::path::Path;
//!
//! let fs = MemoryFileSystem::new();
//! fs.insert("/keys/app.snk", vec![0x07, 0x02, 0x00, 0x00]);
//!
//! assert!(fs.file_exists(Path::new("/keys/app.snk")));
//! let bytes = fs.read_all_bytes(Path::new("/keys/app.snk"))?;
//! assert_eq!(bytes.len(), 4);
//! # Ok::<(), dotsign::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! [`KeyFileSystem`] requires [`Send`] and [`Sync`]; both backends can be shared behind an
//! [`std::sync::Arc`] by every strategy that resolves keys.

pub mod io;
mod memory;
mod physical;
pub mod resolver;

pub use memory::MemoryFileSystem;
pub use physical::PhysicalFileSystem;
pub use resolver::{normalize_path, resolve_key_file, KeyResolver};

use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::Result;

/// Capability used to locate and read key files.
///
/// Implementations perform blocking, synchronous I/O. They must not cache file contents:
/// the key cache in [`crate::keys::KeyPairCache`] relies on seeing the bytes that are on disk
/// at the time of each request.
pub trait KeyFileSystem: Send + Sync + fmt::Debug {
    /// Returns `true` if a regular file exists at `path`.
    fn file_exists(&self, path: &Path) -> bool;

    /// Reads the complete contents of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file is missing or unreadable.
    fn read_all_bytes(&self, path: &Path) -> Result<Vec<u8>>;

    /// Returns the directory in which temporary signing output is created.
    ///
    /// `None` if this filesystem has no place for temporary files; host signing that needs
    /// to stage output then fails with [`crate::Error::SigningTempPathUnavailable`].
    fn temp_path(&self) -> Option<PathBuf>;
}
