//! Physical filesystem backend.
//!
//! [`PhysicalFileSystem`] implements [`crate::file::KeyFileSystem`] on top of [`std::fs`].
//! Key files are small, so they are read eagerly into an owned buffer; nothing is kept open
//! between calls.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use super::KeyFileSystem;
use crate::Result;

/// A key filesystem that reads from disk.
///
/// # Examples
///
/// ```rust,no_run
/// use dotsign::file::{KeyFileSystem, PhysicalFileSystem};
/// use std::path::Path;
///
/// let fs = PhysicalFileSystem::shared();
/// if fs.file_exists(Path::new("/keys/app.snk")) {
///     let bytes = fs.read_all_bytes(Path::new("/keys/app.snk"))?;
///     println!("{} bytes", bytes.len());
/// }
/// # Ok::<(), dotsign::Error>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct PhysicalFileSystem;

impl PhysicalFileSystem {
    /// Returns the process-wide instance.
    ///
    /// Strategies compare their filesystem by identity, so strategies built from default
    /// options should all share this instance.
    pub fn shared() -> Arc<PhysicalFileSystem> {
        static INSTANCE: OnceLock<Arc<PhysicalFileSystem>> = OnceLock::new();
        INSTANCE.get_or_init(|| Arc::new(PhysicalFileSystem)).clone()
    }
}

impl KeyFileSystem for PhysicalFileSystem {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_all_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    fn temp_path(&self) -> Option<PathBuf> {
        Some(std::env::temp_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn physical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.snk");
        fs::write(&path, [0x06, 0x02, 0x00, 0x00]).unwrap();

        let fs = PhysicalFileSystem;
        assert!(fs.file_exists(&path));
        assert_eq!(fs.read_all_bytes(&path).unwrap(), vec![0x06, 0x02, 0x00, 0x00]);
        assert_eq!(fs.temp_path(), Some(std::env::temp_dir()));
    }

    #[test]
    fn physical_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.snk");

        let fs = PhysicalFileSystem;
        assert!(!fs.file_exists(&path));
        assert!(matches!(fs.read_all_bytes(&path), Err(Error::FileError(_))));
    }

    #[test]
    fn directories_are_not_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!PhysicalFileSystem.file_exists(dir.path()));
    }

    #[test]
    fn shared_is_one_instance() {
        assert!(Arc::ptr_eq(
            &PhysicalFileSystem::shared(),
            &PhysicalFileSystem::shared()
        ));
    }
}
