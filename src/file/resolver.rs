//! Key file lookup against ordered search paths.
//!
//! A key file may be named absolutely or relative to one of the configured search
//! directories (typically the project directory followed by the current working directory).
//! Lookup follows these rules:
//!
//! - **Absolute, existing**: the lexically normalized path is returned
//! - **Absolute, missing**: the path is returned exactly as supplied, so that the eventual
//!   "file not found" report shows the caller's own spelling
//! - **Relative**: each search path is tried in order, and the first existing candidate is
//!   returned normalized; if no candidate exists the lookup yields `None`
//!
//! Normalization is purely lexical: `.` components are dropped and `..` components consume
//! their parent. Symbolic links are not resolved.

use std::{
    fmt,
    hash::{Hash, Hasher},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use log::debug;

use super::{KeyFileSystem, PhysicalFileSystem};
use crate::{Error, Result};

/// Resolves key file names against an ordered list of absolute search paths.
///
/// Two resolvers are equal when they hold the same search paths in the same order and share
/// the same filesystem instance. The hash covers the search paths only.
///
/// # Examples
///
/// ```rust,no_run
/// use dotsign::file::{KeyResolver, PhysicalFileSystem};
///
/// let resolver = KeyResolver::new(["/src/app", "/work"], PhysicalFileSystem::shared())?;
/// if let Some(path) = resolver.resolve("app.snk") {
///     println!("using {}", path.display());
/// }
/// # Ok::<(), dotsign::Error>(())
/// ```
#[derive(Clone)]
pub struct KeyResolver {
    search_paths: Vec<PathBuf>,
    file_system: Arc<dyn KeyFileSystem>,
}

impl KeyResolver {
    /// Create a new resolver.
    ///
    /// # Arguments
    /// * `search_paths` - Ordered directories used to resolve relative key file names
    /// * `file_system` - Filesystem capability used for probing and reading
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if any search path is not absolute.
    pub fn new<I, P>(search_paths: I, file_system: Arc<dyn KeyFileSystem>) -> Result<KeyResolver>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let search_paths: Vec<PathBuf> = search_paths.into_iter().map(Into::into).collect();
        if let Some(relative) = search_paths.iter().find(|path| !path.is_absolute()) {
            return Err(Error::Configuration(format!(
                "key file search path '{}' must be absolute",
                relative.display()
            )));
        }

        Ok(KeyResolver {
            search_paths,
            file_system,
        })
    }

    /// The configured search paths, in lookup order.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// The filesystem capability used by this resolver.
    pub fn file_system(&self) -> &Arc<dyn KeyFileSystem> {
        &self.file_system
    }

    /// Resolve `path` against the configured search paths.
    ///
    /// See the [module documentation](self) for the exact rules.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Option<PathBuf> {
        resolve_key_file(path.as_ref(), &self.search_paths, self.file_system.as_ref())
    }

    /// Like [`KeyResolver::resolve`], but a name that resolves nowhere is an error.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotFound`] carrying `path` as supplied.
    pub fn locate(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        self.resolve(path)
            .ok_or_else(|| Error::NotFound(path.to_path_buf()))
    }
}

impl Default for KeyResolver {
    fn default() -> Self {
        KeyResolver {
            search_paths: Vec::new(),
            file_system: PhysicalFileSystem::shared(),
        }
    }
}

impl fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyResolver")
            .field("search_paths", &self.search_paths)
            .field("file_system", &self.file_system)
            .finish()
    }
}

impl PartialEq for KeyResolver {
    fn eq(&self, other: &Self) -> bool {
        self.search_paths == other.search_paths
            && std::ptr::addr_eq(
                Arc::as_ptr(&self.file_system),
                Arc::as_ptr(&other.file_system),
            )
    }
}

impl Eq for KeyResolver {}

impl Hash for KeyResolver {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.search_paths.hash(state);
    }
}

/// Resolve a key file name against `search_paths`.
///
/// # Arguments
/// * `path` - Key file name as supplied by the caller
/// * `search_paths` - Ordered absolute directories tried for relative names
/// * `file_system` - Filesystem capability used to probe candidates
///
/// # Returns
/// The resolved path, the verbatim `path` for a missing absolute path, or `None` when a
/// relative name exists under none of the search paths.
pub fn resolve_key_file(
    path: &Path,
    search_paths: &[PathBuf],
    file_system: &dyn KeyFileSystem,
) -> Option<PathBuf> {
    if path.is_absolute() {
        if file_system.file_exists(path) {
            return Some(normalize_path(path));
        }

        return Some(path.to_path_buf());
    }

    for search_path in search_paths {
        let candidate = search_path.join(path);
        if file_system.file_exists(&candidate) {
            let resolved = normalize_path(&candidate);
            debug!(
                "resolved key file '{}' to '{}'",
                path.display(),
                resolved.display()
            );
            return Some(resolved);
        }
    }

    debug!(
        "key file '{}' not found on {} search path(s)",
        path.display(),
        search_paths.len()
    );
    None
}

/// Lexically normalize `path`, removing `.` and folding `..` into its parent.
///
/// A `..` directly below the root is dropped; a leading `..` on a relative path is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::Prefix(_) | Component::RootDir) => {}
                _ => normalized.push(".."),
            },
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFileSystem;

    fn memory_fs(files: &[&str]) -> Arc<MemoryFileSystem> {
        let fs = MemoryFileSystem::new();
        for file in files {
            fs.insert(*file, vec![0x06]);
        }
        Arc::new(fs)
    }

    #[test]
    fn relative_uses_first_match() {
        let fs = memory_fs(&["/b/key.snk"]);
        let resolver = KeyResolver::new(["/a", "/b"], fs).unwrap();

        assert_eq!(resolver.resolve("key.snk"), Some(PathBuf::from("/b/key.snk")));
    }

    #[test]
    fn relative_prefers_earlier_search_path() {
        let fs = memory_fs(&["/a/key.snk", "/b/key.snk"]);
        let resolver = KeyResolver::new(["/a", "/b"], fs).unwrap();

        assert_eq!(resolver.resolve("key.snk"), Some(PathBuf::from("/a/key.snk")));
    }

    #[test]
    fn relative_not_found() {
        let fs = memory_fs(&[]);
        let resolver = KeyResolver::new(["/a", "/b"], fs).unwrap();

        assert_eq!(resolver.resolve("key.snk"), None);
    }

    #[test]
    fn relative_without_search_paths() {
        let fs = memory_fs(&["/a/key.snk"]);
        let resolver = KeyResolver::new(Vec::<PathBuf>::new(), fs).unwrap();

        assert_eq!(resolver.resolve("key.snk"), None);
    }

    #[test]
    fn relative_with_parent_component_is_normalized() {
        let fs = memory_fs(&["/a/sub/../key.snk"]);
        let resolver = KeyResolver::new(["/a/sub"], fs).unwrap();

        assert_eq!(resolver.resolve("../key.snk"), Some(PathBuf::from("/a/key.snk")));
    }

    #[test]
    fn absolute_existing_is_normalized() {
        let fs = memory_fs(&["/keys/./x/../key.snk"]);
        let resolver = KeyResolver::new(Vec::<PathBuf>::new(), fs).unwrap();

        assert_eq!(
            resolver.resolve("/keys/./x/../key.snk"),
            Some(PathBuf::from("/keys/key.snk"))
        );
    }

    #[test]
    fn absolute_missing_is_verbatim() {
        let fs = memory_fs(&[]);
        let resolver = KeyResolver::new(["/a"], fs).unwrap();

        assert_eq!(
            resolver.resolve("/keys/./missing.snk"),
            Some(PathBuf::from("/keys/./missing.snk"))
        );
    }

    #[test]
    fn locate_missing() {
        let resolver = KeyResolver::new(["/a"], memory_fs(&[])).unwrap();
        let result = resolver.locate("key.snk");
        assert!(matches!(result, Err(Error::NotFound(path)) if path == Path::new("key.snk")));
    }

    #[test]
    fn relative_search_path_rejected() {
        let fs = memory_fs(&[]);
        let result = KeyResolver::new(["/a", "relative"], fs);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_path(Path::new("../a/b/..")), PathBuf::from("../a"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn equality() {
        let fs: Arc<dyn KeyFileSystem> = memory_fs(&[]);
        let a = KeyResolver::new(["/a", "/b"], fs.clone()).unwrap();
        let b = KeyResolver::new(["/a", "/b"], fs.clone()).unwrap();
        let reordered = KeyResolver::new(["/b", "/a"], fs).unwrap();
        let other_fs = KeyResolver::new(["/a", "/b"], memory_fs(&[])).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, reordered);
        assert_ne!(a, other_fs);
    }
}
