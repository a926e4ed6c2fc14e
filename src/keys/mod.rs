//! Resolved strong-name key material.
//!
//! [`KeyMaterial`] is the immutable outcome of resolving one key source: a key file, a key
//! container held by the host, or a raw public key passed as an option. Resolution never fails
//! outright. Whatever goes wrong along the way (a missing file, unreadable bytes, a blob that is
//! not a key, an unavailable host) is folded into a single [`Diagnostic`] carried by an
//! otherwise empty value, so callers only ever ask "can I sign with this?".
//!
//! # Key Types
//! - [`KeyMaterial`] - The resolved key record and its derived queries
//! - [`KeyPairCache`] - Single-slot memoization of parsed key files
//!
//! # Examples
//!
//! ```rust
//! use dotsign::{file::{KeyResolver, MemoryFileSystem}, keys::{KeyMaterial, KeyPairCache}};
//! use std::sync::Arc;
//!
//! let fs = Arc::new(MemoryFileSystem::new());
//! let resolver = KeyResolver::new(["/src"], fs)?;
//! let cache = KeyPairCache::new();
//!
//! let keys = KeyMaterial::from_file("missing.snk", &resolver, &cache, false);
//! assert!(!keys.can_sign());
//! assert_eq!(
//!     keys.diagnostic().unwrap().message(),
//!     "Error signing output with public key from file 'missing.snk' -- File not found."
//! );
//! # Ok::<(), dotsign::Error>(())
//! ```

mod cache;

pub use cache::{CachedKeyPair, KeyPairCache};

use std::path::{Path, PathBuf};

use log::debug;
use md5::{Digest, Md5};
use sha1::Sha1;

use crate::{
    blob::{
        is_valid_public_key, try_extract_public_key, try_parse_key, AssemblyHashAlgorithm,
        ParsedKey, RsaParameters,
    },
    diagnostics::{Diagnostic, FILE_NOT_FOUND, INVALID_PUBLIC_KEY},
    file::{io::read_le, KeyResolver},
    signing::HostSigningProvider,
    Error, Result,
};

/// Signature size used for keys whose canonical public key is shorter than 160 bytes.
pub const MIN_SIGNATURE_SIZE: usize = 128;

/// Key material resolved from a key file, key container or raw public key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMaterial {
    key_pair: Option<Vec<u8>>,
    public_key: Option<Vec<u8>>,
    private_key: Option<RsaParameters>,
    diagnostic: Option<Diagnostic>,
    key_container: Option<String>,
    key_file_path: Option<PathBuf>,
    has_counter_signature: bool,
}

impl KeyMaterial {
    /// Key material representing the absence of any key.
    pub fn none() -> KeyMaterial {
        KeyMaterial::default()
    }

    fn failed(diagnostic: Diagnostic) -> KeyMaterial {
        KeyMaterial {
            diagnostic: Some(diagnostic),
            ..KeyMaterial::default()
        }
    }

    /// Resolve and load a key file.
    ///
    /// `key_file` is resolved through `resolver`; diagnostics always name it exactly as given.
    /// Key pairs are memoized in `cache`, keyed by the complete file content.
    pub fn from_file(
        key_file: &str,
        resolver: &KeyResolver,
        cache: &KeyPairCache,
        has_counter_signature: bool,
    ) -> KeyMaterial {
        KeyMaterial::from_file_with_parser(
            key_file,
            resolver,
            cache,
            has_counter_signature,
            try_parse_key,
        )
    }

    /// [`KeyMaterial::from_file`] with a substitute key pair parser.
    pub fn from_file_with_parser<F>(
        key_file: &str,
        resolver: &KeyResolver,
        cache: &KeyPairCache,
        has_counter_signature: bool,
        parse: F,
    ) -> KeyMaterial
    where
        F: FnOnce(&[u8]) -> Option<ParsedKey>,
    {
        let resolved = match resolver.locate(key_file) {
            Ok(resolved) => resolved,
            Err(_) => {
                return KeyMaterial::failed(Diagnostic::public_key_file_failure(
                    key_file,
                    FILE_NOT_FOUND,
                ));
            }
        };

        let content = match resolver.file_system().read_all_bytes(&resolved) {
            Ok(content) => content,
            Err(error) => {
                debug!("failed to read key file '{}': {}", resolved.display(), error);
                return KeyMaterial::failed(Diagnostic::public_key_file_failure(
                    key_file,
                    error.to_string(),
                ));
            }
        };

        KeyMaterial::from_file_content(
            key_file,
            &resolved,
            content,
            cache,
            has_counter_signature,
            parse,
        )
    }

    /// Build key material from the bytes of an already located key file.
    ///
    /// # Arguments
    /// * `key_file` - The key file name as supplied by the caller, used in diagnostics
    /// * `resolved` - The path the content was read from
    /// * `content` - Complete file content
    /// * `cache` - Key pair cache consulted before `parse` runs
    /// * `has_counter_signature` - Carried through unevaluated
    /// * `parse` - Key pair parser, normally [`try_parse_key`]
    pub fn from_file_content<F>(
        key_file: &str,
        resolved: &Path,
        content: Vec<u8>,
        cache: &KeyPairCache,
        has_counter_signature: bool,
        parse: F,
    ) -> KeyMaterial
    where
        F: FnOnce(&[u8]) -> Option<ParsedKey>,
    {
        if is_valid_public_key(&content) {
            return KeyMaterial {
                public_key: Some(content),
                key_file_path: Some(resolved.to_path_buf()),
                has_counter_signature,
                ..KeyMaterial::default()
            };
        }

        let Some(entry) = cache.get_or_parse(&content, parse) else {
            return KeyMaterial::failed(Diagnostic::public_key_file_failure(
                key_file,
                INVALID_PUBLIC_KEY,
            ));
        };

        KeyMaterial {
            public_key: Some(entry.public_key.clone()),
            private_key: entry.private_key.clone(),
            key_pair: Some(content),
            key_file_path: Some(resolved.to_path_buf()),
            has_counter_signature,
            ..KeyMaterial::default()
        }
    }

    /// Fetch the public key of a key container from the host signing service.
    ///
    /// The private key never leaves the host. An unavailable host is reported as
    /// "Assembly signing not supported." rather than as a failure of the container.
    pub fn from_container(
        container: &str,
        provider: &dyn HostSigningProvider,
        has_counter_signature: bool,
    ) -> KeyMaterial {
        let fetched = provider
            .acquire()
            .and_then(|service| service.public_key_from_container(container));

        let public_key = match fetched {
            Ok(bytes) => try_extract_public_key(&bytes),
            Err(error) => {
                return KeyMaterial::failed(Diagnostic::public_key_container_failure(
                    container,
                    error.to_string(),
                ));
            }
        };

        match public_key {
            Some(public_key) => KeyMaterial {
                public_key: Some(public_key),
                key_container: Some(container.to_string()),
                has_counter_signature,
                ..KeyMaterial::default()
            },
            None => KeyMaterial::failed(Diagnostic::public_key_container_failure(
                container,
                INVALID_PUBLIC_KEY,
            )),
        }
    }

    /// Key material consisting of a raw public key option.
    ///
    /// An invalid key yields a diagnostic echoing the offending bytes.
    pub fn from_public_key(public_key: &[u8]) -> KeyMaterial {
        if !is_valid_public_key(public_key) {
            return KeyMaterial::failed(Diagnostic::bad_public_key_option(public_key));
        }

        KeyMaterial {
            public_key: Some(public_key.to_vec()),
            ..KeyMaterial::default()
        }
    }

    /// Key material that failed to resolve for the given reason.
    pub fn from_diagnostic(diagnostic: Diagnostic) -> KeyMaterial {
        KeyMaterial::failed(diagnostic)
    }

    /// Raw key file content, present only for key pairs loaded from a file.
    pub fn key_pair(&self) -> Option<&[u8]> {
        self.key_pair.as_deref()
    }

    /// The canonical public key, present whenever any key is known.
    pub fn public_key(&self) -> Option<&[u8]> {
        self.public_key.as_deref()
    }

    /// Private RSA parameters, present for complete key pairs loaded from a file.
    pub fn private_key(&self) -> Option<&RsaParameters> {
        self.private_key.as_ref()
    }

    /// The diagnostic describing why resolution failed.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }

    /// Name of the host key container.
    pub fn key_container(&self) -> Option<&str> {
        self.key_container.as_deref()
    }

    /// Resolved path of the key file.
    pub fn key_file_path(&self) -> Option<&Path> {
        self.key_file_path.as_deref()
    }

    /// Whether a counter-signature was requested.
    pub fn has_counter_signature(&self) -> bool {
        self.has_counter_signature
    }

    /// Returns `true` if no key and no diagnostic is present.
    pub fn is_none(&self) -> bool {
        *self == KeyMaterial::none()
    }

    /// A key pair from a file or a host container is available.
    pub fn can_sign(&self) -> bool {
        self.key_pair.is_some() || self.key_container.is_some()
    }

    /// A strong name can be given, possibly with a delayed or public signature.
    pub fn can_provide_strong_name(&self) -> bool {
        self.can_sign() || self.public_key.is_some()
    }

    /// The public key token; the last 8 bytes of the public key hash, as a little-endian value.
    ///
    /// Formatting the token with `{:016x}` gives the familiar display form, e.g.
    /// `b77a5c561934e089` for the ECMA key.
    ///
    /// # Arguments
    /// * `algo` - [`AssemblyHashAlgorithm::SHA1`] or [`AssemblyHashAlgorithm::MD5`]
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for other algorithms.
    pub fn public_key_token(&self, algo: u32) -> Result<Option<u64>> {
        match &self.public_key {
            Some(public_key) => compute_public_key_token(public_key, algo).map(Some),
            None => Ok(None),
        }
    }

    /// Size in bytes of the strong-name signature produced with this key.
    pub fn signature_size(&self) -> usize {
        let key_size = self.public_key.as_ref().map_or(0, Vec::len);
        if key_size < MIN_SIGNATURE_SIZE + 32 {
            MIN_SIGNATURE_SIZE
        } else {
            key_size - 32
        }
    }
}

/// A key file or container name, with an empty name treated as no name at all.
pub(crate) fn non_empty(name: Option<&str>) -> Option<&str> {
    name.filter(|name| !name.is_empty())
}

/// Compute the token of a public key with the given [`AssemblyHashAlgorithm`].
///
/// # Errors
/// Returns [`crate::Error::NotSupported`] for algorithms other than SHA-1 and MD5.
pub fn compute_public_key_token(public_key: &[u8], algo: u32) -> Result<u64> {
    match algo {
        AssemblyHashAlgorithm::MD5 => {
            let mut hasher = Md5::new();
            hasher.update(public_key);

            let result = hasher.finalize();

            read_le::<u64>(&result[result.len() - 8..])
        }
        AssemblyHashAlgorithm::SHA1 => {
            let mut hasher = Sha1::new();
            hasher.update(public_key);

            let result = hasher.finalize();

            read_le::<u64>(&result[result.len() - 8..])
        }
        _ => Err(Error::NotSupported),
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, sync::Arc};

    use super::*;
    use crate::{
        blob::ECMA_KEY,
        diagnostics::{DiagnosticCode, SIGNING_NOT_SUPPORTED},
        file::MemoryFileSystem,
        signing::{HostKey, HostSigningService, UnsupportedHost},
        test::{private_key_blob, public_key_blob, test_key_blob},
    };

    fn resolver_with(files: &[(&str, Vec<u8>)]) -> KeyResolver {
        let fs = MemoryFileSystem::new();
        for (path, data) in files {
            fs.insert(*path, data.clone());
        }
        KeyResolver::new(["/src"], Arc::new(fs)).unwrap()
    }

    #[test]
    fn none_is_empty() {
        let keys = KeyMaterial::none();
        assert!(keys.is_none());
        assert!(!keys.can_sign());
        assert!(!keys.can_provide_strong_name());
        assert_eq!(keys.public_key_token(AssemblyHashAlgorithm::SHA1).unwrap(), None);
    }

    #[test]
    fn file_with_public_key_only() {
        let public_key = public_key_blob(1024, 0x11);
        let resolver = resolver_with(&[("/src/public.snk", public_key.clone())]);
        let cache = KeyPairCache::new();

        let keys = KeyMaterial::from_file("public.snk", &resolver, &cache, false);
        assert_eq!(keys.public_key(), Some(public_key.as_slice()));
        assert_eq!(keys.key_pair(), None);
        assert!(!keys.can_sign());
        assert!(keys.can_provide_strong_name());
        assert_eq!(keys.key_file_path(), Some(Path::new("/src/public.snk")));
        assert!(cache.current().is_none());
    }

    #[test]
    fn file_with_key_pair() {
        let blob = test_key_blob();
        let resolver = resolver_with(&[("/src/key.snk", blob.clone())]);
        let cache = KeyPairCache::new();

        let keys = KeyMaterial::from_file("key.snk", &resolver, &cache, true);
        assert!(keys.diagnostic().is_none());
        assert_eq!(keys.key_pair(), Some(blob.as_slice()));
        assert!(keys.can_sign());
        assert!(keys.private_key().is_some());
        assert!(keys.has_counter_signature());
        assert!(is_valid_public_key(keys.public_key().unwrap()));
        assert_eq!(keys.signature_size(), 128);
    }

    #[test]
    fn truncated_private_section_still_signs() {
        let mut blob = private_key_blob(1024);
        blob.truncate(200);
        let resolver = resolver_with(&[("/src/key.snk", blob)]);

        let keys = KeyMaterial::from_file("key.snk", &resolver, &KeyPairCache::new(), false);
        assert!(keys.can_sign());
        assert!(keys.private_key().is_none());
    }

    #[test]
    fn missing_file() {
        let resolver = resolver_with(&[]);
        let keys = KeyMaterial::from_file("MyKey.snk", &resolver, &KeyPairCache::new(), false);

        let diagnostic = keys.diagnostic().unwrap();
        assert_eq!(diagnostic.code, DiagnosticCode::PublicKeyFileFailure);
        assert_eq!(diagnostic.arguments, vec!["MyKey.snk", FILE_NOT_FOUND]);
        assert!(!keys.can_provide_strong_name());
    }

    #[test]
    fn missing_absolute_file_reports_io_error() {
        let resolver = resolver_with(&[]);
        let keys = KeyMaterial::from_file("/keys/gone.snk", &resolver, &KeyPairCache::new(), false);

        let diagnostic = keys.diagnostic().unwrap();
        assert_eq!(diagnostic.arguments[0], "/keys/gone.snk");
        assert!(diagnostic.arguments[1].contains("/keys/gone.snk"));
    }

    #[test]
    fn invalid_content() {
        let resolver = resolver_with(&[("/src/bad.snk", vec![0x07; 40])]);
        let keys = KeyMaterial::from_file("bad.snk", &resolver, &KeyPairCache::new(), false);

        assert_eq!(
            keys.diagnostic().unwrap().arguments,
            vec!["bad.snk", INVALID_PUBLIC_KEY]
        );
        assert!(keys.public_key().is_none());
    }

    #[test]
    fn cache_skips_second_parse() {
        let blob = private_key_blob(1024);
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/src/key.snk", blob.clone());
        let resolver = KeyResolver::new(["/src"], fs.clone()).unwrap();
        let cache = KeyPairCache::new();
        let calls = Cell::new(0);
        let parse = |content: &[u8]| {
            calls.set(calls.get() + 1);
            try_parse_key(content)
        };

        let first = KeyMaterial::from_file_with_parser("key.snk", &resolver, &cache, false, parse);
        let second = KeyMaterial::from_file_with_parser("key.snk", &resolver, &cache, false, parse);
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);

        let mut changed = blob;
        changed[100] ^= 0xFF;
        fs.insert("/src/key.snk", changed);

        let third = KeyMaterial::from_file_with_parser("key.snk", &resolver, &cache, false, parse);
        assert_eq!(calls.get(), 2);
        assert_ne!(first.key_pair(), third.key_pair());
    }

    #[derive(Debug)]
    struct ContainerHost(Vec<u8>);

    impl HostSigningService for ContainerHost {
        fn public_key_from_container(&self, _container: &str) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }

        fn sign_file(&self, _path: &Path, _key: &HostKey<'_>) -> Result<()> {
            Err(Error::HostOperation("read-only host".to_string()))
        }
    }

    impl HostSigningProvider for ContainerHost {
        fn acquire(&self) -> Result<Box<dyn HostSigningService>> {
            Ok(Box::new(ContainerHost(self.0.clone())))
        }
    }

    #[test]
    fn container_from_host() {
        let public_key = public_key_blob(1024, 0x33);
        let host = ContainerHost(public_key.clone());

        let keys = KeyMaterial::from_container("TestContainer", &host, false);
        assert_eq!(keys.public_key(), Some(public_key.as_slice()));
        assert_eq!(keys.key_container(), Some("TestContainer"));
        assert!(keys.can_sign());
        assert!(keys.key_pair().is_none());
    }

    #[test]
    fn container_with_invalid_key() {
        let host = ContainerHost(vec![1, 2, 3]);
        let keys = KeyMaterial::from_container("TestContainer", &host, false);
        assert_eq!(
            keys.diagnostic().unwrap().arguments,
            vec!["TestContainer", INVALID_PUBLIC_KEY]
        );
    }

    #[test]
    fn container_without_host() {
        let keys = KeyMaterial::from_container("TestContainer", &UnsupportedHost, false);

        let diagnostic = keys.diagnostic().unwrap();
        assert_eq!(diagnostic.code, DiagnosticCode::PublicKeyContainerFailure);
        assert_eq!(diagnostic.arguments, vec!["TestContainer", SIGNING_NOT_SUPPORTED]);
        assert!(!keys.can_sign());
    }

    #[test]
    fn raw_public_key() {
        let public_key = public_key_blob(1024, 0x44);
        let keys = KeyMaterial::from_public_key(&public_key);
        assert!(keys.can_provide_strong_name());
        assert!(!keys.can_sign());

        let bad = KeyMaterial::from_public_key(&[1, 2, 3]);
        assert_eq!(
            bad.diagnostic().unwrap().message(),
            "Invalid 'CryptoPublicKey' value: '01-02-03'."
        );
    }

    #[test]
    fn ecma_token() {
        let keys = KeyMaterial::from_public_key(&ECMA_KEY);
        let token = keys
            .public_key_token(AssemblyHashAlgorithm::SHA1)
            .unwrap()
            .unwrap();
        assert_eq!(format!("{:016x}", token), "b77a5c561934e089");
        assert!(matches!(
            keys.public_key_token(0x800C),
            Err(Error::NotSupported)
        ));
        assert!(keys.public_key_token(AssemblyHashAlgorithm::MD5).is_ok());
    }

    #[test]
    fn signature_sizes() {
        assert_eq!(KeyMaterial::from_public_key(&ECMA_KEY).signature_size(), 128);
        assert_eq!(
            KeyMaterial::from_public_key(&public_key_blob(2048, 1)).signature_size(),
            256
        );
        assert_eq!(
            KeyMaterial::from_public_key(&public_key_blob(4096, 1)).signature_size(),
            512
        );
    }
}
