//! Signing through a host-provided strong-name service.
//!
//! Some platforms ship a native service that can read key containers and sign files in place.
//! This crate does not bind to any such service; it defines the narrow capability it needs
//! ([`HostSigningProvider`] / [`HostSigningService`]) and ships [`UnsupportedHost`], which is
//! never available. Embedders with access to a real service plug it in through
//! [`HostSigner::new`].
//!
//! A provider is asked for a fresh service on every call. Failing to obtain one is
//! [`Error::HostUnavailable`], an ordinary outcome that callers present as "not supported on
//! this platform"; a failure of the service itself is [`Error::HostOperation`].

use std::{
    fmt,
    hash::{Hash, Hasher},
    io::Write,
    path::Path,
    sync::Arc,
};

use log::{debug, warn};

use crate::{
    file::KeyResolver,
    keys::{non_empty, KeyMaterial, KeyPairCache},
    Error, Result,
};

/// The key a host service signs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKey<'a> {
    /// A key container held by the host
    Container(&'a str),
    /// The raw content of a key pair file
    KeyPair(&'a [u8]),
}

/// Operations offered by an acquired host signing service.
pub trait HostSigningService {
    /// Fetch the canonical public key of a key container.
    ///
    /// # Errors
    /// Returns [`crate::Error::HostOperation`] if the container is unknown or unreadable.
    fn public_key_from_container(&self, container: &str) -> Result<Vec<u8>>;

    /// Sign the file at `path` in place.
    ///
    /// # Errors
    /// Returns [`crate::Error::HostOperation`] if the service fails to sign.
    fn sign_file(&self, path: &Path, key: &HostKey<'_>) -> Result<()>;
}

/// Source of host signing services.
pub trait HostSigningProvider: Send + Sync + fmt::Debug {
    /// Acquire a service for one operation.
    ///
    /// # Errors
    /// Returns [`crate::Error::HostUnavailable`] if the platform has no signing service.
    fn acquire(&self) -> Result<Box<dyn HostSigningService>>;
}

/// The provider used when no host service is configured; always unavailable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedHost;

impl HostSigningProvider for UnsupportedHost {
    fn acquire(&self) -> Result<Box<dyn HostSigningService>> {
        warn!("no strong-name signing service is available on this host");
        Err(Error::HostUnavailable)
    }
}

/// Signs finished files through a host signing service.
///
/// Two signers are equal when their resolvers are equal; the provider and the cache do not
/// take part.
///
/// # Examples
///
/// ```rust,no_run
/// use dotsign::HostSigner;
/// use std::path::Path;
///
/// let signer = HostSigner::default();
/// let keys = signer.resolve_keys(None, Some("MyContainer"), false);
/// assert!(keys.diagnostic().is_some());
///
/// let result = signer.sign_file(&keys, Path::new("out.dll"));
/// assert!(result.is_err());
/// ```
#[derive(Debug, Clone)]
pub struct HostSigner {
    resolver: KeyResolver,
    provider: Arc<dyn HostSigningProvider>,
    cache: Arc<KeyPairCache>,
}

impl HostSigner {
    /// Create a signer resolving key files through `resolver` and signing through `provider`.
    pub fn new(resolver: KeyResolver, provider: Arc<dyn HostSigningProvider>) -> HostSigner {
        HostSigner {
            resolver,
            provider,
            cache: Arc::new(KeyPairCache::new()),
        }
    }

    /// Use `cache` for key pair memoization instead of a private one.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<KeyPairCache>) -> HostSigner {
        self.cache = cache;
        self
    }

    /// The key file resolver.
    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    /// The key pair cache.
    pub fn cache(&self) -> &Arc<KeyPairCache> {
        &self.cache
    }

    /// Resolve key material from a key file or, if none is given, a key container.
    ///
    /// Empty names count as absent.
    pub fn resolve_keys(
        &self,
        key_file: Option<&str>,
        key_container: Option<&str>,
        has_counter_signature: bool,
    ) -> KeyMaterial {
        match (non_empty(key_file), non_empty(key_container)) {
            (Some(key_file), _) => KeyMaterial::from_file(
                key_file,
                &self.resolver,
                &self.cache,
                has_counter_signature,
            ),
            (None, Some(container)) => {
                KeyMaterial::from_container(container, self.provider.as_ref(), has_counter_signature)
            }
            (None, None) => KeyMaterial::none(),
        }
    }

    /// Sign the file at `path` in place with the key pair or container of `keys`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if `keys` cannot sign,
    /// [`crate::Error::HostUnavailable`] if no service can be acquired and
    /// [`crate::Error::HostOperation`] if the service fails.
    pub fn sign_file(&self, keys: &KeyMaterial, path: &Path) -> Result<()> {
        let key = if let Some(key_pair) = keys.key_pair() {
            HostKey::KeyPair(key_pair)
        } else if let Some(container) = keys.key_container() {
            HostKey::Container(container)
        } else {
            return Err(Error::Configuration(
                "key material holds neither a key pair nor a key container".to_string(),
            ));
        };

        let service = self.provider.acquire()?;
        debug!("signing '{}' through the host service", path.display());
        service.sign_file(path, &key)
    }

    /// Sign `content` and write the signed bytes to `output`.
    ///
    /// The content is staged in a temporary file under the filesystem's temp directory, signed
    /// in place, and copied out. The temporary file is removed afterwards.
    ///
    /// # Errors
    /// Returns [`crate::Error::SigningTempPathUnavailable`] if the filesystem has no temp
    /// directory, [`crate::Error::FileError`] for temporary file or output failures, and the
    /// errors of [`HostSigner::sign_file`].
    pub fn sign_stream(
        &self,
        keys: &KeyMaterial,
        content: &[u8],
        output: &mut dyn Write,
    ) -> Result<()> {
        let temp_dir = self
            .resolver
            .file_system()
            .temp_path()
            .ok_or(Error::SigningTempPathUnavailable)?;
        let mut staged = tempfile::Builder::new()
            .prefix("dotsign-")
            .suffix(".tmp")
            .tempfile_in(&temp_dir)?;

        staged.write_all(content)?;
        staged.flush()?;

        self.sign_file(keys, staged.path())?;

        let signed = std::fs::read(staged.path())?;
        output.write_all(&signed)?;
        Ok(())
    }
}

impl Default for HostSigner {
    fn default() -> Self {
        HostSigner::new(KeyResolver::default(), Arc::new(UnsupportedHost))
    }
}

impl PartialEq for HostSigner {
    fn eq(&self, other: &Self) -> bool {
        self.resolver == other.resolver
    }
}

impl Eq for HostSigner {}

impl Hash for HostSigner {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resolver.hash(state);
    }
}
