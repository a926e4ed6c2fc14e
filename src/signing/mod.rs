//! Signing strategies.
//!
//! Output is strong-name signed in one of two ways:
//!
//! - [`HostSigner`] finishes the file first and asks a host signing service to sign it in
//!   place. It can use key containers, but depends on the platform providing such a service.
//! - [`EmbeddedSigner`] computes the RSA signature in-process while the image is still being
//!   built, through [`SignableContent`]. It needs the private key from a key file.
//!
//! [`SigningStrategy`] is the closed choice between the two. [`SigningRequest`] drives one
//! signing operation through its states and turns failures into diagnostics.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotsign::{
//!     file::PhysicalFileSystem,
//!     signing::{ReservedSignatureImage, SigningStrategy},
//!     SigningOptions,
//! };
//!
//! let options = SigningOptions::default()
//!     .with_key_file("key.snk")
//!     .with_search_paths(["/src/app"]);
//! let strategy = SigningStrategy::embedded(options.key_resolver(PhysicalFileSystem::shared())?);
//!
//! let keys = strategy.resolve_keys_for(&options)?;
//! if let Some(private_key) = keys.private_key() {
//!     let mut image = ReservedSignatureImage::new(vec![0; 1024], 512, keys.signature_size())?;
//!     strategy.sign_content(&mut image, private_key)?;
//! }
//! # Ok::<(), dotsign::Error>(())
//! ```

mod embedded;
mod host;
mod image;
mod request;

pub use embedded::{calculate_rsa_signature, verify_rsa_signature, EmbeddedSigner};
pub use host::{HostKey, HostSigner, HostSigningProvider, HostSigningService, UnsupportedHost};
pub use image::{ReservedSignatureImage, SignableContent};
pub use request::{SigningRequest, SigningState};

use std::{io::Write, path::Path, sync::Arc};

use strum::Display;

use crate::{
    blob::RsaParameters, config::SigningOptions, file::KeyResolver, keys::KeyMaterial, Error,
    Result,
};

/// How a strategy applies signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SigningCapability {
    /// Signs finished files or streams
    SignsStream,
    /// Signs content while it is being built
    SignsPeBuilder,
}

/// The signing strategy used for an output.
///
/// Strategies are equal when they are the same variant with equal search paths and the same
/// filesystem instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SigningStrategy {
    /// Sign through a host signing service
    Host(HostSigner),
    /// Sign in-process while building
    Embedded(EmbeddedSigner),
}

impl SigningStrategy {
    /// A host strategy over `resolver` and `provider`.
    pub fn host(resolver: KeyResolver, provider: Arc<dyn HostSigningProvider>) -> SigningStrategy {
        SigningStrategy::Host(HostSigner::new(resolver, provider))
    }

    /// An embedded strategy over `resolver`.
    pub fn embedded(resolver: KeyResolver) -> SigningStrategy {
        SigningStrategy::Embedded(EmbeddedSigner::new(resolver))
    }

    /// How this strategy applies signatures.
    pub fn capability(&self) -> SigningCapability {
        match self {
            SigningStrategy::Host(_) => SigningCapability::SignsStream,
            SigningStrategy::Embedded(_) => SigningCapability::SignsPeBuilder,
        }
    }

    /// The key file resolver.
    pub fn resolver(&self) -> &KeyResolver {
        match self {
            SigningStrategy::Host(signer) => signer.resolver(),
            SigningStrategy::Embedded(signer) => signer.resolver(),
        }
    }

    /// Resolve key material from a key file or, failing that, a key container.
    ///
    /// A key file takes priority when both are given. Empty names count as absent.
    pub fn resolve_keys(
        &self,
        key_file: Option<&str>,
        key_container: Option<&str>,
        has_counter_signature: bool,
    ) -> KeyMaterial {
        match self {
            SigningStrategy::Host(signer) => {
                signer.resolve_keys(key_file, key_container, has_counter_signature)
            }
            SigningStrategy::Embedded(signer) => {
                signer.resolve_keys(key_file, key_container, has_counter_signature)
            }
        }
    }

    /// Resolve the key material described by `options`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if the options are contradictory.
    pub fn resolve_keys_for(&self, options: &SigningOptions) -> Result<KeyMaterial> {
        options.validate()?;

        if let Some(public_key) = &options.public_key {
            return Ok(KeyMaterial::from_public_key(public_key));
        }

        Ok(self.resolve_keys(
            options.key_file_name(),
            options.key_container_name(),
            options.has_counter_signature,
        ))
    }

    /// Sign the finished file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for the embedded strategy, otherwise the errors of
    /// [`HostSigner::sign_file`].
    pub fn sign_file(&self, keys: &KeyMaterial, path: &Path) -> Result<()> {
        match self {
            SigningStrategy::Host(signer) => signer.sign_file(keys, path),
            SigningStrategy::Embedded(_) => Err(Error::NotSupported),
        }
    }

    /// Sign `content` and write the signed bytes to `output`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for the embedded strategy, otherwise the errors of
    /// [`HostSigner::sign_stream`].
    pub fn sign_stream(
        &self,
        keys: &KeyMaterial,
        content: &[u8],
        output: &mut dyn Write,
    ) -> Result<()> {
        match self {
            SigningStrategy::Host(signer) => signer.sign_stream(keys, content, output),
            SigningStrategy::Embedded(_) => Err(Error::NotSupported),
        }
    }

    /// Let `content` sign itself with `private_key`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for the host strategy, otherwise the errors of
    /// [`EmbeddedSigner::sign_content`].
    pub fn sign_content(
        &self,
        content: &mut dyn SignableContent,
        private_key: &RsaParameters,
    ) -> Result<()> {
        match self {
            SigningStrategy::Host(_) => Err(Error::NotSupported),
            SigningStrategy::Embedded(signer) => signer.sign_content(content, private_key),
        }
    }
}

impl Default for SigningStrategy {
    fn default() -> Self {
        SigningStrategy::Host(HostSigner::default())
    }
}

impl From<HostSigner> for SigningStrategy {
    fn from(signer: HostSigner) -> Self {
        SigningStrategy::Host(signer)
    }
}

impl From<EmbeddedSigner> for SigningStrategy {
    fn from(signer: EmbeddedSigner) -> Self {
        SigningStrategy::Embedded(signer)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::hash_map::DefaultHasher,
        hash::{Hash, Hasher},
    };

    use super::*;
    use crate::{
        blob::ECMA_KEY,
        diagnostics::DiagnosticCode,
        file::{KeyFileSystem, MemoryFileSystem},
    };

    fn hash_of(strategy: &SigningStrategy) -> u64 {
        let mut hasher = DefaultHasher::new();
        strategy.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn capabilities() {
        let resolver = KeyResolver::default();
        assert_eq!(
            SigningStrategy::embedded(resolver.clone()).capability(),
            SigningCapability::SignsPeBuilder
        );
        assert_eq!(
            SigningStrategy::host(resolver, Arc::new(UnsupportedHost)).capability(),
            SigningCapability::SignsStream
        );
    }

    #[test]
    fn equality_and_hash() {
        let fs: Arc<dyn KeyFileSystem> = Arc::new(MemoryFileSystem::new());
        let resolver = KeyResolver::new(["/a", "/b"], fs.clone()).unwrap();

        let a = SigningStrategy::embedded(resolver.clone());
        let b = SigningStrategy::embedded(KeyResolver::new(["/a", "/b"], fs).unwrap());
        let host = SigningStrategy::host(resolver, Arc::new(UnsupportedHost));

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, host);
    }

    #[test]
    fn unsupported_operations() {
        let keys = KeyMaterial::none();
        let embedded = SigningStrategy::embedded(KeyResolver::default());
        assert!(matches!(
            embedded.sign_file(&keys, Path::new("/out.dll")),
            Err(Error::NotSupported)
        ));
        assert!(matches!(
            embedded.sign_stream(&keys, b"image", &mut Vec::new()),
            Err(Error::NotSupported)
        ));

        let host = SigningStrategy::default();
        let mut image = ReservedSignatureImage::new(vec![0; 8], 0, 4).unwrap();
        let params = RsaParameters {
            exponent: vec![3],
            modulus: vec![0xFF; 64],
            p: Vec::new(),
            q: Vec::new(),
            dp: Vec::new(),
            dq: Vec::new(),
            inverse_q: Vec::new(),
            d: Vec::new(),
        };
        assert!(matches!(
            host.sign_content(&mut image, &params),
            Err(Error::NotSupported)
        ));
    }

    #[test]
    fn empty_names_are_absent() {
        let fs = Arc::new(MemoryFileSystem::new());
        let resolver = KeyResolver::new(["/src"], fs).unwrap();

        for strategy in [
            SigningStrategy::embedded(resolver.clone()),
            SigningStrategy::host(resolver.clone(), Arc::new(UnsupportedHost)),
        ] {
            assert!(strategy.resolve_keys(Some(""), None, false).is_none());
            assert!(strategy.resolve_keys(None, Some(""), false).is_none());
            assert!(strategy.resolve_keys(Some(""), Some(""), false).is_none());

            let options = SigningOptions::default()
                .with_key_file("")
                .with_key_container("");
            assert!(strategy.resolve_keys_for(&options).unwrap().is_none());
        }
    }

    #[test]
    fn empty_key_file_falls_back_to_container() {
        let strategy = SigningStrategy::default();
        let keys = strategy.resolve_keys(Some(""), Some("BuildKeys"), false);

        let diagnostic = keys.diagnostic().unwrap();
        assert_eq!(diagnostic.code, DiagnosticCode::PublicKeyContainerFailure);
        assert_eq!(diagnostic.arguments[0], "BuildKeys");
    }

    #[test]
    fn options_with_public_key() {
        let strategy = SigningStrategy::default();
        let options = SigningOptions::default()
            .with_public_key(ECMA_KEY)
            .with_public_sign(true);

        let keys = strategy.resolve_keys_for(&options).unwrap();
        assert_eq!(keys.public_key(), Some(&ECMA_KEY[..]));

        let conflicting = options.with_key_file("key.snk");
        assert!(matches!(
            strategy.resolve_keys_for(&conflicting),
            Err(Error::Configuration(_))
        ));
    }
}
