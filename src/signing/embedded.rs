//! Signing inside the image builder.
//!
//! [`EmbeddedSigner`] never touches the output file. It hands the builder a signing function,
//! which the builder calls exactly once with the finished bytes to be signed; the returned
//! signature is written into the region the builder reserved for it.
//!
//! Strong-name signatures are RSASSA-PKCS1-v1_5 over SHA-1, stored little-endian: the
//! big-endian output of the RSA primitive is reversed before it is written.

use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};

use rsa::{
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    signature::{SignatureEncoding, Signer, Verifier},
    RsaPrivateKey,
};
use sha1::Sha1;

use super::SignableContent;
use crate::{
    blob::{public_parameters, RsaParameters},
    diagnostics::{Diagnostic, SIGNING_NOT_SUPPORTED},
    file::KeyResolver,
    keys::{non_empty, KeyMaterial, KeyPairCache},
    Error, Result,
};

/// Computes strong-name signatures in-process from a private key.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSigner {
    resolver: KeyResolver,
    cache: Arc<KeyPairCache>,
}

impl EmbeddedSigner {
    /// Create a signer resolving key files through `resolver`.
    pub fn new(resolver: KeyResolver) -> EmbeddedSigner {
        EmbeddedSigner {
            resolver,
            cache: Arc::new(KeyPairCache::new()),
        }
    }

    /// Use `cache` for key pair memoization instead of a private one.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<KeyPairCache>) -> EmbeddedSigner {
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

    /// Resolve key material from a key file.
    ///
    /// Key containers live in a host service this signer cannot reach, so naming one yields
    /// an "Assembly signing not supported." diagnostic. Empty names count as absent.
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
            (None, Some(container)) => KeyMaterial::from_diagnostic(
                Diagnostic::public_key_container_failure(container, SIGNING_NOT_SUPPORTED),
            ),
            (None, None) => KeyMaterial::none(),
        }
    }

    /// Let `content` sign itself with `private_key`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Crypto`] if the key is inconsistent or signing fails, and any
    /// error raised by `content`.
    pub fn sign_content(
        &self,
        content: &mut dyn SignableContent,
        private_key: &RsaParameters,
    ) -> Result<()> {
        let key = private_key.to_private_key()?;
        content.sign_content(&mut |bytes: &[u8]| sign_with_key(bytes, &key))
    }
}

impl PartialEq for EmbeddedSigner {
    fn eq(&self, other: &Self) -> bool {
        self.resolver == other.resolver
    }
}

impl Eq for EmbeddedSigner {}

impl Hash for EmbeddedSigner {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resolver.hash(state);
    }
}

/// Compute the strong-name signature of `content`.
///
/// # Errors
/// Returns [`crate::Error::Crypto`] if the key is inconsistent or too small for a SHA-1
/// PKCS#1 v1.5 signature.
pub fn calculate_rsa_signature(content: &[u8], private_key: &RsaParameters) -> Result<Vec<u8>> {
    let key = private_key.to_private_key()?;
    sign_with_key(content, &key)
}

fn sign_with_key(content: &[u8], key: &RsaPrivateKey) -> Result<Vec<u8>> {
    let signing_key = SigningKey::<Sha1>::new(key.clone());
    let signature = signing_key
        .try_sign(content)
        .map_err(|error| Error::Crypto(error.to_string()))?;

    let mut signature = signature.to_vec();
    signature.reverse();
    Ok(signature)
}

/// Check a stored strong-name signature against a canonical public key.
///
/// Returns `Ok(false)` for a well-formed signature that does not match.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `public_key` carries no RSA numbers, and
/// [`crate::Error::Crypto`] if they do not form a usable key.
pub fn verify_rsa_signature(public_key: &[u8], content: &[u8], signature: &[u8]) -> Result<bool> {
    let Some(parameters) = public_parameters(public_key) else {
        return Err(malformed_error!("public key carries no RSA parameters"));
    };

    let verifying_key = VerifyingKey::<Sha1>::new(parameters.to_public_key()?);
    let big_endian: Vec<u8> = signature.iter().rev().copied().collect();
    let Ok(signature) = Signature::try_from(big_endian.as_slice()) else {
        return Ok(false);
    };

    Ok(verifying_key.verify(content, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blob::{try_parse_key, ECMA_KEY},
        file::MemoryFileSystem,
        signing::ReservedSignatureImage,
        test::test_key_blob,
    };

    fn key_pair() -> (Vec<u8>, RsaParameters) {
        let parsed = try_parse_key(&test_key_blob()).unwrap();
        let private_key = parsed.private_key.clone().unwrap();
        (parsed.public_key, private_key)
    }

    #[test]
    fn signature_round_trip() {
        let (public_key, private_key) = key_pair();
        let signature = calculate_rsa_signature(b"assembly bytes", &private_key).unwrap();

        assert_eq!(signature.len(), 128);
        assert!(verify_rsa_signature(&public_key, b"assembly bytes", &signature).unwrap());
        assert!(!verify_rsa_signature(&public_key, b"tampered bytes", &signature).unwrap());
    }

    #[test]
    fn signature_is_stored_reversed() {
        let (public_key, private_key) = key_pair();
        let mut signature = calculate_rsa_signature(b"content", &private_key).unwrap();
        signature.reverse();
        assert!(!verify_rsa_signature(&public_key, b"content", &signature).unwrap());
    }

    #[test]
    fn ecma_key_cannot_verify() {
        assert!(matches!(
            verify_rsa_signature(&ECMA_KEY, b"content", &[0; 128]),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn sign_content_fills_reserved_region() {
        let (public_key, private_key) = key_pair();
        let mut image = ReservedSignatureImage::new(vec![0x5A; 512], 256, 128).unwrap();

        EmbeddedSigner::default()
            .sign_content(&mut image, &private_key)
            .unwrap();

        assert!(image.is_signed());
        let signed = image.signed_content();
        assert!(verify_rsa_signature(&public_key, &signed, image.signature()).unwrap());
    }

    #[test]
    fn container_not_supported() {
        let signer = EmbeddedSigner::default();
        let keys = signer.resolve_keys(None, Some("Container"), false);
        assert_eq!(keys.diagnostic().unwrap().arguments[1], SIGNING_NOT_SUPPORTED);
    }

    #[test]
    fn resolves_key_file() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/keys/key.snk", test_key_blob());
        let signer = EmbeddedSigner::new(KeyResolver::new(["/keys"], fs).unwrap());

        let keys = signer.resolve_keys(Some("key.snk"), None, false);
        assert!(keys.private_key().is_some());
        assert_eq!(signer.cache().misses(), 1);

        signer.resolve_keys(Some("key.snk"), None, false);
        assert_eq!(signer.cache().hits(), 1);
    }
}
