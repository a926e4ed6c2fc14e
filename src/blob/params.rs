//! RSA parameter sets extracted from key blobs.
//!
//! Key blobs store every number little-endian; the parameter sets here hold them big-endian,
//! which is what the `rsa` crate (and every other consumer of raw RSA numbers) expects.

use std::fmt;

use rsa::{
    traits::{PrivateKeyParts, PublicKeyParts},
    BigUint, RsaPrivateKey, RsaPublicKey,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, Result};

/// Public RSA parameters, big-endian.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RsaPublicParameters {
    /// Public exponent
    pub exponent: Vec<u8>,
    /// Modulus
    pub modulus: Vec<u8>,
}

impl RsaPublicParameters {
    /// Convert into an [`RsaPublicKey`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Crypto`] if the numbers do not form a valid public key.
    pub fn to_public_key(&self) -> Result<RsaPublicKey> {
        RsaPublicKey::new(
            BigUint::from_bytes_be(&self.modulus),
            BigUint::from_bytes_be(&self.exponent),
        )
        .map_err(|error| Error::Crypto(error.to_string()))
    }
}

/// A full RSA private key, big-endian, as derived from a private key blob.
///
/// The buffers are wiped when the value is dropped, and the [`fmt::Debug`] output never
/// includes private components.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RsaParameters {
    /// Public exponent
    pub exponent: Vec<u8>,
    /// Modulus
    pub modulus: Vec<u8>,
    /// First prime
    pub p: Vec<u8>,
    /// Second prime
    pub q: Vec<u8>,
    /// `d mod (p - 1)`
    pub dp: Vec<u8>,
    /// `d mod (q - 1)`
    pub dq: Vec<u8>,
    /// `q^-1 mod p`
    pub inverse_q: Vec<u8>,
    /// Private exponent
    pub d: Vec<u8>,
}

impl RsaParameters {
    /// The public half of this key.
    pub fn public_parameters(&self) -> RsaPublicParameters {
        RsaPublicParameters {
            exponent: self.exponent.clone(),
            modulus: self.modulus.clone(),
        }
    }

    /// Size of the modulus in bytes, ignoring leading zero bytes.
    pub fn modulus_len(&self) -> usize {
        self.modulus.iter().skip_while(|byte| **byte == 0).count()
    }

    /// Build an [`RsaPrivateKey`] from the stored components.
    ///
    /// # Errors
    /// Returns [`crate::Error::Crypto`] if the components are inconsistent.
    pub fn to_private_key(&self) -> Result<RsaPrivateKey> {
        let key = RsaPrivateKey::from_components(
            BigUint::from_bytes_be(&self.modulus),
            BigUint::from_bytes_be(&self.exponent),
            BigUint::from_bytes_be(&self.d),
            vec![
                BigUint::from_bytes_be(&self.p),
                BigUint::from_bytes_be(&self.q),
            ],
        )
        .map_err(|error| Error::Crypto(error.to_string()))?;

        key.validate()
            .map_err(|error| Error::Crypto(error.to_string()))?;
        Ok(key)
    }

    /// Capture the components of a two-prime [`RsaPrivateKey`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Crypto`] for multi-prime keys or keys without precomputed
    /// CRT values.
    pub fn from_private_key(key: &RsaPrivateKey) -> Result<RsaParameters> {
        let [p, q] = key.primes() else {
            return Err(Error::Crypto(format!(
                "expected a two-prime key, found {} primes",
                key.primes().len()
            )));
        };

        let (Some(dp), Some(dq), Some(inverse_q)) = (key.dp(), key.dq(), key.crt_coefficient())
        else {
            return Err(Error::Crypto("key has no precomputed CRT values".to_string()));
        };

        Ok(RsaParameters {
            exponent: key.e().to_bytes_be(),
            modulus: key.n().to_bytes_be(),
            p: p.to_bytes_be(),
            q: q.to_bytes_be(),
            dp: dp.to_bytes_be(),
            dq: dq.to_bytes_be(),
            inverse_q: inverse_q.to_bytes_be(),
            d: key.d().to_bytes_be(),
        })
    }
}

impl fmt::Debug for RsaParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaParameters")
            .field("exponent", &self.exponent)
            .field("modulus_bits", &(self.modulus_len() * 8))
            .finish_non_exhaustive()
    }
}
