//! Validation and conversion of key blobs.
//!
//! Every function in this module is total over arbitrary input: malformed, truncated and
//! adversarial buffers are answered with `false` / `None`, never with a panic. Headers are read
//! field by field through [`crate::file::io`], so every access is bounds-checked.

use log::trace;

use super::{
    algorithm::AlgorithmId,
    params::{RsaParameters, RsaPublicParameters},
    ECMA_KEY, MAX_KEY_BITS, OFFSET_TO_KEY_DATA, PRIVATE_KEY_BLOB_ID, PUBLIC_KEY_BLOB_ID,
    PUBLIC_KEY_HEADER_SIZE, RSA1_MAGIC, RSA2_MAGIC,
};
use crate::{
    file::io::{read_bytes_at, read_le_at, write_bytes_at, write_le_at},
    Result,
};

/// The 12-byte header that precedes the embedded blob of a canonical public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyHeader {
    /// Signature algorithm of the key
    pub sig_alg_id: AlgorithmId,
    /// Hash algorithm used with the key
    pub hash_alg_id: AlgorithmId,
    /// Byte length of the embedded blob
    pub public_key_size: u32,
}

impl PublicKeyHeader {
    /// Read the header at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 12 bytes remain.
    pub fn read(data: &[u8], offset: &mut usize) -> Result<PublicKeyHeader> {
        Ok(PublicKeyHeader {
            sig_alg_id: AlgorithmId::new(read_le_at(data, offset)?),
            hash_alg_id: AlgorithmId::new(read_le_at(data, offset)?),
            public_key_size: read_le_at(data, offset)?,
        })
    }
}

/// The 8-byte `BLOBHEADER` that starts every raw key blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHeader {
    /// Blob type, `0x06` for public keys and `0x07` for key pairs
    pub blob_type: u8,
    /// Blob format version
    pub version: u8,
    /// Reserved, written as zero
    pub reserved: u16,
    /// Key algorithm
    pub alg_id: AlgorithmId,
}

impl BlobHeader {
    /// Read the header at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 8 bytes remain.
    pub fn read(data: &[u8], offset: &mut usize) -> Result<BlobHeader> {
        Ok(BlobHeader {
            blob_type: read_le_at(data, offset)?,
            version: read_le_at(data, offset)?,
            reserved: read_le_at(data, offset)?,
            alg_id: AlgorithmId::new(read_le_at(data, offset)?),
        })
    }
}

/// The 12-byte `RSAPUBKEY` block following a [`BlobHeader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsaPubKey {
    /// `RSA1` for public keys, `RSA2` for key pairs
    pub magic: u32,
    /// Modulus length in bits
    pub bit_len: u32,
    /// Public exponent
    pub pub_exp: u32,
}

impl RsaPubKey {
    /// Read the block at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 12 bytes remain.
    pub fn read(data: &[u8], offset: &mut usize) -> Result<RsaPubKey> {
        Ok(RsaPubKey {
            magic: read_le_at(data, offset)?,
            bit_len: read_le_at(data, offset)?,
            pub_exp: read_le_at(data, offset)?,
        })
    }

    /// Modulus length in bytes, if the bit length is usable.
    ///
    /// The bit length must be a nonzero multiple of 8 and no larger than
    /// [`MAX_KEY_BITS`](super::MAX_KEY_BITS). A zero bit length is rejected as well, so a blob
    /// with an empty modulus never yields a public key.
    pub fn modulus_len(&self) -> Option<usize> {
        if self.bit_len == 0 || self.bit_len % 8 != 0 || self.bit_len > MAX_KEY_BITS {
            return None;
        }
        usize::try_from(self.bit_len / 8).ok()
    }

    /// Length in bytes of each of the five half-size private components.
    pub fn half_len(&self) -> usize {
        ((self.bit_len as usize) + 15) / 16
    }
}

/// Result of [`try_parse_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    /// The canonical public key
    pub public_key: Vec<u8>,
    /// Private parameters, present only for complete private key blobs
    pub private_key: Option<RsaParameters>,
}

/// Checks whether `blob` is a canonical public key.
///
/// # Rules
/// 1. The blob is at least 13 bytes long
/// 2. The declared size matches the number of bytes following the 12-byte header
/// 3. The ECMA key is accepted at this point without further checks
/// 4. The embedded blob is a public key blob (`0x06`)
/// 5. A nonzero signature algorithm has the signature class
/// 6. A nonzero hash algorithm has the hash class and is at least SHA-1
///
/// # Examples
///
/// ```rust
/// use dotsign::blob::{is_valid_public_key, ECMA_KEY};
///
/// assert!(is_valid_public_key(&ECMA_KEY));
/// assert!(!is_valid_public_key(&[0u8; 12]));
/// ```
pub fn is_valid_public_key(blob: &[u8]) -> bool {
    if blob.len() < PUBLIC_KEY_HEADER_SIZE + 1 {
        return false;
    }

    let mut offset = 0;
    let Ok(header) = PublicKeyHeader::read(blob, &mut offset) else {
        return false;
    };

    let declared = header.public_key_size as usize;
    if blob.len() - PUBLIC_KEY_HEADER_SIZE != declared {
        return false;
    }

    if blob == ECMA_KEY {
        return true;
    }

    if blob[PUBLIC_KEY_HEADER_SIZE] != PUBLIC_KEY_BLOB_ID {
        return false;
    }

    header.sig_alg_id.is_valid_signature_algorithm() && header.hash_alg_id.is_valid_hash_algorithm()
}

/// Extracts the canonical public key from `blob`.
///
/// - A blob that already is a canonical public key is returned unchanged
/// - A raw key pair blob (`0x07` / `RSA2`) yields the public half; anything after the modulus
///   is ignored
/// - A raw public key blob (`0x06` / `RSA1`) must hold exactly the modulus after its header
///
/// Returns `None` for anything else.
///
/// # Examples
///
/// ```rust
/// use dotsign::blob::try_extract_public_key;
///
/// let mut raw = vec![0x06, 0x02, 0x00, 0x00, 0x00, 0x24, 0x00, 0x00];
/// raw.extend_from_slice(b"RSA1");
/// raw.extend_from_slice(&64u32.to_le_bytes());
/// raw.extend_from_slice(&65537u32.to_le_bytes());
/// raw.extend_from_slice(&[0xA5; 8]);
///
/// let public_key = try_extract_public_key(&raw).unwrap();
/// assert_eq!(public_key.len(), 12 + raw.len());
/// assert_eq!(&public_key[12..], &raw[..]);
/// ```
pub fn try_extract_public_key(blob: &[u8]) -> Option<Vec<u8>> {
    parse_key(blob, false).map(|parsed| parsed.public_key)
}

/// Extracts the canonical public key and, for complete private key blobs, the private
/// parameters.
///
/// A key pair whose private section is shorter than the full layout still yields its public
/// key, with `private_key` set to `None`.
pub fn try_parse_key(blob: &[u8]) -> Option<ParsedKey> {
    parse_key(blob, true)
}

/// Public parameters of a canonical public key.
///
/// Returns `None` for invalid blobs and for the ECMA key, which has no RSA numbers.
pub fn public_parameters(public_key: &[u8]) -> Option<RsaPublicParameters> {
    if !is_valid_public_key(public_key) || public_key == ECMA_KEY {
        return None;
    }

    let mut offset = PUBLIC_KEY_HEADER_SIZE;
    let header = BlobHeader::read(public_key, &mut offset).ok()?;
    let rsa = RsaPubKey::read(public_key, &mut offset).ok()?;
    if header.blob_type != PUBLIC_KEY_BLOB_ID || rsa.magic != RSA1_MAGIC {
        return None;
    }

    let modulus_len = rsa.modulus_len()?;
    if public_key.len() - offset != modulus_len {
        return None;
    }

    let modulus = read_bytes_at(public_key, &mut offset, modulus_len).ok()?;
    Some(RsaPublicParameters {
        exponent: exponent_bytes(rsa.pub_exp),
        modulus: reversed(modulus),
    })
}

fn parse_key(blob: &[u8], with_private: bool) -> Option<ParsedKey> {
    if is_valid_public_key(blob) {
        return Some(ParsedKey {
            public_key: blob.to_vec(),
            private_key: None,
        });
    }

    if blob.len() < OFFSET_TO_KEY_DATA {
        trace!("key blob of {} bytes is too short", blob.len());
        return None;
    }

    let mut offset = 0;
    let header = BlobHeader::read(blob, &mut offset).ok()?;
    let rsa = RsaPubKey::read(blob, &mut offset).ok()?;
    let Some(modulus_len) = rsa.modulus_len() else {
        trace!("key blob has unusable bit length {}", rsa.bit_len);
        return None;
    };

    let remaining = blob.len() - OFFSET_TO_KEY_DATA;
    let private_key = match (header.blob_type, rsa.magic) {
        (PRIVATE_KEY_BLOB_ID, RSA2_MAGIC) if remaining >= modulus_len => {
            if with_private {
                read_private_parameters(blob, &rsa, modulus_len)
            } else {
                None
            }
        }
        (PUBLIC_KEY_BLOB_ID, RSA1_MAGIC) if remaining == modulus_len => None,
        (blob_type, magic) => {
            trace!(
                "rejecting key blob: type 0x{:02X}, magic 0x{:08X}, {} of {} modulus bytes",
                blob_type,
                magic,
                remaining,
                modulus_len
            );
            return None;
        }
    };

    let mut offset = OFFSET_TO_KEY_DATA;
    let modulus = read_bytes_at(blob, &mut offset, modulus_len).ok()?;
    let public_key = build_public_key(
        header.version,
        header.alg_id,
        rsa.bit_len,
        rsa.pub_exp,
        modulus,
    )
    .ok()?;

    Some(ParsedKey {
        public_key,
        private_key,
    })
}

/// Lay out a canonical public key around a little-endian `modulus`.
pub(crate) fn build_public_key(
    version: u8,
    alg_id: AlgorithmId,
    bit_len: u32,
    pub_exp: u32,
    modulus: &[u8],
) -> Result<Vec<u8>> {
    let embedded_len = OFFSET_TO_KEY_DATA + modulus.len();
    let Ok(embedded_size) = u32::try_from(embedded_len) else {
        return Err(malformed_error!("modulus of {} bytes is too large", modulus.len()));
    };

    let mut blob = vec![0u8; PUBLIC_KEY_HEADER_SIZE + embedded_len];
    let mut offset = 0;

    write_le_at(&mut blob, &mut offset, AlgorithmId::RSA_SIGN)?;
    write_le_at(&mut blob, &mut offset, AlgorithmId::SHA1)?;
    write_le_at(&mut blob, &mut offset, embedded_size)?;

    write_le_at(&mut blob, &mut offset, PUBLIC_KEY_BLOB_ID)?;
    write_le_at(&mut blob, &mut offset, version)?;
    write_le_at(&mut blob, &mut offset, 0_u16)?;
    write_le_at(&mut blob, &mut offset, alg_id.value())?;

    write_le_at(&mut blob, &mut offset, RSA1_MAGIC)?;
    write_le_at(&mut blob, &mut offset, bit_len)?;
    write_le_at(&mut blob, &mut offset, pub_exp)?;
    write_bytes_at(&mut blob, &mut offset, modulus)?;

    Ok(blob)
}

fn read_private_parameters(
    blob: &[u8],
    rsa: &RsaPubKey,
    modulus_len: usize,
) -> Option<RsaParameters> {
    match private_parameters(blob, rsa, modulus_len) {
        Ok(parameters) => Some(parameters),
        Err(_) => {
            trace!("key pair blob has a truncated private section");
            None
        }
    }
}

fn private_parameters(blob: &[u8], rsa: &RsaPubKey, modulus_len: usize) -> Result<RsaParameters> {
    let half_len = rsa.half_len();
    let mut offset = OFFSET_TO_KEY_DATA;
    let mut next = |len: usize| read_bytes_at(blob, &mut offset, len).map(reversed);

    Ok(RsaParameters {
        exponent: exponent_bytes(rsa.pub_exp),
        modulus: next(modulus_len)?,
        p: next(half_len)?,
        q: next(half_len)?,
        dp: next(half_len)?,
        dq: next(half_len)?,
        inverse_q: next(half_len)?,
        d: next(modulus_len)?,
    })
}

fn reversed(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Big-endian public exponent without leading zero bytes.
fn exponent_bytes(pub_exp: u32) -> Vec<u8> {
    let bytes = pub_exp.to_be_bytes();
    let first = bytes.iter().position(|byte| *byte != 0).unwrap_or(3);
    bytes[first..].to_vec()
}
