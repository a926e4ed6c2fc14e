//! Algorithm identifiers used in key blob headers.
//!
//! An algorithm identifier (`ALG_ID`) is a 32-bit value packing three fields:
//!
//! ```text
//!  31          16 15   13 12     9 8          0
//! +--------------+-------+--------+------------+
//! |   reserved   | class |  kind  |   sub-id   |
//! +--------------+-------+--------+------------+
//! ```
//!
//! The canonical public-key header carries one signature and one hash identifier; a value of
//! zero in either slot means "unset" and is accepted as-is.

use std::fmt;

use strum::{Display, FromRepr};

/// The class field (bits 13-15) of an [`AlgorithmId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Display)]
#[repr(u32)]
pub enum AlgorithmClass {
    /// No class
    Any = 0,
    /// Signature algorithms
    Signature = 1,
    /// Message encryption algorithms
    MsgEncrypt = 2,
    /// Data encryption algorithms
    DataEncrypt = 3,
    /// Hash algorithms
    Hash = 4,
    /// Key exchange algorithms
    KeyExchange = 5,
    /// All classes
    All = 7,
}

/// A packed algorithm identifier.
///
/// # Examples
///
/// ```rust
/// use dotsign::blob::{AlgorithmClass, AlgorithmId};
///
/// let sha1 = AlgorithmId::new(AlgorithmId::SHA1);
/// assert_eq!(sha1.class(), Some(AlgorithmClass::Hash));
/// assert_eq!(sha1.sub_id(), AlgorithmId::SUB_ID_SHA1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AlgorithmId(u32);

impl AlgorithmId {
    /// `CALG_RSA_SIGN`, the signature algorithm of every canonical public key
    pub const RSA_SIGN: u32 = 0x0000_2400;
    /// `CALG_RSA_KEYX`, found in some exported key pairs
    pub const RSA_KEYX: u32 = 0x0000_A400;
    /// `CALG_SHA1`, the hash algorithm of every canonical public key
    pub const SHA1: u32 = 0x0000_8004;
    /// `CALG_SHA_256`
    pub const SHA256: u32 = 0x0000_800C;
    /// `CALG_SHA_384`
    pub const SHA384: u32 = 0x0000_800D;
    /// `CALG_SHA_512`
    pub const SHA512: u32 = 0x0000_800E;

    /// Hash sub-id for MD2
    pub const SUB_ID_MD2: u32 = 1;
    /// Hash sub-id for MD4
    pub const SUB_ID_MD4: u32 = 2;
    /// Hash sub-id for MD5
    pub const SUB_ID_MD5: u32 = 3;
    /// Hash sub-id for SHA-1; the weakest hash accepted in a public key header
    pub const SUB_ID_SHA1: u32 = 4;
    /// Hash sub-id for SHA-256
    pub const SUB_ID_SHA256: u32 = 12;
    /// Hash sub-id for SHA-384
    pub const SUB_ID_SHA384: u32 = 13;
    /// Hash sub-id for SHA-512
    pub const SUB_ID_SHA512: u32 = 14;

    /// Wrap a raw identifier value.
    pub const fn new(value: u32) -> AlgorithmId {
        AlgorithmId(value)
    }

    /// The raw identifier value.
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns `true` if the identifier is zero ("unset").
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }

    /// Decoded class field, `None` for the unassigned class value 6.
    pub fn class(self) -> Option<AlgorithmClass> {
        AlgorithmClass::from_repr((self.0 >> 13) & 0x7)
    }

    /// The kind field (bits 9-12).
    pub const fn kind(self) -> u32 {
        (self.0 >> 9) & 0xF
    }

    /// The sub-id field (bits 0-8).
    pub const fn sub_id(self) -> u32 {
        self.0 & 0x1FF
    }

    /// Whether this identifier may appear in the signature slot of a public key header.
    pub fn is_valid_signature_algorithm(self) -> bool {
        self.is_unset() || self.class() == Some(AlgorithmClass::Signature)
    }

    /// Whether this identifier may appear in the hash slot of a public key header.
    pub fn is_valid_hash_algorithm(self) -> bool {
        self.is_unset()
            || (self.class() == Some(AlgorithmClass::Hash)
                && self.sub_id() >= AlgorithmId::SUB_ID_SHA1)
    }
}

impl From<u32> for AlgorithmId {
    fn from(value: u32) -> Self {
        AlgorithmId(value)
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

#[allow(non_snake_case)]
/// Hash algorithms accepted for public key tokens, as stored in `Assembly.HashAlgId`
pub mod AssemblyHashAlgorithm {
    /// No hash algorithm specified
    pub const NONE: u32 = 0x0000;
    /// MD5 hash algorithm
    pub const MD5: u32 = 0x8003;
    /// SHA1 hash algorithm
    pub const SHA1: u32 = 0x8004;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_fields() {
        let rsa_sign = AlgorithmId::new(AlgorithmId::RSA_SIGN);
        assert_eq!(rsa_sign.class(), Some(AlgorithmClass::Signature));
        assert_eq!(rsa_sign.kind(), 2);
        assert_eq!(rsa_sign.sub_id(), 0);

        let keyx = AlgorithmId::new(AlgorithmId::RSA_KEYX);
        assert_eq!(keyx.class(), Some(AlgorithmClass::KeyExchange));

        let sha512 = AlgorithmId::new(AlgorithmId::SHA512);
        assert_eq!(sha512.class(), Some(AlgorithmClass::Hash));
        assert_eq!(sha512.sub_id(), AlgorithmId::SUB_ID_SHA512);
    }

    #[test]
    fn unassigned_class() {
        assert_eq!(AlgorithmId::new(6 << 13).class(), None);
    }

    #[test]
    fn signature_slot() {
        assert!(AlgorithmId::new(0).is_valid_signature_algorithm());
        assert!(AlgorithmId::new(AlgorithmId::RSA_SIGN).is_valid_signature_algorithm());
        assert!(!AlgorithmId::new(AlgorithmId::SHA1).is_valid_signature_algorithm());
        assert!(!AlgorithmId::new(AlgorithmId::RSA_KEYX).is_valid_signature_algorithm());
    }

    #[test]
    fn hash_slot() {
        assert!(AlgorithmId::new(0).is_valid_hash_algorithm());
        assert!(AlgorithmId::new(AlgorithmId::SHA1).is_valid_hash_algorithm());
        assert!(AlgorithmId::new(AlgorithmId::SHA256).is_valid_hash_algorithm());
        // CALG_MD5 is a hash, but weaker than SHA-1
        assert!(!AlgorithmId::new(0x8003).is_valid_hash_algorithm());
        assert!(!AlgorithmId::new(AlgorithmId::RSA_SIGN).is_valid_hash_algorithm());
    }

    #[test]
    fn display() {
        assert_eq!(AlgorithmId::new(AlgorithmId::SHA1).to_string(), "0x00008004");
    }
}
