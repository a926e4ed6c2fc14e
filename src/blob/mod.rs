//! Strong-name key blob codec.
//!
//! Strong-name keys travel in two binary layouts. Key files (`.snk`) and key containers
//! store the *raw* layout of the legacy CryptoAPI:
//!
//! ```text
//! offset  size  field
//! 0       1     type        0x06 public key, 0x07 key pair
//! 1       1     version
//! 2       2     reserved
//! 4       4     alg_id
//! 8       4     magic       "RSA1" public key, "RSA2" key pair
//! 12      4     bit_len
//! 16      4     pub_exp
//! 20      L     modulus     L = bit_len / 8, little-endian
//! 20+L    ...   private material (key pairs only)
//! ```
//!
//! Assembly metadata stores the *canonical* public key instead: a 12-byte header carrying the
//! signature algorithm, the hash algorithm and the size of the raw public key blob that
//! follows it.
//!
//! The functions in this module are pure and total. They validate and convert between these
//! layouts, derive RSA parameters for use with the [`rsa`] crate and encode parameter sets back
//! into blobs.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotsign::blob::{is_valid_public_key, try_parse_key};
//!
//! let bytes = std::fs::read("key.snk")?;
//! if let Some(parsed) = try_parse_key(&bytes) {
//!     assert!(is_valid_public_key(&parsed.public_key));
//!     println!("private key present: {}", parsed.private_key.is_some());
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

mod algorithm;
mod params;
mod parser;
mod writer;

pub use algorithm::{AlgorithmClass, AlgorithmId, AssemblyHashAlgorithm};
pub use params::{RsaParameters, RsaPublicParameters};
pub use parser::{
    is_valid_public_key, public_parameters, try_extract_public_key, try_parse_key, BlobHeader,
    ParsedKey, PublicKeyHeader, RsaPubKey,
};
pub use writer::{encode_private_key_blob, encode_public_key};

/// Blob type of a raw public key
pub const PUBLIC_KEY_BLOB_ID: u8 = 0x06;
/// Blob type of a raw key pair
pub const PRIVATE_KEY_BLOB_ID: u8 = 0x07;
/// Blob format version written by this crate
pub const BLOB_VERSION: u8 = 0x02;
/// `RSA1`, magic of a raw public key
pub const RSA1_MAGIC: u32 = 0x3141_5352;
/// `RSA2`, magic of a raw key pair
pub const RSA2_MAGIC: u32 = 0x3241_5352;
/// Size of the blob header (type, version, reserved, alg_id)
pub const BLOB_HEADER_SIZE: usize = 8;
/// Size of the RSA block (magic, bit_len, pub_exp)
pub const RSA_PUB_KEY_SIZE: usize = 12;
/// Offset of the modulus in a raw key blob
pub const OFFSET_TO_KEY_DATA: usize = BLOB_HEADER_SIZE + RSA_PUB_KEY_SIZE;
/// Size of the header in front of a canonical public key's embedded blob
pub const PUBLIC_KEY_HEADER_SIZE: usize = 12;
/// Largest modulus accepted, in bits
pub const MAX_KEY_BITS: u32 = 16384;

/// The ECMA standard public key.
///
/// Framework assemblies reference this placeholder instead of a real key; it is a valid public
/// key even though it carries no RSA numbers.
pub const ECMA_KEY: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];
