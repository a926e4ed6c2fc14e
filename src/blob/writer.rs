//! Encoding of RSA parameter sets into key blobs.

use super::{
    algorithm::AlgorithmId,
    params::{RsaParameters, RsaPublicParameters},
    parser::build_public_key,
    BLOB_VERSION, OFFSET_TO_KEY_DATA, PRIVATE_KEY_BLOB_ID, RSA2_MAGIC,
};
use crate::{
    file::io::{write_bytes_at, write_le_at},
    Result,
};

/// Encode a complete key pair as a private key blob (`0x07` / `RSA2`).
///
/// The result is what `sn -k` writes into a `.snk` file and is accepted by
/// [`crate::blob::try_parse_key`], which recovers `params` from it.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the modulus length is not a multiple of 16 bits,
/// if the public exponent does not fit in 32 bits, or if any component is longer than its
/// slot in the blob layout.
pub fn encode_private_key_blob(params: &RsaParameters) -> Result<Vec<u8>> {
    let modulus = trimmed(&params.modulus);
    let modulus_len = modulus.len();
    let bit_len = modulus_bits(modulus_len)?;
    let half_len = (modulus_len + 1) / 2;
    let pub_exp = exponent_value(&params.exponent)?;

    let mut blob = vec![0u8; OFFSET_TO_KEY_DATA + modulus_len * 2 + half_len * 5];
    let mut offset = 0;

    write_le_at(&mut blob, &mut offset, PRIVATE_KEY_BLOB_ID)?;
    write_le_at(&mut blob, &mut offset, BLOB_VERSION)?;
    write_le_at(&mut blob, &mut offset, 0_u16)?;
    write_le_at(&mut blob, &mut offset, AlgorithmId::RSA_SIGN)?;

    write_le_at(&mut blob, &mut offset, RSA2_MAGIC)?;
    write_le_at(&mut blob, &mut offset, bit_len)?;
    write_le_at(&mut blob, &mut offset, pub_exp)?;

    write_component(&mut blob, &mut offset, modulus, modulus_len, "modulus")?;
    write_component(&mut blob, &mut offset, &params.p, half_len, "p")?;
    write_component(&mut blob, &mut offset, &params.q, half_len, "q")?;
    write_component(&mut blob, &mut offset, &params.dp, half_len, "dp")?;
    write_component(&mut blob, &mut offset, &params.dq, half_len, "dq")?;
    write_component(&mut blob, &mut offset, &params.inverse_q, half_len, "inverse_q")?;
    write_component(&mut blob, &mut offset, &params.d, modulus_len, "d")?;

    Ok(blob)
}

/// Encode public parameters as a canonical public key.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] under the same conditions as
/// [`encode_private_key_blob`].
pub fn encode_public_key(params: &RsaPublicParameters) -> Result<Vec<u8>> {
    let modulus = trimmed(&params.modulus);
    let bit_len = modulus_bits(modulus.len())?;
    let pub_exp = exponent_value(&params.exponent)?;
    let little_endian: Vec<u8> = modulus.iter().rev().copied().collect();

    build_public_key(
        BLOB_VERSION,
        AlgorithmId::new(AlgorithmId::RSA_SIGN),
        bit_len,
        pub_exp,
        &little_endian,
    )
}

fn trimmed(value: &[u8]) -> &[u8] {
    let first = value
        .iter()
        .position(|byte| *byte != 0)
        .unwrap_or(value.len());
    &value[first..]
}

fn modulus_bits(modulus_len: usize) -> Result<u32> {
    if modulus_len == 0 || modulus_len % 2 != 0 {
        return Err(malformed_error!(
            "modulus of {} bytes cannot be stored in a key blob",
            modulus_len
        ));
    }

    match u32::try_from(modulus_len * 8) {
        Ok(bits) if bits <= super::MAX_KEY_BITS => Ok(bits),
        _ => Err(malformed_error!("modulus of {} bytes is too large", modulus_len)),
    }
}

fn exponent_value(exponent: &[u8]) -> Result<u32> {
    let exponent = trimmed(exponent);
    if exponent.len() > 4 {
        return Err(malformed_error!(
            "public exponent of {} bytes does not fit in 32 bits",
            exponent.len()
        ));
    }

    Ok(exponent
        .iter()
        .fold(0_u32, |value, byte| (value << 8) | u32::from(*byte)))
}

/// Write a big-endian component little-endian into a zero-padded slot of `width` bytes.
fn write_component(
    blob: &mut [u8],
    offset: &mut usize,
    value: &[u8],
    width: usize,
    name: &str,
) -> Result<()> {
    let value = trimmed(value);
    if value.len() > width {
        return Err(malformed_error!(
            "component '{}' is {} bytes, slot holds {}",
            name,
            value.len(),
            width
        ));
    }

    let mut slot = vec![0u8; width];
    for (index, byte) in value.iter().rev().enumerate() {
        slot[index] = *byte;
    }
    write_bytes_at(blob, offset, &slot)
}

#[cfg(test)]
mod tests {
    use rsa::RsaPrivateKey;

    use super::*;
    use crate::{
        blob::{is_valid_public_key, public_parameters, try_parse_key},
        Error,
    };

    #[test]
    fn private_blob_round_trip() {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let params = RsaParameters::from_private_key(&key).unwrap();

        let blob = encode_private_key_blob(&params).unwrap();
        assert_eq!(blob.len(), 20 + 128 * 2 + 64 * 5);
        assert_eq!(blob[0], PRIVATE_KEY_BLOB_ID);
        assert_eq!(&blob[8..12], b"RSA2");

        let parsed = try_parse_key(&blob).unwrap();
        let recovered = parsed.private_key.unwrap();
        assert_eq!(recovered.modulus, params.modulus);
        assert_eq!(trimmed(&recovered.d), trimmed(&params.d));
        assert!(recovered.to_private_key().is_ok());
    }

    #[test]
    fn public_key_encoding() {
        let params = RsaPublicParameters {
            exponent: vec![0x01, 0x00, 0x01],
            modulus: (1..=64).collect(),
        };

        let public_key = encode_public_key(&params).unwrap();
        assert!(is_valid_public_key(&public_key));
        assert_eq!(public_key.len(), 12 + 20 + 64);
        assert_eq!(public_parameters(&public_key), Some(params));
    }

    #[test]
    fn odd_modulus_rejected() {
        let params = RsaPublicParameters {
            exponent: vec![0x03],
            modulus: vec![0xFF; 63],
        };
        assert!(matches!(
            encode_public_key(&params),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn wide_exponent_rejected() {
        let params = RsaPublicParameters {
            exponent: vec![0x01; 5],
            modulus: vec![0xFF; 64],
        };
        assert!(matches!(
            encode_public_key(&params),
            Err(Error::Malformed { .. })
        ));
    }
}
