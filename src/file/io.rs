//! Low-level byte order and safe reading/writing utilities for key blobs.
//!
//! Key blobs are little-endian, fixed-layout structures that frequently arrive from untrusted
//! sources (key files checked into repositories, options passed on a command line). Nothing in
//! this crate overlays structs onto those bytes; every field is decoded one at a time through the
//! helpers below, and every read is bounds-checked first.
//!
//! # Key Components
//!
//! - [`crate::file::io::BlobIO`] - Trait defining little-endian conversion for primitive types
//! - [`crate::file::io::read_le`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//! - [`crate::file::io::read_bytes_at`] - Borrow a byte range at an offset and advance the offset
//! - [`crate::file::io::write_le_at`] - Write a value at an offset and advance the offset
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use dotsign::file::io::{read_le_at, write_le_at};
//!
//! let mut data = [0u8; 6];
//! let mut offset = 0;
//! write_le_at(&mut data, &mut offset, 0x0207_u16)?;
//! write_le_at(&mut data, &mut offset, 0x3241_5352_u32)?;
//!
//! let mut offset = 0;
//! let header: u16 = read_le_at(&data, &mut offset)?;
//! let magic: u32 = read_le_at(&data, &mut offset)?;
//! assert_eq!(header, 0x0207);
//! assert_eq!(magic, 0x3241_5352);
//! # Ok::<(), dotsign::Error>(())
//! ```
//!
//! # Error Handling
//!
//! All functions return [`crate::Result<T>`] and yield [`crate::Error::OutOfBounds`] if the
//! buffer is too short, including when `offset + size` would overflow.
//!
//! # Thread Safety
//!
//! All functions in this module are pure and can be called concurrently from multiple threads.

use crate::{Error::OutOfBounds, Result};

/// Trait for implementing type-specific safe binary data reading and writing operations.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size
/// byte array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait BlobIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_blob_io {
    ($($ty:ty),*) => {
        $(
            impl BlobIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_blob_io!(u8, u16, u32, u64);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: BlobIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at a specific offset.
///
/// The offset is advanced by the number of bytes read on success and left untouched on failure.
///
/// # Arguments
///
/// * `data` - The byte buffer to read from
/// * `offset` - Mutable reference to the offset position (will be advanced after reading)
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: BlobIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let bytes = read_bytes_at(data, offset, type_len)?;

    let Ok(read) = bytes.try_into() else {
        return Err(OutOfBounds);
    };

    Ok(T::from_le_bytes(read))
}

/// Borrows `len` bytes at `offset` and advances the offset past them.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the range does not lie within `data`.
pub fn read_bytes_at<'a>(data: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8]> {
    let Some(end) = offset.checked_add(len) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    let slice = &data[*offset..end];
    *offset = end;
    Ok(slice)
}

/// Safely writes a value of type `T` in little-endian byte order at a specific offset.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the buffer cannot hold the value.
pub fn write_le_at<T: BlobIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    write_bytes_at(data, offset, bytes.as_ref())
}

/// Copies `bytes` into `data` at `offset` and advances the offset past them.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the buffer cannot hold the bytes.
pub fn write_bytes_at(data: &mut [u8], offset: &mut usize, bytes: &[u8]) -> Result<()> {
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}
