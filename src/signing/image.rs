//! Content that is signed while it is being built.

use crate::{Error, Result};

/// A builder that reserves room for a strong-name signature and fills it in once the rest of
/// its content is final.
pub trait SignableContent {
    /// Compute the signature with `signer` and store it.
    ///
    /// Implementations call `signer` exactly once, with the bytes covered by the signature.
    ///
    /// # Errors
    /// Propagates the error of `signer`, and reports content-specific failures such as
    /// [`crate::Error::AlreadySigned`] or [`crate::Error::SignatureSize`].
    fn sign_content(&mut self, signer: &mut dyn FnMut(&[u8]) -> Result<Vec<u8>>) -> Result<()>;
}

/// A finished image with a zero-filled region reserved for its signature.
///
/// The signature covers every byte outside the reserved region, in order.
///
/// # Examples
///
/// ```rust
/// use dotsign::signing::{ReservedSignatureImage, SignableContent};
///
/// let mut image = ReservedSignatureImage::new(vec![1, 2, 0, 0, 3], 2, 2)?;
/// image.sign_content(&mut |covered: &[u8]| {
///     assert_eq!(covered, &[1, 2, 3]);
///     Ok(vec![9, 9])
/// })?;
/// assert_eq!(image.as_bytes(), &[1, 2, 9, 9, 3]);
/// # Ok::<(), dotsign::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedSignatureImage {
    image: Vec<u8>,
    signature_offset: usize,
    signature_size: usize,
    signed: bool,
}

impl ReservedSignatureImage {
    /// Wrap `image`, reserving `signature_size` bytes at `signature_offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the region does not lie within the image.
    pub fn new(
        image: Vec<u8>,
        signature_offset: usize,
        signature_size: usize,
    ) -> Result<ReservedSignatureImage> {
        match signature_offset.checked_add(signature_size) {
            Some(end) if end <= image.len() => Ok(ReservedSignatureImage {
                image,
                signature_offset,
                signature_size,
                signed: false,
            }),
            _ => Err(Error::OutOfBounds),
        }
    }

    /// The bytes covered by the signature.
    pub fn signed_content(&self) -> Vec<u8> {
        let end = self.signature_offset + self.signature_size;
        let mut content = Vec::with_capacity(self.image.len() - self.signature_size);
        content.extend_from_slice(&self.image[..self.signature_offset]);
        content.extend_from_slice(&self.image[end..]);
        content
    }

    /// The reserved signature region.
    pub fn signature(&self) -> &[u8] {
        &self.image[self.signature_offset..self.signature_offset + self.signature_size]
    }

    /// Whether a signature has been written.
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// The complete image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.image
    }

    /// Consume the wrapper, returning the image.
    pub fn into_inner(self) -> Vec<u8> {
        self.image
    }
}

impl SignableContent for ReservedSignatureImage {
    fn sign_content(&mut self, signer: &mut dyn FnMut(&[u8]) -> Result<Vec<u8>>) -> Result<()> {
        if self.signed {
            return Err(Error::AlreadySigned);
        }

        let signature = signer(&self.signed_content())?;
        if signature.len() != self.signature_size {
            return Err(Error::SignatureSize {
                expected: self.signature_size,
                actual: signature.len(),
            });
        }

        let end = self.signature_offset + self.signature_size;
        self.image[self.signature_offset..end].copy_from_slice(&signature);
        self.signed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_must_fit() {
        assert!(ReservedSignatureImage::new(vec![0; 8], 4, 4).is_ok());
        assert!(matches!(
            ReservedSignatureImage::new(vec![0; 8], 5, 4),
            Err(Error::OutOfBounds)
        ));
        assert!(ReservedSignatureImage::new(vec![0; 8], usize::MAX, 2).is_err());
    }

    #[test]
    fn signs_once() {
        let mut image = ReservedSignatureImage::new(vec![0; 8], 0, 4).unwrap();
        let mut calls = 0;
        let mut signer = |_: &[u8]| {
            calls += 1;
            Ok::<_, Error>(vec![1; 4])
        };

        image.sign_content(&mut signer).unwrap();
        assert!(matches!(
            image.sign_content(&mut signer),
            Err(Error::AlreadySigned)
        ));
        assert_eq!(calls, 1);
        assert_eq!(image.into_inner(), vec![1, 1, 1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn size_mismatch() {
        let mut image = ReservedSignatureImage::new(vec![0; 8], 2, 4).unwrap();
        let result = image.sign_content(&mut |_: &[u8]| Ok(vec![1; 3]));
        assert!(matches!(
            result,
            Err(Error::SignatureSize {
                expected: 4,
                actual: 3
            })
        ));
        assert!(!image.is_signed());
    }

    #[test]
    fn signer_error_is_propagated() {
        let mut image = ReservedSignatureImage::new(vec![0; 8], 2, 4).unwrap();
        let result =
            image.sign_content(&mut |_: &[u8]| Err(Error::Crypto("no key".to_string())));
        assert!(matches!(result, Err(Error::Crypto(_))));
    }
}
