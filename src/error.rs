use std::path::PathBuf;

use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Most of the key handling in this crate never surfaces an [`Error`] directly: the blob codec
/// answers with [`Option`] / [`bool`], and [`crate::KeyMaterial`] folds every failure of the
/// resolution pipeline into a single [`crate::Diagnostic`]. The variants below are what remains
/// visible through the signing entry points, the configuration layer and the low-level readers.
///
/// # Error Categories
///
/// ## Key material
/// - [`Error::Malformed`] - A key blob or RSA parameter set violates its layout
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
/// - [`Error::NotFound`] - A key file could not be located on any search path
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// ## Host signing service
/// - [`Error::HostUnavailable`] - The platform does not provide a signing service
/// - [`Error::HostOperation`] - The signing service was available but the call failed
/// - [`Error::SigningTempPathUnavailable`] - No temp directory to stage signed output in
///
/// ## Signing
/// - [`Error::NotSupported`] - The selected strategy cannot perform this operation
/// - [`Error::Crypto`] - The RSA primitive rejected the key or failed to sign
/// - [`Error::SignatureSize`] - A signature does not fit the reserved region
/// - [`Error::AlreadySigned`] - A content builder was asked to sign a second time
///
/// ## Configuration
/// - [`Error::Configuration`] - Invalid search paths or contradictory key options
///
/// # Examples
///
/// ```rust,no_run
/// use dotsign::{Error, HostSigner};
/// use std::path::Path;
///
/// let signer = HostSigner::default();
/// let keys = signer.resolve_keys(Some("key.snk"), None, false);
/// match signer.sign_file(&keys, Path::new("out.dll")) {
///     Ok(()) => println!("signed"),
///     Err(Error::HostUnavailable) => eprintln!("signing is not supported on this host"),
///     Err(Error::HostOperation(message)) => eprintln!("signing failed: {}", message),
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The data is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading a buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The key file could not be found.
    ///
    /// Carries the path exactly as it was supplied by the caller.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while reading key files or
    /// writing signed output.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// The host platform does not offer a strong-name signing service.
    ///
    /// This is an expected outcome on most platforms and is reported to users as
    /// "Assembly signing not supported." rather than as a signing failure.
    #[error("Assembly signing not supported.")]
    HostUnavailable,

    /// The filesystem offers no directory in which output can be staged for host signing.
    #[error("The temporary path used for signing is not available.")]
    SigningTempPathUnavailable,

    /// The host signing service was acquired, but the requested operation failed.
    #[error("{0}")]
    HostOperation(String),

    /// The signing strategy does not offer this operation.
    #[error("This operation is not supported by the selected signing strategy")]
    NotSupported,

    /// The RSA primitive rejected the key material or failed to produce a signature.
    #[error("RSA operation failed - {0}")]
    Crypto(String),

    /// A computed signature does not match the size of the region reserved for it.
    #[error("Signature is {actual} bytes, but {expected} bytes were reserved")]
    SignatureSize {
        /// Size of the reserved signature region
        expected: usize,
        /// Size of the produced signature
        actual: usize,
    },

    /// The content has already been signed once.
    #[error("Content has already been signed")]
    AlreadySigned,

    /// Invalid or contradictory configuration.
    #[error("Invalid configuration - {0}")]
    Configuration(String),
}
