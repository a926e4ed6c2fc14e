//! Structured diagnostics reported while resolving and checking keys.
//!
//! Key problems are not errors of this crate: a missing key file or a malformed public key is
//! something the *user* of a compiler or build tool needs to hear about, with a stable code and
//! a message naming the offending input. [`crate::KeyMaterial`] therefore records at most one
//! [`Diagnostic`] instead of failing, and [`crate::SigningOptions::check_keys`] hands every
//! diagnostic to a caller-supplied [`DiagnosticSink`].
//!
//! # Examples
//!
//! ```rust
//! use dotsign::{Diagnostic, DiagnosticCode, Severity};
//!
//! let diagnostic = Diagnostic::public_key_file_failure("MyKey.snk", "File not found.");
//! assert_eq!(diagnostic.code, DiagnosticCode::PublicKeyFileFailure);
//! assert_eq!(diagnostic.severity(), Severity::Error);
//! assert_eq!(
//!     diagnostic.message(),
//!     "Error signing output with public key from file 'MyKey.snk' -- File not found."
//! );
//! ```

use std::fmt;

use strum::{Display, EnumIter, IntoStaticStr};

/// Message used when a key file cannot be located.
pub const FILE_NOT_FOUND: &str = "File not found.";
/// Message used when the key content is not a usable key.
pub const INVALID_PUBLIC_KEY: &str = "Invalid public key.";
/// Message used when no host signing service is available.
pub const SIGNING_NOT_SUPPORTED: &str = "Assembly signing not supported.";
/// Message used when there is no directory to stage signed output in.
pub const SIGNING_TEMP_PATH_UNAVAILABLE: &str =
    "The temporary path used for signing is not available.";
/// Option name reported for an invalid raw public key.
pub const CRYPTO_PUBLIC_KEY_OPTION: &str = "CryptoPublicKey";

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Severity {
    /// The output must not be produced
    Error,
    /// The output is produced, but likely not as intended
    Warning,
}

/// Stable identifier of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum DiagnosticCode {
    /// A key file could not be used; arguments: path, reason
    PublicKeyFileFailure,
    /// A key container could not be used; arguments: container name, reason
    PublicKeyContainerFailure,
    /// An option carries an invalid value; arguments: option name, value
    BadCompilationOptionValue,
    /// Real signing was requested with a key that has no private part; arguments: path
    SignButNoPrivateKey,
    /// Public signing was requested without a public key
    PublicSignButNoKey,
    /// Delay signing was requested without a public key
    DelaySignButNoKey,
}

impl DiagnosticCode {
    /// The numeric code, as reported by the C# compiler.
    pub fn id(self) -> u32 {
        match self {
            DiagnosticCode::PublicKeyFileFailure => 7027,
            DiagnosticCode::PublicKeyContainerFailure => 7028,
            DiagnosticCode::SignButNoPrivateKey => 7032,
            DiagnosticCode::DelaySignButNoKey => 7033,
            DiagnosticCode::BadCompilationOptionValue => 7088,
            DiagnosticCode::PublicSignButNoKey => 8102,
        }
    }

    /// Severity of diagnostics with this code.
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticCode::DelaySignButNoKey => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Message template; `{0}`, `{1}` are replaced by the diagnostic arguments.
    pub fn template(self) -> &'static str {
        match self {
            DiagnosticCode::PublicKeyFileFailure => {
                "Error signing output with public key from file '{0}' -- {1}"
            }
            DiagnosticCode::PublicKeyContainerFailure => {
                "Error signing output with public key from container '{0}' -- {1}"
            }
            DiagnosticCode::BadCompilationOptionValue => "Invalid '{0}' value: '{1}'.",
            DiagnosticCode::SignButNoPrivateKey => {
                "Key file '{0}' is missing the private key needed for signing"
            }
            DiagnosticCode::PublicSignButNoKey => {
                "Public signing was specified and requires a public key, but no public key was specified."
            }
            DiagnosticCode::DelaySignButNoKey => {
                "Delay signing was specified and requires a public key, but no public key was specified"
            }
        }
    }
}

/// A diagnostic: a code plus the arguments substituted into its message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    /// What went wrong
    pub code: DiagnosticCode,
    /// Message arguments, in template order
    pub arguments: Vec<String>,
}

impl Diagnostic {
    /// Create a diagnostic from a code and its arguments.
    pub fn new<I, S>(code: DiagnosticCode, arguments: I) -> Diagnostic
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Diagnostic {
            code,
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    /// A key file could not be used.
    pub fn public_key_file_failure(path: impl Into<String>, reason: impl Into<String>) -> Diagnostic {
        Diagnostic::new(
            DiagnosticCode::PublicKeyFileFailure,
            [path.into(), reason.into()],
        )
    }

    /// A key container could not be used.
    pub fn public_key_container_failure(
        container: impl Into<String>,
        reason: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic::new(
            DiagnosticCode::PublicKeyContainerFailure,
            [container.into(), reason.into()],
        )
    }

    /// An invalid raw public key; the bytes are echoed as dash-separated hex.
    pub fn bad_public_key_option(public_key: &[u8]) -> Diagnostic {
        Diagnostic::new(
            DiagnosticCode::BadCompilationOptionValue,
            [CRYPTO_PUBLIC_KEY_OPTION.to_string(), to_dashed_hex(public_key)],
        )
    }

    /// Severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// The message with all arguments substituted.
    pub fn message(&self) -> String {
        let mut message = self.code.template().to_string();
        for (index, argument) in self.arguments.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", index), argument);
        }
        message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity() {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{} CS{}: {}", prefix, self.code.id(), self.message())
    }
}

/// Receiver of diagnostics.
pub trait DiagnosticSink {
    /// Accept one diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Uppercase hex bytes joined by `-`, e.g. `01-02-03`.
pub fn to_dashed_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<_>>()
        .join("-")
}
