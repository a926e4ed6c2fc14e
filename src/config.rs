//! Signing configuration.
//!
//! [`SigningOptions`] gathers everything a caller can say about how output should be signed:
//! where the key comes from, whether signing is delayed or public, and where relative key file
//! names are looked up. Options are plain data; [`SigningOptions::validate`] rejects
//! contradictory combinations, and [`SigningOptions::check_keys`] reports the diagnostics a
//! compiler emits once the keys have been resolved.

use std::{path::PathBuf, sync::Arc};

use crate::{
    diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink},
    file::{KeyFileSystem, KeyResolver},
    keys::{non_empty, KeyMaterial},
    Error, Result,
};

/// Options controlling how output is strong-name signed.
///
/// # Examples
///
/// ```rust
/// use dotsign::SigningOptions;
///
/// let options = SigningOptions::default()
///     .with_key_file("key.snk")
///     .with_search_paths(["/src/app"]);
/// assert!(options.validate().is_ok());
///
/// let conflicting = options.with_key_container("MyContainer");
/// assert!(conflicting.validate().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SigningOptions {
    /// Key file name, absolute or relative to a search path
    pub key_file: Option<String>,

    /// Name of a key container held by the host signing service
    pub key_container: Option<String>,

    /// Raw canonical public key, for delayed or public signing without a key file
    pub public_key: Option<Vec<u8>>,

    /// Delay signing; `None` when not specified
    pub delay_sign: Option<bool>,

    /// Public signing: the strong name is set, but no real signature is computed
    pub public_sign: bool,

    /// A counter-signature was requested; carried through to the key material
    pub has_counter_signature: bool,

    /// Absolute directories used to resolve relative key file names, in lookup order
    pub key_file_search_paths: Vec<PathBuf>,
}

impl SigningOptions {
    /// Set the key file.
    #[must_use]
    pub fn with_key_file(mut self, key_file: impl Into<String>) -> Self {
        self.key_file = Some(key_file.into());
        self
    }

    /// Set the key container.
    #[must_use]
    pub fn with_key_container(mut self, key_container: impl Into<String>) -> Self {
        self.key_container = Some(key_container.into());
        self
    }

    /// Set a raw public key.
    #[must_use]
    pub fn with_public_key(mut self, public_key: impl Into<Vec<u8>>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    /// Enable or disable delay signing.
    #[must_use]
    pub fn with_delay_sign(mut self, delay_sign: bool) -> Self {
        self.delay_sign = Some(delay_sign);
        self
    }

    /// Enable or disable public signing.
    #[must_use]
    pub fn with_public_sign(mut self, public_sign: bool) -> Self {
        self.public_sign = public_sign;
        self
    }

    /// Request a counter-signature.
    #[must_use]
    pub fn with_counter_signature(mut self, has_counter_signature: bool) -> Self {
        self.has_counter_signature = has_counter_signature;
        self
    }

    /// Replace the key file search paths.
    #[must_use]
    pub fn with_search_paths<I, P>(mut self, search_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.key_file_search_paths = search_paths.into_iter().map(Into::into).collect();
        self
    }

    /// The key file name, or `None` if it is unset or empty.
    pub fn key_file_name(&self) -> Option<&str> {
        non_empty(self.key_file.as_deref())
    }

    /// The key container name, or `None` if it is unset or empty.
    pub fn key_container_name(&self) -> Option<&str> {
        non_empty(self.key_container.as_deref())
    }

    /// Whether delay signing is in effect.
    pub fn is_delay_signed(&self) -> bool {
        self.delay_sign.unwrap_or(false)
    }

    /// Check the options for contradictions.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if a key file and a key container are both set,
    /// if a raw public key is combined with either of them, if delay signing is combined with
    /// public signing, or if a search path is not absolute. Empty key file and container names
    /// count as unset.
    pub fn validate(&self) -> Result<()> {
        let key_file = self.key_file_name();
        let key_container = self.key_container_name();
        if key_file.is_some() && key_container.is_some() {
            return Err(Error::Configuration(
                "a key file and a key container cannot both be specified".to_string(),
            ));
        }

        if self.public_key.is_some() && (key_file.is_some() || key_container.is_some()) {
            return Err(Error::Configuration(
                "a public key cannot be combined with a key file or key container".to_string(),
            ));
        }

        if self.is_delay_signed() && self.public_sign {
            return Err(Error::Configuration(
                "delay signing and public signing cannot both be enabled".to_string(),
            ));
        }

        if let Some(relative) = self
            .key_file_search_paths
            .iter()
            .find(|path| !path.is_absolute())
        {
            return Err(Error::Configuration(format!(
                "key file search path '{}' must be absolute",
                relative.display()
            )));
        }

        Ok(())
    }

    /// Build a resolver over the configured search paths.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if a search path is not absolute.
    pub fn key_resolver(&self, file_system: Arc<dyn KeyFileSystem>) -> Result<KeyResolver> {
        KeyResolver::new(self.key_file_search_paths.iter().cloned(), file_system)
    }

    /// Output receives a strong name.
    pub fn has_strong_name(&self, keys: &KeyMaterial) -> bool {
        !self.is_delay_signed() && keys.can_provide_strong_name()
    }

    /// Output receives a real signature computed from a private key.
    pub fn is_real_signed(&self, keys: &KeyMaterial) -> bool {
        !self.is_delay_signed() && !self.public_sign && keys.can_sign()
    }

    /// Report the diagnostics of resolved `keys` under these options to `sink`.
    ///
    /// This forwards the key resolution diagnostic, if any, and adds:
    /// - [`DiagnosticCode::PublicSignButNoKey`] when public signing has no public key
    /// - [`DiagnosticCode::DelaySignButNoKey`] when delay signing has no public key
    /// - [`DiagnosticCode::SignButNoPrivateKey`] when real signing was requested with a key file
    ///   that only holds a public key
    pub fn check_keys(&self, keys: &KeyMaterial, sink: &mut dyn DiagnosticSink) {
        if let Some(diagnostic) = keys.diagnostic() {
            sink.report(diagnostic.clone());
        }

        let has_public_key = keys.public_key().is_some();
        if self.public_sign {
            if !has_public_key {
                sink.report(Diagnostic::new(
                    DiagnosticCode::PublicSignButNoKey,
                    Vec::<String>::new(),
                ));
            }
            return;
        }

        if self.is_delay_signed() {
            if !has_public_key {
                sink.report(Diagnostic::new(
                    DiagnosticCode::DelaySignButNoKey,
                    Vec::<String>::new(),
                ));
            }
            return;
        }

        if has_public_key && !keys.can_sign() {
            if let Some(key_file) = self.key_file_name() {
                sink.report(Diagnostic::new(
                    DiagnosticCode::SignButNoPrivateKey,
                    [key_file],
                ));
            }
        }
    }
}
