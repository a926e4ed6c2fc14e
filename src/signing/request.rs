//! Lifecycle of a single signing request.
//!
//! ```text
//! Idle -> ResolvingKeySource -> Resolved -> Signing -> Signed
//!                            \-> Failed             \-> Failed
//! ```
//!
//! `Signed` and `Failed` are terminal. Nothing is retried; a caller that wants to try again
//! after fixing its configuration starts a new request.

use std::{io::Write, path::Path};

use log::debug;

use super::{SignableContent, SigningStrategy};
use crate::{
    config::SigningOptions, diagnostics::Diagnostic, keys::KeyMaterial, Error, Result,
};

/// State of a [`SigningRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningState {
    /// Nothing has happened yet
    Idle,
    /// The key source is being resolved
    ResolvingKeySource,
    /// Keys were resolved and signing can start
    Resolved(KeyMaterial),
    /// A signature is being applied
    Signing,
    /// The output is signed
    Signed,
    /// The request failed
    Failed(Diagnostic),
}

impl SigningState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SigningState::Signed | SigningState::Failed(_))
    }
}

/// Drives one signing operation with a [`SigningStrategy`].
///
/// # Examples
///
/// ```rust
/// use dotsign::{signing::{SigningRequest, SigningState, SigningStrategy}, SigningOptions};
///
/// let strategy = SigningStrategy::default();
/// let mut request = SigningRequest::new(&strategy);
///
/// let options = SigningOptions::default().with_key_container("MyContainer");
/// let state = request.resolve(&options)?;
/// assert!(matches!(state, SigningState::Failed(_)));
/// # Ok::<(), dotsign::Error>(())
/// ```
#[derive(Debug)]
pub struct SigningRequest<'a> {
    strategy: &'a SigningStrategy,
    state: SigningState,
    key_file: Option<String>,
}

impl<'a> SigningRequest<'a> {
    /// Start an idle request.
    pub fn new(strategy: &'a SigningStrategy) -> SigningRequest<'a> {
        SigningRequest {
            strategy,
            state: SigningState::Idle,
            key_file: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> &SigningState {
        &self.state
    }

    /// Resolve the keys described by `options`.
    ///
    /// Ends in `Resolved`, or in `Failed` if key resolution produced a diagnostic.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if the request is not idle or the options are
    /// contradictory; the state is left unchanged.
    pub fn resolve(&mut self, options: &SigningOptions) -> Result<&SigningState> {
        if self.state != SigningState::Idle {
            return Err(Error::Configuration(format!(
                "keys cannot be resolved in state {:?}",
                self.state
            )));
        }

        self.state = SigningState::ResolvingKeySource;
        let keys = match self.strategy.resolve_keys_for(options) {
            Ok(keys) => keys,
            Err(error) => {
                self.state = SigningState::Idle;
                return Err(error);
            }
        };

        self.key_file = options.key_file_name().map(str::to_string);
        self.state = match keys.diagnostic() {
            Some(diagnostic) => SigningState::Failed(diagnostic.clone()),
            None => SigningState::Resolved(keys),
        };
        Ok(&self.state)
    }

    /// Sign the finished file at `path` with the resolved keys.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if keys have not been resolved.
    pub fn sign_file(&mut self, path: &Path) -> Result<&SigningState> {
        let keys = self.begin_signing()?;
        let outcome = self.strategy.sign_file(&keys, path);
        self.finish(&keys, outcome)
    }

    /// Sign `content` with the resolved keys and write the signed bytes to `output`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if keys have not been resolved.
    pub fn sign_stream(
        &mut self,
        content: &[u8],
        output: &mut dyn Write,
    ) -> Result<&SigningState> {
        let keys = self.begin_signing()?;
        let outcome = self.strategy.sign_stream(&keys, content, output);
        self.finish(&keys, outcome)
    }

    /// Let `content` sign itself with the resolved private key.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if keys have not been resolved.
    pub fn sign_content(&mut self, content: &mut dyn SignableContent) -> Result<&SigningState> {
        let keys = self.begin_signing()?;
        let outcome = match keys.private_key() {
            Some(private_key) => self.strategy.sign_content(content, private_key),
            None => Err(Error::Configuration(
                "the resolved key has no private key".to_string(),
            )),
        };
        self.finish(&keys, outcome)
    }

    fn begin_signing(&mut self) -> Result<KeyMaterial> {
        if !matches!(self.state, SigningState::Resolved(_)) {
            return Err(Error::Configuration(format!(
                "cannot sign in state {:?}",
                self.state
            )));
        }

        match std::mem::replace(&mut self.state, SigningState::Signing) {
            SigningState::Resolved(keys) => Ok(keys),
            other => {
                self.state = other;
                Err(Error::Configuration("keys are not resolved".to_string()))
            }
        }
    }

    fn finish(&mut self, keys: &KeyMaterial, outcome: Result<()>) -> Result<&SigningState> {
        self.state = match outcome {
            Ok(()) => SigningState::Signed,
            Err(error) => {
                debug!("signing failed: {}", error);
                SigningState::Failed(self.failure(keys, &error))
            }
        };
        Ok(&self.state)
    }

    fn failure(&self, keys: &KeyMaterial, error: &Error) -> Diagnostic {
        if let Some(container) = keys.key_container() {
            return Diagnostic::public_key_container_failure(container, error.to_string());
        }

        let key_file = self
            .key_file
            .clone()
            .or_else(|| keys.key_file_path().map(|path| path.display().to_string()))
            .unwrap_or_default();
        Diagnostic::public_key_file_failure(key_file, error.to_string())
    }
}
