// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dotsign
//!
//! Strong-name key handling and signing for .NET assemblies, in pure Rust.
//!
//! A strong name binds an assembly's identity to an RSA public key and protects its content
//! with a signature made by the matching private key. `dotsign` covers everything between a
//! key option on a command line and the signature bytes in the output:
//!
//! - **Key blobs** - validation and conversion of `.snk` key pairs, raw public keys and the
//!   canonical public key format stored in assembly metadata ([`blob`])
//! - **Key resolution** - lookup of key files against ordered search paths on a substitutable
//!   filesystem ([`file`])
//! - **Key material** - the resolved key record, its public key token and signature size, with
//!   memoization of parsed key pairs ([`keys`])
//! - **Signing** - a host-service signer for finished files and an embedded RSA signer for
//!   images under construction ([`signing`])
//!
//! Problems with the user's keys are reported as [`Diagnostic`]s, not as errors: resolving
//! keys always succeeds, and the result tells whether it can sign.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dotsign::prelude::*;
//!
//! let options = SigningOptions::default()
//!     .with_key_file("key.snk")
//!     .with_search_paths(["/src/app"]);
//! let strategy = SigningStrategy::embedded(options.key_resolver(PhysicalFileSystem::shared())?);
//!
//! let keys = strategy.resolve_keys_for(&options)?;
//! let mut diagnostics: Vec<Diagnostic> = Vec::new();
//! options.check_keys(&keys, &mut diagnostics);
//! for diagnostic in &diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//!
//! if let Some(token) = keys.public_key_token(AssemblyHashAlgorithm::SHA1)? {
//!     println!("public key token: {:016x}", token);
//! }
//! # Ok::<(), dotsign::Error>(())
//! ```
//!
//! ## Key Blobs
//!
//! ```rust
//! use dotsign::blob::{is_valid_public_key, try_extract_public_key, ECMA_KEY};
//!
//! assert!(is_valid_public_key(&ECMA_KEY));
//! assert_eq!(try_extract_public_key(&[0x07; 10]), None);
//! ```
//!
//! ## Logging
//!
//! `dotsign` logs through the [`log`] facade: key file resolution and cache activity at
//! `debug`, rejected key blobs at `trace`, and a missing host signing service at `warn`.
//! Install any `log` implementation to see them.
//!
//! ## Development and Testing
//!
//! ### Fuzzing
//!
//! ```bash
//! # Run fuzzer
//! cargo +nightly fuzz run keyblob --release
//!
//! # Multi-core fuzzing
//! cargo +nightly fuzz run keyblob --release -- -jobs=4 -fork=1
//! ```
//!
//! ### Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```
#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotsign::prelude::*;
///
/// let keys = KeyMaterial::from_public_key(&ECMA_KEY);
/// assert!(keys.can_provide_strong_name());
/// ```
pub mod prelude;

pub mod blob;
pub mod config;
pub mod diagnostics;
pub mod file;
pub mod keys;
pub mod signing;

/// `dotsign` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
///
/// # Examples
///
/// ```rust,no_run
/// use dotsign::{Result, HostSigner, KeyMaterial};
///
/// fn sign(signer: &HostSigner, keys: &KeyMaterial) -> Result<()> {
///     signer.sign_file(keys, std::path::Path::new("out.dll"))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dotsign` Error type
///
/// The main error type for all fallible operations in this crate.
///
/// # Examples
///
/// ```rust
/// use dotsign::{Error, SigningOptions};
///
/// let options = SigningOptions::default()
///     .with_key_file("key.snk")
///     .with_key_container("MyContainer");
/// match options.validate() {
///     Err(Error::Configuration(message)) => println!("{}", message),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub use error::Error;

/// Caller-facing signing configuration.
pub use config::SigningOptions;

/// Structured diagnostics for key problems.
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Severity};

/// Resolved key material and its cache.
pub use keys::{KeyMaterial, KeyPairCache};

/// The signing strategies.
pub use signing::{EmbeddedSigner, HostSigner, SigningCapability, SigningStrategy};
