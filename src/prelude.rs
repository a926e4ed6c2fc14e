//! # dotsign Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dotsign library. Import this module to get quick access to the essential
//! types for resolving strong-name keys and signing output.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotsign operations
pub use crate::Error;

/// The result type used throughout dotsign
pub use crate::Result;

/// Caller-facing signing configuration
pub use crate::SigningOptions;

// ================================================================================================
// Key Material
// ================================================================================================

/// Resolved key material and the cache of parsed key pairs
pub use crate::keys::{KeyMaterial, KeyPairCache};

/// Key blob validation and conversion
pub use crate::blob::{
    is_valid_public_key, try_extract_public_key, try_parse_key, AssemblyHashAlgorithm,
    RsaParameters, ECMA_KEY,
};

// ================================================================================================
// Key Files
// ================================================================================================

/// Filesystem capability and its backends
pub use crate::file::{KeyFileSystem, KeyResolver, MemoryFileSystem, PhysicalFileSystem};

// ================================================================================================
// Signing
// ================================================================================================

/// Signing strategies and the content they sign
pub use crate::signing::{
    EmbeddedSigner, HostSigner, HostSigningProvider, ReservedSignatureImage, SignableContent,
    SigningCapability, SigningRequest, SigningState, SigningStrategy,
};

// ================================================================================================
// Diagnostics
// ================================================================================================

/// Structured diagnostics and their receiver
pub use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Severity};
