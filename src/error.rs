//! Error type shared by every module of the crate.

use thiserror::Error;

use crate::key::KeyAlgorithm;
use crate::profile::Role;

/// Represents errors that can occur while building, signing or parsing certificates.
///
/// Variants raised by profile construction carry the role and stage so the
/// `Display` output can be logged as-is.
#[derive(Debug, Error, Clone)]
pub enum CertProfileError {
    /// A signing request reached the adapter without a public key.
    #[error("{role} profile: signing request has no public key")]
    MissingPublicKey { role: Role },

    /// A configuration mutator rejected its input.
    #[error("{role} profile: option `{mutator}` rejected: {reason}")]
    MutatorError {
        role: Role,
        mutator: &'static str,
        reason: String,
    },

    /// Error during key generation. `role` is set when a profile was generating
    /// its subject key.
    #[error(
        "{}key generation error ({algorithm}): {reason}",
        .role.map(|role| format!("{role} profile: ")).unwrap_or_default()
    )]
    KeyGenerationError {
        role: Option<Role>,
        algorithm: KeyAlgorithm,
        reason: String,
    },

    /// The template or issuer material cannot produce a valid certificate.
    #[error("{role} profile: signing failed: {reason}")]
    SigningError { role: Role, reason: String },

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The CA service collaborator failed to answer.
    #[error("CA service error: {0}")]
    CaService(String),
}

impl From<der::Error> for CertProfileError {
    /// Converts a `der::Error` into a `CertProfileError`.
    fn from(err: der::Error) -> Self {
        CertProfileError::DecodingError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for CertProfileError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        CertProfileError::DecodingError(err.to_string())
    }
}

impl From<const_oid::Error> for CertProfileError {
    fn from(err: const_oid::Error) -> Self {
        CertProfileError::DecodingError(err.to_string())
    }
}
