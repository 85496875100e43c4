//! Error types for key material and JOSE primitives.

use thiserror::Error;

/// Errors produced by the cryptographic primitives.
///
/// Protocol layers map these onto their own error kinds. `Decryption` carries
/// no detail on purpose: every failure after the envelope header has been
/// parsed collapses into it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Key material is malformed, non-EC, on an unsupported curve, or the
    /// point does not lie on its declared curve.
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// What was wrong with the key
        reason: String,
    },

    /// RNG or curve failure while generating a key pair.
    #[error("key generation failed: {reason}")]
    KeyGeneration {
        /// Underlying failure
        reason: String,
    },

    /// A signature could not be produced.
    #[error("signing failed: {reason}")]
    Signing {
        /// Underlying failure
        reason: String,
    },

    /// A signed payload is malformed or a signature did not verify.
    #[error("signature verification failed: {reason}")]
    SignatureVerification {
        /// What failed to verify
        reason: String,
    },

    /// Content encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption {
        /// Underlying failure
        reason: String,
    },

    /// The cipher envelope could not be decoded.
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// What was malformed
        reason: String,
    },

    /// Authenticated decryption failed.
    #[error("decryption failed")]
    Decryption,
}

impl KeyError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidKey { reason: reason.into() }
    }

    pub(crate) fn signature(reason: impl Into<String>) -> Self {
        Self::SignatureVerification { reason: reason.into() }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope { reason: reason.into() }
    }
}
