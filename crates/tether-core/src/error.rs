//! Protocol error kinds.
//!
//! One enumeration for every layer above the primitives. Server and client
//! surfaces report these; transports translate them into their own status
//! codes.

use tether_crypto::KeyError;
use thiserror::Error;

/// Errors surfaced by advertisement handling and the escrow protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Malformed key material, wrong classification, off-curve point or
    /// non-EC key.
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// What was wrong with the key
        reason: String,
    },

    /// No key is indexed under the thumbprint.
    #[error("key not found: {thumbprint}")]
    KeyNotFound {
        /// Thumbprint that was looked up
        thumbprint: String,
    },

    /// An advertisement needs at least one signing key.
    #[error("advertisement has no signing keys")]
    NoSigningKeys,

    /// An advertisement needs at least one exchange key.
    #[error("advertisement has no exchange keys")]
    NoExchangeKeys,

    /// A signed advertisement failed to validate against its own keys.
    #[error("signature verification failed: {reason}")]
    SignatureVerificationFailure {
        /// What failed to verify
        reason: String,
    },

    /// Content encryption failed.
    #[error("encryption failed: {reason}")]
    EncryptionFailure {
        /// Underlying failure
        reason: String,
    },

    /// The envelope could not be decrypted. Carries no detail.
    #[error("decryption failed")]
    DecryptionFailure,

    /// The recovery round trip failed.
    #[error("recovery failed: {reason}")]
    RecoveryFailure {
        /// Transport-level failure
        reason: String,
    },

    /// A key pair could not be generated.
    #[error("key generation failed: {reason}")]
    KeyGenerationFailure {
        /// Underlying failure
        reason: String,
    },
}

impl ProtocolError {
    /// Returns true if retrying the same call may succeed.
    ///
    /// Only recovery is retryable: the server computation is stateless, so
    /// repeating it with the same or a fresh blind is always safe. Every
    /// other kind is a property of the inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RecoveryFailure { .. })
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidKey { reason: reason.into() }
    }

    pub(crate) fn unverified(reason: impl Into<String>) -> Self {
        Self::SignatureVerificationFailure { reason: reason.into() }
    }
}

impl From<KeyError> for ProtocolError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::InvalidKey { reason } | KeyError::Signing { reason } => {
                Self::InvalidKey { reason }
            },
            KeyError::KeyGeneration { reason } => Self::KeyGenerationFailure { reason },
            KeyError::SignatureVerification { reason } => {
                Self::SignatureVerificationFailure { reason }
            },
            KeyError::Encryption { reason } => Self::EncryptionFailure { reason },
            KeyError::MalformedEnvelope { .. } | KeyError::Decryption => Self::DecryptionFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_recovery_is_retryable() {
        let kinds = [
            ProtocolError::invalid("x"),
            ProtocolError::KeyNotFound { thumbprint: "t".into() },
            ProtocolError::NoSigningKeys,
            ProtocolError::NoExchangeKeys,
            ProtocolError::unverified("x"),
            ProtocolError::EncryptionFailure { reason: "x".into() },
            ProtocolError::DecryptionFailure,
            ProtocolError::KeyGenerationFailure { reason: "x".into() },
        ];
        assert!(kinds.iter().all(|err| !err.is_retryable()));
        assert!(ProtocolError::RecoveryFailure { reason: "timeout".into() }.is_retryable());
    }

    #[test]
    fn not_found_is_distinct_from_invalid() {
        let not_found = ProtocolError::KeyNotFound { thumbprint: "abc".into() };

        assert!(!matches!(not_found, ProtocolError::InvalidKey { .. }));
        assert_eq!(not_found.to_string(), "key not found: abc");
    }

    #[test]
    fn malformed_envelope_hides_detail() {
        let err = ProtocolError::from(KeyError::MalformedEnvelope { reason: "iv".into() });

        assert_eq!(err, ProtocolError::DecryptionFailure);
        assert_eq!(err.to_string(), "decryption failed");
    }

    #[test]
    fn primitive_errors_map_to_kinds() {
        assert!(matches!(
            ProtocolError::from(KeyError::InvalidKey { reason: "r".into() }),
            ProtocolError::InvalidKey { .. }
        ));
        assert!(matches!(
            ProtocolError::from(KeyError::SignatureVerification { reason: "r".into() }),
            ProtocolError::SignatureVerificationFailure { .. }
        ));
        assert!(matches!(
            ProtocolError::from(KeyError::Encryption { reason: "r".into() }),
            ProtocolError::EncryptionFailure { .. }
        ));
        assert!(matches!(
            ProtocolError::from(KeyError::KeyGeneration { reason: "r".into() }),
            ProtocolError::KeyGenerationFailure { .. }
        ));
        assert_eq!(ProtocolError::from(KeyError::Decryption), ProtocolError::DecryptionFailure);
    }
}
