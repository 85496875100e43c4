//! Client configuration.

use tether_crypto::{SignatureAlgorithm, ThumbprintAlgorithm};

/// Tunables for [`crate::ClientProtocol`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Signature algorithms an advertisement may be signed with.
    pub accepted_signature_algorithms: Vec<SignatureAlgorithm>,

    /// Hash of the thumbprint that addresses the server key at recovery.
    ///
    /// Must be one the server indexes under.
    pub thumbprint_algorithm: ThumbprintAlgorithm,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            accepted_signature_algorithms: SignatureAlgorithm::ALL.to_vec(),
            thumbprint_algorithm: ThumbprintAlgorithm::Sha256,
        }
    }
}
