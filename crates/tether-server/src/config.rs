//! Server configuration.

use tether_crypto::ThumbprintAlgorithm;

/// Tunables for [`crate::ServerProtocol`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Hashes under which every key is indexed.
    ///
    /// Clients may address a key by any of them. Narrowing the set shrinks
    /// the indices but breaks clients that picked a dropped hash.
    pub thumbprint_algorithms: Vec<ThumbprintAlgorithm>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { thumbprint_algorithms: ThumbprintAlgorithm::ALL.to_vec() }
    }
}

impl ServerConfig {
    /// Replace the thumbprint hash set.
    #[must_use]
    pub fn with_thumbprint_algorithms(
        mut self,
        algorithms: impl IntoIterator<Item = ThumbprintAlgorithm>,
    ) -> Self {
        self.thumbprint_algorithms = algorithms.into_iter().collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_indexes_every_hash() {
        assert_eq!(ServerConfig::default().thumbprint_algorithms, ThumbprintAlgorithm::ALL);
    }

    #[test]
    fn narrowed_hash_set() {
        let config =
            ServerConfig::default().with_thumbprint_algorithms([ThumbprintAlgorithm::Sha256]);
        assert_eq!(config.thumbprint_algorithms, [ThumbprintAlgorithm::Sha256]);
    }
}
