//! Server side of the escrow protocol.
//!
//! # Recovery
//!
//! The client sends a blinded point `x = c + E` addressed by the thumbprint
//! of the exchange key `s` it encrypted against. The server answers
//! `y = x·S` and learns nothing: `x` is uniformly random from its point of
//! view, and `y` alone does not let anyone derive the content key without
//! the client's blind `E`.
//!
//! # Invariants
//!
//! - Both indices are built in [`ServerProtocol::with_config`] and never
//!   mutated. Every method takes `&self`.
//! - `recover` is a pure function of its arguments: identical requests get
//!   byte-identical responses.
//! - The request point is checked against the server key's curve before any
//!   multiplication.

use tether_core::{Advertisement, ProtocolError, ThumbprintIndex};
use tether_crypto::{KeyMaterial, exchange};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

/// Index key of the advertisement served without a thumbprint.
pub const DEFAULT_ADVERTISEMENT: &str = "";

/// Advertisement and recovery lookups over a fixed key set.
#[derive(Debug, Clone)]
pub struct ServerProtocol {
    /// Signing key thumbprint (or `""`) to signed advertisement
    advertisements: ThumbprintIndex<Vec<u8>>,
    /// Exchange key thumbprint to private exchange key
    exchange_keys: ThumbprintIndex<KeyMaterial>,
}

impl ServerProtocol {
    /// Build from `keys` with the default configuration.
    ///
    /// # Errors
    ///
    /// As for [`ServerProtocol::with_config`].
    pub fn new(keys: impl IntoIterator<Item = KeyMaterial>) -> Result<Self, ProtocolError> {
        Self::with_config(keys, ServerConfig::default())
    }

    /// Build both indices from `keys`.
    ///
    /// The advertisement is signed once here. Its bytes are stored under
    /// [`DEFAULT_ADVERTISEMENT`] and under every thumbprint of every
    /// signing key; each exchange key is stored under every one of its
    /// thumbprints.
    ///
    /// # Errors
    ///
    /// - `NoSigningKeys` / `NoExchangeKeys`: a role is missing from `keys`
    /// - `InvalidKey`: a signing key has no private scalar
    pub fn with_config(
        keys: impl IntoIterator<Item = KeyMaterial>,
        config: ServerConfig,
    ) -> Result<Self, ProtocolError> {
        let advertisement = Advertisement::new(keys)?;
        let signed = advertisement.marshal()?;
        let algorithms = config.thumbprint_algorithms.as_slice();

        let mut advertisements = ThumbprintIndex::new();
        for key in advertisement.signing_keys() {
            advertisements.insert_key(key, signed.clone(), algorithms);
        }
        advertisements.insert(DEFAULT_ADVERTISEMENT, signed);

        let mut exchange_keys = ThumbprintIndex::new();
        for key in advertisement.exchange_keys() {
            exchange_keys.insert_key(key, key.clone(), algorithms);
        }

        info!(
            exchange_keys = advertisement.exchange_keys().len(),
            signing_keys = advertisement.signing_keys().len(),
            thumbprint_algorithms = algorithms.len(),
            "server keys indexed"
        );

        Ok(Self { advertisements, exchange_keys })
    }

    /// Signed advertisement stored under `thumbprint`.
    ///
    /// `""` selects the default advertisement. Absence is the only failure
    /// mode; transports typically answer it with 404.
    pub fn advertisement(&self, thumbprint: &str) -> Option<&[u8]> {
        self.advertisements.get(thumbprint).map(Vec::as_slice)
    }

    /// Answer a blinded recovery request with `y = x·S`.
    ///
    /// `request` is the JSON JWK of `x`; the response is the JSON JWK of
    /// `y`, a public exchange key.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: `request` is not a JWK, not an exchange key, or not
    ///   on the curve of the addressed key
    /// - `KeyNotFound`: no exchange key has `thumbprint`
    pub fn recover(&self, thumbprint: &str, request: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let result = self.compute_recovery(thumbprint, request);
        match &result {
            Ok(_) => debug!(thumbprint, "recovery request served"),
            Err(err) => warn!(thumbprint, error = %err, "recovery request rejected"),
        }
        result
    }

    fn compute_recovery(&self, thumbprint: &str, request: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let x = KeyMaterial::from_json(request).map_err(|err| ProtocolError::InvalidKey {
            reason: format!("recovery request: {err}"),
        })?;
        if !x.is_exchange() {
            return Err(ProtocolError::InvalidKey {
                reason: "recovery request is not an exchange key".to_string(),
            });
        }

        let server_key = self
            .exchange_keys
            .get(thumbprint)
            .ok_or_else(|| ProtocolError::KeyNotFound { thumbprint: thumbprint.to_string() })?;
        if !server_key.is_private() {
            return Err(ProtocolError::InvalidKey {
                reason: format!("server key {thumbprint} has no private part"),
            });
        }
        if !exchange::is_on_curve(&x, server_key) {
            return Err(ProtocolError::InvalidKey {
                reason: format!(
                    "off-curve point: request is on {}, server key on {}",
                    x.curve(),
                    server_key.curve()
                ),
            });
        }

        let y = exchange::multiply(&x, server_key)?;
        Ok(y.to_json()?)
    }

    /// Thumbprints with a stored advertisement, including `""`.
    pub fn advertised_thumbprints(&self) -> impl Iterator<Item = &str> {
        self.advertisements.thumbprints()
    }

    /// Thumbprints that address an exchange key.
    pub fn exchange_thumbprints(&self) -> impl Iterator<Item = &str> {
        self.exchange_keys.thumbprints()
    }
}
