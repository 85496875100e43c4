//! Client side of the escrow protocol.
//!
//! # Invariants
//!
//! - The client private key `C` and the shared point `K` never leave
//!   [`ClientProtocol::encrypt`]; both are dropped (and zeroized) before it
//!   returns.
//! - Every [`ClientProtocol::decrypt`] draws a fresh blind, so no two
//!   recovery transcripts for the same envelope are related.
//! - Decryption failures carry no detail about which step failed.

use std::fmt;

use rand_core::{CryptoRngCore, OsRng};
use tether_core::{Advertisement, ProtocolError};
use tether_crypto::{Algorithm, Binding, Envelope, KeyMaterial, KeyUse, exchange};
use tracing::{debug, warn};

use crate::config::ClientConfig;

/// The network round trip of a recovery.
///
/// Implementations send `request` (the blinded point `x` as a JWK) to the
/// server holding the key addressed by `thumbprint` and return its answer
/// `y`. The exchange is stateless, so implementations may retry freely.
///
/// Any closure `Fn(&str, &[u8]) -> Result<Vec<u8>, E>` is a handler.
pub trait RecoveryHandler {
    /// Transport failure.
    type Error: fmt::Display;

    /// Ask the server for `y = x·S`.
    fn recover(&self, thumbprint: &str, request: &[u8]) -> Result<Vec<u8>, Self::Error>;
}

impl<F, E> RecoveryHandler for F
where
    F: Fn(&str, &[u8]) -> Result<Vec<u8>, E>,
    E: fmt::Display,
{
    type Error = E;

    fn recover(&self, thumbprint: &str, request: &[u8]) -> Result<Vec<u8>, E> {
        self(thumbprint, request)
    }
}

/// Encrypts against an advertised exchange key and decrypts with the
/// server's help.
///
/// Holds configuration only. Randomness comes from the OS for every call,
/// or from the caller through the `_with_rng` variants.
#[derive(Debug, Clone, Default)]
pub struct ClientProtocol {
    config: ClientConfig,
}

impl ClientProtocol {
    /// Client with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client with `config`.
    pub fn with_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Verify a signed advertisement with the accepted algorithms.
    ///
    /// # Errors
    ///
    /// As for [`Advertisement::parse`].
    pub fn parse_advertisement(&self, bytes: &[u8]) -> Result<Advertisement, ProtocolError> {
        Advertisement::parse(bytes, &self.config.accepted_signature_algorithms)
    }

    /// Seal `data` against the server exchange key `s`.
    ///
    /// Returns the compact envelope. It records the client public key `c`,
    /// `s` and its thumbprint, which is everything [`ClientProtocol::decrypt`]
    /// needs besides the server.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: `s` is not an exchange key
    /// - `KeyGenerationFailure`: the client key could not be generated
    /// - `EncryptionFailure`: the cipher failed
    pub fn encrypt(&self, data: &[u8], s: &KeyMaterial) -> Result<Vec<u8>, ProtocolError> {
        self.encrypt_with_rng(data, s, &mut OsRng)
    }

    /// [`ClientProtocol::encrypt`] with a caller-supplied RNG.
    pub fn encrypt_with_rng(
        &self,
        data: &[u8],
        s: &KeyMaterial,
        rng: &mut impl CryptoRngCore,
    ) -> Result<Vec<u8>, ProtocolError> {
        if !s.is_exchange() {
            return Err(ProtocolError::InvalidKey {
                reason: "encryption key is not an exchange key".to_string(),
            });
        }

        let client = exchange_key(s, rng)?;
        let shared = exchange::multiply(s, &client)?;

        let thp = s.thumbprint(self.config.thumbprint_algorithm);
        debug!(curve = %s.curve(), thp = %thp, "sealing envelope");
        let binding = Binding { thp, jwk: s.public() };
        let envelope = Envelope::seal(data, &shared, &client, binding, rng)?;

        Ok(envelope.to_compact().into_bytes())
    }

    /// Seal `data` against the first exchange key of a verified
    /// advertisement.
    ///
    /// # Errors
    ///
    /// As for [`ClientProtocol::encrypt`].
    pub fn encrypt_with_advertisement(
        &self,
        data: &[u8],
        advertisement: &Advertisement,
    ) -> Result<Vec<u8>, ProtocolError> {
        let s = advertisement.exchange_keys().iter().next().ok_or(ProtocolError::NoExchangeKeys)?;
        self.encrypt(data, s)
    }

    /// Open an envelope produced by [`ClientProtocol::encrypt`], asking
    /// `handler` for the server's half.
    ///
    /// # Errors
    ///
    /// - `DecryptionFailure`: the envelope is malformed or does not
    ///   authenticate
    /// - `RecoveryFailure`: `handler` failed; retrying is safe
    /// - `InvalidKey`: the server answered with something other than a
    ///   point on the expected curve
    pub fn decrypt(
        &self,
        envelope: &[u8],
        handler: &impl RecoveryHandler,
    ) -> Result<Vec<u8>, ProtocolError> {
        self.decrypt_with_rng(envelope, handler, &mut OsRng)
    }

    /// [`ClientProtocol::decrypt`] with a caller-supplied RNG.
    ///
    /// The RNG must not be shared with concurrent calls; reusing a blind
    /// links the transcripts it appears in.
    pub fn decrypt_with_rng(
        &self,
        envelope: &[u8],
        handler: &impl RecoveryHandler,
        rng: &mut impl CryptoRngCore,
    ) -> Result<Vec<u8>, ProtocolError> {
        let envelope = Envelope::parse(envelope)?;
        let header = envelope.header();
        let s = &header.binding.jwk;
        let c = &header.epk;
        let thp = header.binding.thp.as_str();

        let blind = exchange_key(s, rng)?;
        let x = exchange::add(c, &blind.public())?;

        let response = handler.recover(thp, &x.to_json()?).map_err(|err| {
            warn!(thp, error = %err, "recovery request failed");
            ProtocolError::RecoveryFailure { reason: err.to_string() }
        })?;

        let y = KeyMaterial::from_json(&response).map_err(|err| ProtocolError::InvalidKey {
            reason: format!("recovery response: {err}"),
        })?;
        if y.curve() != s.curve() {
            return Err(ProtocolError::InvalidKey {
                reason: format!("recovery response is on {}, expected {}", y.curve(), s.curve()),
            });
        }

        let z = exchange::multiply(s, &blind)?;
        let shared = exchange::subtract(&y, &z)?;

        let data = envelope.open(&shared)?;
        debug!(thp, "envelope opened");
        Ok(data)
    }
}

fn exchange_key(
    on: &KeyMaterial,
    rng: &mut impl CryptoRngCore,
) -> Result<KeyMaterial, ProtocolError> {
    Ok(KeyMaterial::generate_with_rng(
        on.curve(),
        Some(Algorithm::Exchange),
        Some(KeyUse::Exchange),
        rng,
    )?)
}
