//! Signed advertisements of a server's exchange and signing keys.
//!
//! On the wire an advertisement is a JWS whose payload is the public JWK Set
//! of every advertised key, signed once by each signing key in that set.
//!
//! # Trust Model
//!
//! Parsing trusts only the keys inside the payload. An attacker can sign
//! any key set with keys of their own, so a signature is worth nothing
//! unless its key is one of the signing keys the payload advertises. The
//! whole document is rejected unless:
//!
//! - every advertised signing key produced a valid signature, and
//! - every signature verifies under some advertised signing key

use tether_crypto::{
    Jwk, KEY_SET_CONTENT_TYPE, KeyMaterial, KeyRole, KeySet, SignatureAlgorithm, SignedPayload,
    ThumbprintAlgorithm,
};
use tracing::debug;

use crate::error::ProtocolError;

/// A validated set of exchange and signing keys.
///
/// Both partitions are non-empty. Keys that are neither exchange nor signing
/// keys are dropped at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    exchange_keys: KeySet,
    signing_keys: KeySet,
}

impl Advertisement {
    /// Partition `keys` by role.
    ///
    /// # Errors
    ///
    /// - `NoSigningKeys`: no key classifies as a signing key
    /// - `NoExchangeKeys`: no key classifies as an exchange key
    pub fn new(keys: impl IntoIterator<Item = KeyMaterial>) -> Result<Self, ProtocolError> {
        let mut exchange_keys = KeySet::new();
        let mut signing_keys = KeySet::new();
        let mut ignored = 0usize;

        for key in keys {
            match key.classify() {
                KeyRole::Exchange => {
                    exchange_keys.insert(key);
                },
                KeyRole::Signing => {
                    signing_keys.insert(key);
                },
                KeyRole::Unclassified => ignored += 1,
            }
        }

        if ignored > 0 {
            debug!(ignored, "dropping unclassified keys from advertisement");
        }
        if signing_keys.is_empty() {
            return Err(ProtocolError::NoSigningKeys);
        }
        if exchange_keys.is_empty() {
            return Err(ProtocolError::NoExchangeKeys);
        }

        Ok(Self { exchange_keys, signing_keys })
    }

    /// Like [`Advertisement::new`], from raw JWKs.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: a JWK is not a valid EC key; the message names its
    ///   index
    /// - `NoSigningKeys` / `NoExchangeKeys`: as for `new`
    pub fn from_jwks(jwks: impl IntoIterator<Item = Jwk>) -> Result<Self, ProtocolError> {
        let keys = jwks
            .into_iter()
            .enumerate()
            .map(|(index, jwk)| {
                KeyMaterial::try_from(jwk)
                    .map_err(|err| ProtocolError::invalid(format!("key {index}: {err}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(keys)
    }

    /// Sign the public projection of every key, once per signing key.
    ///
    /// Signatures are deterministic, so marshaling the same advertisement
    /// twice yields identical bytes.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: a signing key has no private scalar, as in any
    ///   advertisement obtained from [`Advertisement::parse`]
    pub fn marshal(&self) -> Result<Vec<u8>, ProtocolError> {
        let payload = self.keys().public().to_json()?;
        let signers: Vec<&KeyMaterial> = self.signing_keys.iter().collect();
        let signed = SignedPayload::sign(&payload, KEY_SET_CONTENT_TYPE, &signers)?;
        Ok(signed.to_json()?)
    }

    /// Decode and verify a signed advertisement.
    ///
    /// # Errors
    ///
    /// - `SignatureVerificationFailure`: the document is malformed, uses an
    ///   algorithm outside `accepted`, or fails the trust rules above
    /// - `InvalidKey`: the payload is not a public EC key set
    /// - `NoSigningKeys` / `NoExchangeKeys`: the payload lacks a role
    pub fn parse(bytes: &[u8], accepted: &[SignatureAlgorithm]) -> Result<Self, ProtocolError> {
        let signed = SignedPayload::parse(bytes, accepted)?;
        if signed.content_types().any(|cty| cty.is_some_and(|cty| cty != KEY_SET_CONTENT_TYPE)) {
            return Err(ProtocolError::unverified("payload is not a JWK set"));
        }

        let keys = KeySet::from_json(&signed.unverified_payload()?)?;
        if keys.has_private() {
            return Err(ProtocolError::invalid("advertisement exposes a private key"));
        }
        let advertisement = Self::new(keys)?;

        let mut covered = vec![false; signed.signature_count()];
        for key in &advertisement.signing_keys {
            let mut signed_by_key = false;
            for (index, covered) in covered.iter_mut().enumerate() {
                if signed.verify_signature(index, key).is_ok() {
                    *covered = true;
                    signed_by_key = true;
                }
            }
            if !signed_by_key {
                return Err(ProtocolError::unverified(format!(
                    "advertised signing key {} has no valid signature",
                    key.thumbprint(ThumbprintAlgorithm::Sha256)
                )));
            }
        }
        if let Some(index) = covered.iter().position(|covered| !covered) {
            return Err(ProtocolError::unverified(format!(
                "signature {index} is not from an advertised signing key"
            )));
        }

        debug!(
            exchange = advertisement.exchange_keys.len(),
            signing = advertisement.signing_keys.len(),
            "advertisement verified"
        );
        Ok(advertisement)
    }

    /// Exchange keys, in input order.
    pub fn exchange_keys(&self) -> &KeySet {
        &self.exchange_keys
    }

    /// Signing keys, in input order.
    pub fn signing_keys(&self) -> &KeySet {
        &self.signing_keys
    }

    /// Exchange keys followed by signing keys.
    pub fn keys(&self) -> KeySet {
        self.exchange_keys.iter().chain(&self.signing_keys).cloned().collect()
    }

    /// Exchange key whose thumbprint under any of `algorithms` equals
    /// `thumbprint`.
    pub fn exchange_key(
        &self,
        thumbprint: &str,
        algorithms: &[ThumbprintAlgorithm],
    ) -> Option<&KeyMaterial> {
        self.exchange_keys
            .iter()
            .find(|key| key.thumbprints(algorithms).iter().any(|thp| thp == thumbprint))
    }
}
