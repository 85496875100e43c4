//! EC key material and its JWK wire form.
//!
//! [`KeyMaterial`] is always a valid EC key: its point lies on its curve and
//! its private scalar, when present, is in range. The looser [`Jwk`] struct
//! is what actually crosses the wire; conversion between the two is where
//! non-EC keys and malformed coordinates get rejected.

use std::fmt;

use rand_core::{CryptoRngCore, OsRng};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    b64,
    curve::{Coordinates, Curve, SignatureAlgorithm},
    error::KeyError,
    thumbprint::{self, ThumbprintAlgorithm},
};

/// `alg` marking a key for the blinded exchange.
pub const EXCHANGE_ALGORITHM: &str = "ECMR";

/// `use` marking a key for the blinded exchange.
pub const EXCHANGE_USE: &str = "exchange";

/// `use` marking a key that signs advertisements.
pub const SIGNING_USE: &str = "signECMR";

/// Algorithm tag carried in a key's `alg` member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// The exchange marker, `ECMR`
    Exchange,
    /// An ECDSA signature algorithm
    Signature(SignatureAlgorithm),
    /// Any other value, kept verbatim
    Other(String),
}

impl Algorithm {
    /// Wire spelling.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exchange => EXCHANGE_ALGORITHM,
            Self::Signature(alg) => alg.name(),
            Self::Other(name) => name,
        }
    }

    /// Interpret a wire value. Unknown values are preserved, not rejected.
    pub fn from_name(name: &str) -> Self {
        if name == EXCHANGE_ALGORITHM {
            return Self::Exchange;
        }
        SignatureAlgorithm::from_name(name)
            .map_or_else(|| Self::Other(name.to_string()), Self::Signature)
    }
}

impl From<SignatureAlgorithm> for Algorithm {
    fn from(alg: SignatureAlgorithm) -> Self {
        Self::Signature(alg)
    }
}

/// Use tag carried in a key's `use` member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyUse {
    /// `exchange`
    Exchange,
    /// `signECMR`
    Signing,
    /// Any other value, kept verbatim
    Other(String),
}

impl KeyUse {
    /// Wire spelling.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exchange => EXCHANGE_USE,
            Self::Signing => SIGNING_USE,
            Self::Other(name) => name,
        }
    }

    /// Interpret a wire value. Unknown values are preserved, not rejected.
    pub fn from_name(name: &str) -> Self {
        match name {
            EXCHANGE_USE => Self::Exchange,
            SIGNING_USE => Self::Signing,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Role a key plays, derived from its tags alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// `alg = ECMR` and `use = exchange`
    Exchange,
    /// `use = signECMR`
    Signing,
    /// Neither
    Unclassified,
}

/// JSON Web Key exactly as it appears on the wire.
///
/// No validation happens here. Convert to [`KeyMaterial`] to get a checked
/// EC key; that conversion is the rejection point for every other key type.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type; only `EC` is accepted
    pub kty: String,
    /// Curve name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// Base64url x coordinate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// Base64url y coordinate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Base64url private scalar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// Algorithm tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Use tag
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// Key id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Jwk {
    /// Thumbprints of this key's public members.
    ///
    /// Fails with `InvalidKey` when the members cannot be reduced to a
    /// canonical EC form, for example an `oct` key with no coordinates.
    pub fn thumbprints(&self, algorithms: &[ThumbprintAlgorithm]) -> Result<Vec<String>, KeyError> {
        let public = Self {
            kty: self.kty.clone(),
            crv: self.crv.clone(),
            x: self.x.clone(),
            y: self.y.clone(),
            ..Self::default()
        };
        let key = KeyMaterial::try_from(public)?;
        Ok(key.thumbprints(algorithms))
    }
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("d", &self.d.as_ref().map(|_| "<redacted>"))
            .field("alg", &self.alg)
            .field("use", &self.key_use)
            .field("kid", &self.kid)
            .finish()
    }
}

/// A validated EC key, public or private.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Jwk", into = "Jwk")]
pub struct KeyMaterial {
    curve: Curve,
    x: Vec<u8>,
    y: Vec<u8>,
    d: Option<Zeroizing<Vec<u8>>>,
    algorithm: Option<Algorithm>,
    key_use: Option<KeyUse>,
    kid: Option<String>,
}

impl KeyMaterial {
    /// Public key from raw big-endian coordinates.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: wrong coordinate width or the point is off the curve
    pub fn from_coordinates(curve: Curve, x: Vec<u8>, y: Vec<u8>) -> Result<Self, KeyError> {
        curve.check_point(&x, &y)?;
        Ok(Self { curve, x, y, d: None, algorithm: None, key_use: None, kid: None })
    }

    /// Generate a fresh key pair from the OS RNG.
    pub fn generate(
        curve: Curve,
        algorithm: Option<Algorithm>,
        key_use: Option<KeyUse>,
    ) -> Result<Self, KeyError> {
        Self::generate_with_rng(curve, algorithm, key_use, &mut OsRng)
    }

    /// Generate a fresh key pair from a caller-supplied RNG.
    ///
    /// # Errors
    ///
    /// - `KeyGeneration`: the curve produced an unusable point
    pub fn generate_with_rng(
        curve: Curve,
        algorithm: Option<Algorithm>,
        key_use: Option<KeyUse>,
        rng: &mut impl CryptoRngCore,
    ) -> Result<Self, KeyError> {
        let (Coordinates { x, y }, d) = curve.random_key(rng)?;
        Ok(Self { curve, x, y, d: Some(d), algorithm, key_use, kid: None })
    }

    /// Generate a private exchange key (`ECMR`, `exchange`).
    pub fn generate_exchange(curve: Curve) -> Result<Self, KeyError> {
        Self::generate(curve, Some(Algorithm::Exchange), Some(KeyUse::Exchange))
    }

    /// Generate a private signing key whose algorithm follows the curve.
    pub fn generate_signing(curve: Curve) -> Result<Self, KeyError> {
        Self::generate(
            curve,
            Some(Algorithm::Signature(curve.signature_algorithm())),
            Some(KeyUse::Signing),
        )
    }

    /// Wrap a computed point as a public exchange key.
    pub(crate) fn exchange_point(curve: Curve, point: Coordinates) -> Self {
        Self {
            curve,
            x: point.x,
            y: point.y,
            d: None,
            algorithm: Some(Algorithm::Exchange),
            key_use: Some(KeyUse::Exchange),
            kid: None,
        }
    }

    /// Set the algorithm tag.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Set the use tag.
    #[must_use]
    pub fn with_use(mut self, key_use: KeyUse) -> Self {
        self.key_use = Some(key_use);
        self
    }

    /// Set the key id.
    #[must_use]
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    /// Role implied by the tags. Private scalar presence is irrelevant.
    pub fn classify(&self) -> KeyRole {
        match (&self.algorithm, &self.key_use) {
            (Some(Algorithm::Exchange), Some(KeyUse::Exchange)) => KeyRole::Exchange,
            (_, Some(KeyUse::Signing)) => KeyRole::Signing,
            _ => KeyRole::Unclassified,
        }
    }

    /// Whether this is an exchange key.
    pub fn is_exchange(&self) -> bool {
        self.classify() == KeyRole::Exchange
    }

    /// Whether this is a signing key.
    pub fn is_signing(&self) -> bool {
        self.classify() == KeyRole::Signing
    }

    /// Independent copy with the private scalar removed.
    pub fn public(&self) -> Self {
        Self {
            curve: self.curve,
            x: self.x.clone(),
            y: self.y.clone(),
            d: None,
            algorithm: self.algorithm.clone(),
            key_use: self.key_use.clone(),
            kid: self.kid.clone(),
        }
    }

    /// Thumbprint under a single hash.
    pub fn thumbprint(&self, algorithm: ThumbprintAlgorithm) -> String {
        thumbprint::thumbprint(self, algorithm)
    }

    /// One thumbprint per requested hash, in the order requested.
    pub fn thumbprints(&self, algorithms: &[ThumbprintAlgorithm]) -> Vec<String> {
        thumbprint::thumbprints(self, algorithms)
    }

    /// Curve the key lives on.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Big-endian x coordinate.
    pub fn x(&self) -> &[u8] {
        &self.x
    }

    /// Big-endian y coordinate.
    pub fn y(&self) -> &[u8] {
        &self.y
    }

    /// Algorithm tag, if any.
    pub fn algorithm(&self) -> Option<&Algorithm> {
        self.algorithm.as_ref()
    }

    /// Use tag, if any.
    pub fn key_use(&self) -> Option<&KeyUse> {
        self.key_use.as_ref()
    }

    /// Key id, if any.
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Whether the private scalar is present.
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    pub(crate) fn scalar(&self) -> Option<&[u8]> {
        self.d.as_deref().map(Vec::as_slice)
    }

    /// Parse a JWK document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, KeyError> {
        let jwk: Jwk = serde_json::from_slice(bytes)
            .map_err(|err| KeyError::invalid(format!("not a JWK: {err}")))?;
        Self::try_from(jwk)
    }

    /// Serialize as a JWK document, including `d` when present.
    pub fn to_json(&self) -> Result<Vec<u8>, KeyError> {
        serde_json::to_vec(&Jwk::from(self))
            .map_err(|err| KeyError::invalid(format!("JWK serialization: {err}")))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("curve", &self.curve)
            .field("x", &b64::encode(&self.x))
            .field("y", &b64::encode(&self.y))
            .field("private", &self.d.is_some())
            .field("alg", &self.algorithm.as_ref().map(Algorithm::as_str))
            .field("use", &self.key_use.as_ref().map(KeyUse::as_str))
            .field("kid", &self.kid)
            .finish()
    }
}

fn decode_member(value: Option<&str>, member: &str, width: usize) -> Result<Vec<u8>, KeyError> {
    let text = value.ok_or_else(|| KeyError::invalid(format!("missing {member}")))?;
    let bytes =
        b64::decode(text).map_err(|err| KeyError::invalid(format!("bad base64 in {member}: {err}")))?;
    if bytes.len() != width {
        return Err(KeyError::invalid(format!(
            "{member} must be {width} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

impl TryFrom<Jwk> for KeyMaterial {
    type Error = KeyError;

    fn try_from(jwk: Jwk) -> Result<Self, Self::Error> {
        if jwk.kty != "EC" {
            return Err(KeyError::invalid(format!(
                "unsupported key type {:?}, only EC keys are accepted",
                jwk.kty
            )));
        }

        let curve: Curve = jwk.crv.as_deref().ok_or_else(|| KeyError::invalid("missing crv"))?.parse()?;
        let width = curve.field_size();
        let x = decode_member(jwk.x.as_deref(), "x", width)?;
        let y = decode_member(jwk.y.as_deref(), "y", width)?;
        curve.check_point(&x, &y)?;

        let d = match jwk.d.as_deref() {
            Some(text) => {
                let d = Zeroizing::new(decode_member(Some(text), "d", width)?);
                curve.check_scalar(&d)?;
                Some(d)
            },
            None => None,
        };

        Ok(Self {
            curve,
            x,
            y,
            d,
            algorithm: jwk.alg.as_deref().map(Algorithm::from_name),
            key_use: jwk.key_use.as_deref().map(KeyUse::from_name),
            kid: jwk.kid,
        })
    }
}

impl From<&KeyMaterial> for Jwk {
    fn from(key: &KeyMaterial) -> Self {
        Self {
            kty: "EC".to_string(),
            crv: Some(key.curve.name().to_string()),
            x: Some(b64::encode(&key.x)),
            y: Some(b64::encode(&key.y)),
            d: key.d.as_deref().map(|d| b64::encode(d)),
            alg: key.algorithm.as_ref().map(|alg| alg.as_str().to_string()),
            key_use: key.key_use.as_ref().map(|u| u.as_str().to_string()),
            kid: key.kid.clone(),
        }
    }
}

impl From<KeyMaterial> for Jwk {
    fn from(key: KeyMaterial) -> Self {
        Self::from(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXCHANGE_KEY: &str = r#"{
        "alg": "ECMR",
        "crv": "P-521",
        "d": "AbvskQAdy2M7MHSKvR45mGJLEgUq1-RAngkY3mEdrm-x6-qQGGDX0hQ89NvoERuVwxwhitskrLzC0VTrZ9mBArMN",
        "key_ops": ["deriveKey"],
        "kid": "2c739699-f497-46f9-8f8a-66d237c08a29",
        "kty": "EC",
        "use": "exchange",
        "x": "AQ9iDNelRXRZZQTTpzR7imHIMGYG1-qQ6uif6Lj6eFpbUMf07gydd6K9Z2HQ_DAfRgf5JiQhrUdXzwB5xCqB53Pc",
        "y": "AIpTGuqfOMSLP0cNl1J8rQfgamnIMuTDcUrk3dSpif8jD2cKWTJaaIhffPG2XLxaJtSNZNGFZXvObhBghb_8X8GQ"
    }"#;

    #[test]
    fn parse_fixture_exchange_key() {
        let key = KeyMaterial::from_json(EXCHANGE_KEY.as_bytes()).unwrap();

        assert_eq!(key.curve(), Curve::P521);
        assert!(key.is_private());
        assert_eq!(key.classify(), KeyRole::Exchange);
        assert_eq!(key.kid(), Some("2c739699-f497-46f9-8f8a-66d237c08a29"));
    }

    #[test]
    fn known_thumbprints() {
        let key = KeyMaterial::from_json(EXCHANGE_KEY.as_bytes()).unwrap();
        let thumbprints = key.thumbprints(&ThumbprintAlgorithm::ALL);

        assert_eq!(thumbprints, vec![
            "Df47LNdor1oVr6xISuChUXbj2q0",
            "GuIAxOWv1NAoWYEguypQjXE_drCj2TadLlv78w",
            "KSe1QeNcn6fywygz6fZgXzZRGAdZu7B--sEZd_NtxRY",
            "tOfa-_ZTYEIucccDyiZ6YJhuk6W_9um0Vt4cr_o4-r04NAMGQbVj68JJ2HeEkjdC",
            "tMpezkL5DAh6PYVgA6CLfE5JKePx3R6Rpqryplm4LfcZDowKCKL-P0LPPPV6pvmg_dfzTaQdRIcgr4jjRvjBlQ",
        ]);
    }

    #[test]
    fn thumbprint_order_follows_request() {
        let key = KeyMaterial::from_json(EXCHANGE_KEY.as_bytes()).unwrap();
        let forward =
            key.thumbprints(&[ThumbprintAlgorithm::Sha1, ThumbprintAlgorithm::Sha256]);
        let reverse =
            key.thumbprints(&[ThumbprintAlgorithm::Sha256, ThumbprintAlgorithm::Sha1]);

        assert_eq!(forward[0], reverse[1]);
        assert_eq!(forward[1], reverse[0]);
    }

    #[test]
    fn public_projection_keeps_thumbprint() {
        let key = KeyMaterial::from_json(EXCHANGE_KEY.as_bytes()).unwrap();
        let public = key.public();

        assert!(key.is_private());
        assert!(!public.is_private());
        assert_eq!(public.classify(), KeyRole::Exchange);
        assert_eq!(
            public.thumbprint(ThumbprintAlgorithm::Sha256),
            key.thumbprint(ThumbprintAlgorithm::Sha256)
        );
    }

    #[test]
    fn serialization_omits_d_for_public_keys() {
        let key = KeyMaterial::from_json(EXCHANGE_KEY.as_bytes()).unwrap();

        let private = String::from_utf8(key.to_json().unwrap()).unwrap();
        let public = String::from_utf8(key.public().to_json().unwrap()).unwrap();

        assert!(private.contains("\"d\""));
        assert!(!public.contains("\"d\""));
        assert_eq!(KeyMaterial::from_json(public.as_bytes()).unwrap(), key.public());
    }

    #[test]
    fn debug_never_prints_scalar() {
        let key = KeyMaterial::from_json(EXCHANGE_KEY.as_bytes()).unwrap();
        let debug = format!("{key:?} {:?}", Jwk::from(&key));

        assert!(!debug.contains("AbvskQAdy2M7"));
    }

    #[test]
    fn classification_ignores_private_scalar() {
        let key = KeyMaterial::generate(Curve::P256, Some(Algorithm::Exchange), Some(KeyUse::Exchange))
            .unwrap();
        assert_eq!(key.classify(), KeyRole::Exchange);
        assert_eq!(key.public().classify(), KeyRole::Exchange);
    }

    #[test]
    fn classification_table() {
        let base = KeyMaterial::generate(Curve::P256, None, None).unwrap();

        assert_eq!(base.classify(), KeyRole::Unclassified);
        assert_eq!(base.clone().with_algorithm(Algorithm::Exchange).classify(), KeyRole::Unclassified);
        assert_eq!(base.clone().with_use(KeyUse::Exchange).classify(), KeyRole::Unclassified);
        assert_eq!(
            base.clone().with_algorithm(Algorithm::Exchange).with_use(KeyUse::Exchange).classify(),
            KeyRole::Exchange
        );
        assert_eq!(base.clone().with_use(KeyUse::Signing).classify(), KeyRole::Signing);
        assert_eq!(
            base.with_algorithm(Algorithm::Exchange).with_use(KeyUse::Signing).classify(),
            KeyRole::Signing
        );
    }

    #[test]
    fn generated_signing_key_uses_curve_algorithm() {
        for curve in Curve::ALL {
            let key = KeyMaterial::generate_signing(curve).unwrap();
            assert_eq!(key.algorithm(), Some(&Algorithm::Signature(curve.signature_algorithm())));
            assert!(key.is_signing());
        }
    }

    #[test]
    fn unknown_tags_survive_roundtrip() {
        let key = KeyMaterial::generate(
            Curve::P384,
            Some(Algorithm::from_name("ECDH-ES")),
            Some(KeyUse::from_name("enc")),
        )
        .unwrap();
        let parsed = KeyMaterial::from_json(&key.to_json().unwrap()).unwrap();

        assert_eq!(parsed.algorithm().map(Algorithm::as_str), Some("ECDH-ES"));
        assert_eq!(parsed.key_use().map(KeyUse::as_str), Some("enc"));
        assert_eq!(parsed, key);
    }

    #[test]
    fn reject_non_ec_key() {
        let err = KeyMaterial::from_json(br#"{"kty":"oct","k":"c2VjcmV0"}"#).unwrap_err();
        assert!(matches!(err, KeyError::InvalidKey { .. }));
    }

    #[test]
    fn non_ec_jwk_has_no_thumbprint() {
        let jwk: Jwk = serde_json::from_str(r#"{"kty":"oct","k":"c2VjcmV0"}"#).unwrap();
        let err = jwk.thumbprints(&ThumbprintAlgorithm::ALL).unwrap_err();
        assert!(matches!(err, KeyError::InvalidKey { .. }));
    }

    #[test]
    fn raw_jwk_thumbprint_matches_key() {
        let jwk: Jwk = serde_json::from_str(EXCHANGE_KEY).unwrap();
        let key = KeyMaterial::try_from(jwk.clone()).unwrap();

        assert_eq!(
            jwk.thumbprints(&ThumbprintAlgorithm::ALL).unwrap(),
            key.thumbprints(&ThumbprintAlgorithm::ALL)
        );
    }

    #[test]
    fn reject_unknown_curve() {
        let mut jwk: Jwk = serde_json::from_str(EXCHANGE_KEY).unwrap();
        jwk.crv = Some("secp256k1".to_string());
        assert!(KeyMaterial::try_from(jwk).is_err());
    }

    #[test]
    fn reject_off_curve_point() {
        let key = KeyMaterial::generate_exchange(Curve::P256).unwrap();
        let mut y = key.y().to_vec();
        y[0] ^= 0x80;

        let err = KeyMaterial::from_coordinates(Curve::P256, key.x().to_vec(), y).unwrap_err();
        assert_eq!(err, KeyError::invalid("off-curve point"));
    }

    #[test]
    fn reject_truncated_coordinate() {
        let mut jwk: Jwk = serde_json::from_str(EXCHANGE_KEY).unwrap();
        jwk.x = Some("AQ9iDNelRXRZ".to_string());
        assert!(KeyMaterial::try_from(jwk).is_err());
    }
}
