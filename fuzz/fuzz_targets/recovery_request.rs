//! Fuzz target for ServerProtocol::recover
//!
//! The recovery endpoint multiplies attacker-supplied points by the server's
//! private key (CRITICAL security boundary)
//!
//! # Strategy
//!
//! - Random bytes: arbitrary request bodies and thumbprints
//! - Crafted JWKs: arbitrary coordinates, curves and tags, so off-curve and
//!   cross-curve points reach the on-curve check
//! - Bit flips: single-bit corruption of a valid request
//!
//! # Invariants
//!
//! - Malformed or off-curve points MUST be rejected with `InvalidKey`
//! - Unknown thumbprints MUST return `KeyNotFound`, never `InvalidKey`,
//!   once the request itself is a valid exchange key on any curve
//! - Cross-curve points for a known thumbprint MUST be rejected with
//!   `InvalidKey`
//! - A successful response is a public exchange key on the server's curve
//! - Identical requests produce identical responses
//! - NEVER panic on malformed input

#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use libfuzzer_sys::fuzz_target;
use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
use tether_core::ProtocolError;
use tether_crypto::{
    Algorithm, Curve, Jwk, KeyMaterial, KeyUse, SignatureAlgorithm, ThumbprintAlgorithm,
};
use tether_server::ServerProtocol;

struct Fixture {
    server: ServerProtocol,
    exchange: KeyMaterial,
    valid_request: Vec<u8>,
}

#[derive(Debug, Clone, Arbitrary)]
enum RecoveryAttack {
    RandomBytes { known_thumbprint: bool, thumbprint: String, body: Vec<u8> },
    CraftedJwk {
        known_thumbprint: bool,
        curve: u8,
        x: Vec<u8>,
        y: Vec<u8>,
        exchange_tags: bool,
    },
    BitFlip { byte_offset: u16, bit_offset: u8 },
}

fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(0x7e7e);
        let exchange = KeyMaterial::generate_with_rng(
            Curve::P256,
            Some(Algorithm::Exchange),
            Some(KeyUse::Exchange),
            &mut rng,
        )
        .unwrap();
        let signing = KeyMaterial::generate_with_rng(
            Curve::P256,
            Some(Algorithm::Signature(SignatureAlgorithm::Es256)),
            Some(KeyUse::Signing),
            &mut rng,
        )
        .unwrap();
        let request = KeyMaterial::generate_with_rng(
            Curve::P256,
            Some(Algorithm::Exchange),
            Some(KeyUse::Exchange),
            &mut rng,
        )
        .unwrap();

        Fixture {
            server: ServerProtocol::new([exchange.clone(), signing]).unwrap(),
            exchange,
            valid_request: request.public().to_json().unwrap(),
        }
    })
}

fuzz_target!(|attack: RecoveryAttack| {
    let fx = fixture();
    let known = fx.exchange.thumbprint(ThumbprintAlgorithm::Sha256);

    match attack {
        RecoveryAttack::RandomBytes { known_thumbprint, thumbprint, body } => {
            let thumbprint = if known_thumbprint { known } else { thumbprint };
            check(fx, &thumbprint, &body);
        },

        RecoveryAttack::CraftedJwk { known_thumbprint, curve, x, y, exchange_tags } => {
            let curve = Curve::ALL[usize::from(curve) % Curve::ALL.len()];
            let jwk = Jwk {
                kty: "EC".to_string(),
                crv: Some(curve.name().to_string()),
                x: Some(URL_SAFE_NO_PAD.encode(&x)),
                y: Some(URL_SAFE_NO_PAD.encode(&y)),
                alg: exchange_tags.then(|| "ECMR".to_string()),
                key_use: exchange_tags.then(|| "exchange".to_string()),
                ..Jwk::default()
            };
            let body = serde_json::to_vec(&jwk).unwrap();
            let thumbprint = if known_thumbprint { known } else { "unknown".to_string() };

            let result = fx.server.recover(&thumbprint, &body);
            let valid_point = KeyMaterial::try_from(jwk).is_ok();

            if !valid_point || !exchange_tags {
                assert!(
                    matches!(result, Err(ProtocolError::InvalidKey { .. })),
                    "invalid request accepted: {result:?}"
                );
            } else if !known_thumbprint {
                assert!(
                    matches!(result, Err(ProtocolError::KeyNotFound { .. })),
                    "unknown thumbprint not reported: {result:?}"
                );
            } else if curve != Curve::P256 {
                assert!(
                    matches!(result, Err(ProtocolError::InvalidKey { .. })),
                    "cross-curve request accepted: {result:?}"
                );
            }
            check(fx, &thumbprint, &body);
        },

        RecoveryAttack::BitFlip { byte_offset, bit_offset } => {
            let mut body = fx.valid_request.clone();
            let index = usize::from(byte_offset) % body.len();
            body[index] ^= 1 << (bit_offset % 8);
            check(fx, &known, &body);
        },
    }
});

/// Response shape and determinism for any request.
fn check(fx: &Fixture, thumbprint: &str, body: &[u8]) {
    let first = fx.server.recover(thumbprint, body);
    let second = fx.server.recover(thumbprint, body);
    assert_eq!(first, second, "recovery is not deterministic");

    if let Ok(response) = first {
        let y = KeyMaterial::from_json(&response).expect("response is a valid JWK");
        assert!(!y.is_private(), "response carries a private scalar");
        assert!(y.is_exchange(), "response is not an exchange key");
        assert_eq!(y.curve(), fx.exchange.curve());
    }
}
