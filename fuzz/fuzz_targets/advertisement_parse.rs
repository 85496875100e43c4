//! Fuzz target for Advertisement::parse
//!
//! Clients trust an advertisement only through its own signatures (HIGH
//! priority)
//!
//! # Strategy
//!
//! - Random bytes: arbitrary documents
//! - Byte mutation: overwrite one byte of a valid advertisement
//! - Payload swap: keep valid signatures, replace the payload
//!
//! # Invariants
//!
//! - An accepted advertisement has exchange and signing keys, all public
//! - Any change to the signed payload MUST be rejected
//! - NEVER panic on malformed input

#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use libfuzzer_sys::fuzz_target;
use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
use tether_core::Advertisement;
use tether_crypto::{Algorithm, Curve, KeyMaterial, KeyUse, SignatureAlgorithm};

#[derive(Debug, Clone, Arbitrary)]
enum AdvertisementAttack {
    RandomBytes { bytes: Vec<u8> },
    Mutate { offset: u16, byte: u8 },
    SwapPayload { payload: Vec<u8> },
}

fn signed_advertisement() -> &'static (Vec<u8>, serde_json::Value) {
    static SIGNED: OnceLock<(Vec<u8>, serde_json::Value)> = OnceLock::new();
    SIGNED.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(0xad);
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

        let bytes = Advertisement::new([exchange, signing]).unwrap().marshal().unwrap();
        let document = serde_json::from_slice(&bytes).unwrap();
        (bytes, document)
    })
}

fuzz_target!(|attack: AdvertisementAttack| {
    let (valid, document) = signed_advertisement();

    match attack {
        AdvertisementAttack::RandomBytes { bytes } => {
            check(&bytes);
        },

        AdvertisementAttack::Mutate { offset, byte } => {
            let mut bytes = valid.clone();
            let index = usize::from(offset) % bytes.len();
            bytes[index] = byte;
            check(&bytes);
        },

        AdvertisementAttack::SwapPayload { payload } => {
            let encoded = URL_SAFE_NO_PAD.encode(&payload);
            if encoded == document["payload"] {
                return;
            }
            let mut swapped = document.clone();
            swapped["payload"] = serde_json::Value::String(encoded);

            let bytes = serde_json::to_vec(&swapped).unwrap();
            assert!(
                Advertisement::parse(&bytes, &SignatureAlgorithm::ALL).is_err(),
                "swapped payload accepted"
            );
        },
    }
});

fn check(bytes: &[u8]) {
    if let Ok(adv) = Advertisement::parse(bytes, &SignatureAlgorithm::ALL) {
        assert!(!adv.exchange_keys().is_empty());
        assert!(!adv.signing_keys().is_empty());
        assert!(!adv.keys().has_private(), "accepted advertisement exposes a private key");
    }
}
