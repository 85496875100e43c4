//! Fuzz target for envelope parsing and decryption
//!
//! Ciphertexts are stored by untrusted parties and decrypted with the
//! server's help (HIGH priority)
//!
//! # Strategy
//!
//! - Random bytes: arbitrary envelope text
//! - Byte mutation: overwrite one byte of a valid envelope
//! - Truncation: cut a valid envelope short
//!
//! # Invariants
//!
//! - A decrypted envelope yields exactly the sealed plaintext
//! - Every failure of a damaged envelope surfaces as a protocol error
//! - NEVER panic on malformed input

#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
use tether_client::ClientProtocol;
use tether_core::ProtocolError;
use tether_crypto::{Algorithm, Curve, Envelope, KeyMaterial, KeyUse, exchange};

const PLAINTEXT: &[u8] = b"fuzzed escrow secret";

struct Fixture {
    server_key: KeyMaterial,
    envelope: Vec<u8>,
}

#[derive(Debug, Clone, Arbitrary)]
enum EnvelopeAttack {
    RandomBytes { bytes: Vec<u8> },
    Mutate { offset: u16, byte: u8 },
    Truncate { len: u16 },
}

fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(0xe5);
        let server_key = KeyMaterial::generate_with_rng(
            Curve::P256,
            Some(Algorithm::Exchange),
            Some(KeyUse::Exchange),
            &mut rng,
        )
        .unwrap();
        let envelope = ClientProtocol::new()
            .encrypt_with_rng(PLAINTEXT, &server_key.public(), &mut rng)
            .unwrap();
        Fixture { server_key, envelope }
    })
}

fuzz_target!(|attack: EnvelopeAttack| {
    let fx = fixture();

    let bytes = match attack {
        EnvelopeAttack::RandomBytes { bytes } => bytes,
        EnvelopeAttack::Mutate { offset, byte } => {
            let mut bytes = fx.envelope.clone();
            let index = usize::from(offset) % bytes.len();
            bytes[index] = byte;
            bytes
        },
        EnvelopeAttack::Truncate { len } => {
            fx.envelope[..usize::from(len) % fx.envelope.len()].to_vec()
        },
    };

    let _ = Envelope::parse(&bytes);

    let server_half = |_: &str, request: &[u8]| -> Result<Vec<u8>, ProtocolError> {
        let x = KeyMaterial::from_json(request)?;
        Ok(exchange::multiply(&x, &fx.server_key)?.to_json()?)
    };
    if let Ok(data) = ClientProtocol::new().decrypt(&bytes, &server_half) {
        assert_eq!(data, PLAINTEXT, "damaged envelope decrypted to different data");
    }
});
