//! End-to-end escrow: a client encrypts against a server's advertisement and
//! decrypts through the server's recovery operation.

use std::cell::RefCell;

use proptest::prelude::*;
use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
use tether_client::{ClientConfig, ClientProtocol};
use tether_core::ProtocolError;
use tether_crypto::{Curve, Envelope, KeyMaterial, SignatureAlgorithm, ThumbprintAlgorithm};
use tether_server::{DEFAULT_ADVERTISEMENT, ServerConfig, ServerProtocol};

struct Deployment {
    server: ServerProtocol,
    exchange: KeyMaterial,
}

fn deploy(curve: Curve) -> Deployment {
    let exchange = KeyMaterial::generate_exchange(curve).unwrap();
    let signing = KeyMaterial::generate_signing(curve).unwrap();
    let server = ServerProtocol::new([exchange.clone(), signing]).unwrap();
    Deployment { server, exchange }
}

fn recover_via(
    server: &ServerProtocol,
) -> impl Fn(&str, &[u8]) -> Result<Vec<u8>, ProtocolError> + '_ {
    move |thp: &str, request: &[u8]| server.recover(thp, request)
}

#[test]
fn encrypt_against_advertisement_then_recover() {
    let deployment = deploy(Curve::P521);
    let client = ClientProtocol::new();

    let adv = client
        .parse_advertisement(deployment.server.advertisement(DEFAULT_ADVERTISEMENT).unwrap())
        .unwrap();
    let envelope = client.encrypt_with_advertisement(b"disk unlock key", &adv).unwrap();
    let data = client.decrypt(&envelope, &recover_via(&deployment.server)).unwrap();

    assert_eq!(data, b"disk unlock key");
}

#[test]
fn repeated_recoveries_use_fresh_blinds() {
    let deployment = deploy(Curve::P256);
    let client = ClientProtocol::new();
    let envelope = client.encrypt(b"secret", &deployment.exchange.public()).unwrap();

    let transcripts = RefCell::new(Vec::new());
    let recording = |thp: &str, request: &[u8]| {
        let response = deployment.server.recover(thp, request)?;
        transcripts.borrow_mut().push((request.to_vec(), response.clone()));
        Ok::<_, ProtocolError>(response)
    };

    assert_eq!(client.decrypt(&envelope, &recording).unwrap(), b"secret");
    assert_eq!(client.decrypt(&envelope, &recording).unwrap(), b"secret");

    let transcripts = transcripts.into_inner();
    assert_eq!(transcripts.len(), 2);
    assert_ne!(transcripts[0].0, transcripts[1].0);
    assert_ne!(transcripts[0].1, transcripts[1].1);
}

#[test]
fn request_never_reveals_client_key() {
    let deployment = deploy(Curve::P256);
    let client = ClientProtocol::new();
    let envelope = client.encrypt(b"secret", &deployment.exchange.public()).unwrap();
    let c = Envelope::parse(&envelope).unwrap().header().epk.clone();

    let seen = RefCell::new(None);
    let observing = |thp: &str, request: &[u8]| {
        *seen.borrow_mut() = Some(KeyMaterial::from_json(request).unwrap());
        deployment.server.recover(thp, request)
    };
    client.decrypt(&envelope, &observing).unwrap();

    let x = seen.into_inner().unwrap();
    assert_ne!(x, c);
    assert!(!x.is_private());
}

#[test]
fn envelopes_for_same_data_differ() {
    let deployment = deploy(Curve::P256);
    let client = ClientProtocol::new();

    let first = client.encrypt(b"secret", &deployment.exchange.public()).unwrap();
    let second = client.encrypt(b"secret", &deployment.exchange.public()).unwrap();

    assert_ne!(first, second);
}

#[test]
fn empty_and_large_payloads() {
    let deployment = deploy(Curve::P384);
    let client = ClientProtocol::new();
    let large = vec![0xA5; 1 << 16];

    for data in [&b""[..], large.as_slice()] {
        let envelope = client.encrypt(data, &deployment.exchange.public()).unwrap();
        assert_eq!(client.decrypt(&envelope, &recover_via(&deployment.server)).unwrap(), data);
    }
}

#[test]
fn other_server_cannot_recover() {
    let ours = deploy(Curve::P256);
    let theirs = deploy(Curve::P256);
    let client = ClientProtocol::new();
    let envelope = client.encrypt(b"secret", &ours.exchange.public()).unwrap();

    let err = client.decrypt(&envelope, &recover_via(&theirs.server)).unwrap_err();

    let ProtocolError::RecoveryFailure { reason } = err else {
        panic!("expected RecoveryFailure, got {err:?}");
    };
    assert!(reason.starts_with("key not found"), "{reason}");
}

#[test]
fn thumbprint_hash_mismatch_is_recovery_failure() {
    let exchange = KeyMaterial::generate_exchange(Curve::P256).unwrap();
    let signing = KeyMaterial::generate_signing(Curve::P256).unwrap();
    let server = ServerProtocol::with_config(
        [exchange.clone(), signing],
        ServerConfig::default().with_thumbprint_algorithms([ThumbprintAlgorithm::Sha512]),
    )
    .unwrap();
    let client = ClientProtocol::new();
    let envelope = client.encrypt(b"secret", &exchange.public()).unwrap();

    let err = client.decrypt(&envelope, &recover_via(&server)).unwrap_err();

    assert!(matches!(err, ProtocolError::RecoveryFailure { .. }));
}

#[test]
fn tampered_envelope_fails_decryption() {
    let deployment = deploy(Curve::P256);
    let client = ClientProtocol::new();
    let envelope = client.encrypt(b"secret", &deployment.exchange.public()).unwrap();

    let text = String::from_utf8(envelope).unwrap();
    let mut parts: Vec<String> = text.split('.').map(str::to_string).collect();
    let flipped = if parts[3].starts_with('A') { "B" } else { "A" };
    parts[3].replace_range(..1, flipped);
    let tampered = parts.join(".");

    let err = client.decrypt(tampered.as_bytes(), &recover_via(&deployment.server)).unwrap_err();

    assert_eq!(err, ProtocolError::DecryptionFailure);
    assert_eq!(err.to_string(), "decryption failed");
}

#[test]
fn restricted_algorithms_reject_advertisement() {
    let deployment = deploy(Curve::P256);
    let client = ClientProtocol::with_config(ClientConfig {
        accepted_signature_algorithms: vec![SignatureAlgorithm::Es512],
        ..ClientConfig::default()
    });

    let err = client
        .parse_advertisement(deployment.server.advertisement(DEFAULT_ADVERTISEMENT).unwrap())
        .unwrap_err();

    assert!(matches!(err, ProtocolError::SignatureVerificationFailure { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_recovery_is_lossless(
        data in proptest::collection::vec(any::<u8>(), 0..256),
        seed in any::<u64>(),
    ) {
        let deployment = deploy(Curve::P256);
        let client = ClientProtocol::new();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        let envelope = client
            .encrypt_with_rng(&data, &deployment.exchange.public(), &mut rng)
            .unwrap();
        let recovered = client
            .decrypt_with_rng(&envelope, &recover_via(&deployment.server), &mut rng)
            .unwrap();

        prop_assert_eq!(recovered, data);
    }
}
