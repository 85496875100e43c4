//! Interoperability tests against keys and signatures produced by another
//! JOSE implementation.

use tether_crypto::{
    Curve, KEY_SET_CONTENT_TYPE, KeyMaterial, KeyRole, KeySet, SignatureAlgorithm, SignedPayload,
    ThumbprintAlgorithm,
};

const SIGNING_KEY: &str = r#"{
    "alg": "ES512",
    "crv": "P-521",
    "d": "AcEOnvtRjKPp-QPwSN3yqCDlhsjifuDIAuCse5uv_wV6ENIyADh8lOllF3YsOgmPksjYooD5UV9oBBhArltfQYbb",
    "kty": "EC",
    "use": "signECMR",
    "x": "AZWyek40TOSPIMTgbPCwVrtFPSLDjoIxOhx8d22rMeMnb3ld9k9sS20EGniNJHOxivovazbpbJE5-GcysqG9JafO",
    "y": "ATGtjipFn2p07AtdY_dWCwjWc4b9a-kHh7Bg3gv44T3Xsp-N2OfPCWprG0GQ4lkhNgR4kAXkJJphy0hY5XKriBkO"
}"#;

const SIGNED_KEY_SET: &str = r#"{"payload":"eyJrZXlzIjpbeyJ1c2UiOiJleGNoYW5nZSIsImt0eSI6IkVDIiwia2lkIjoiMmM3Mzk2OTktZjQ5Ny00NmY5LThmOGEtNjZkMjM3YzA4YTI5IiwiY3J2IjoiUC01MjEiLCJhbGciOiJFQ01SIiwieCI6IkFROWlETmVsUlhSWlpRVFRwelI3aW1ISU1HWUcxLXFRNnVpZjZMajZlRnBiVU1mMDdneWRkNks5WjJIUV9EQWZSZ2Y1SmlRaHJVZFh6d0I1eENxQjUzUGMiLCJ5IjoiQUlwVEd1cWZPTVNMUDBjTmwxSjhyUWZnYW1uSU11VERjVXJrM2RTcGlmOGpEMmNLV1RKYWFJaGZmUEcyWEx4YUp0U05aTkdGWlh2T2JoQmdoYl84WDhHUSJ9LHsidXNlIjoic2lnbkVDTVIiLCJrdHkiOiJFQyIsImNydiI6IlAtNTIxIiwiYWxnIjoiRVM1MTIiLCJ4IjoiQVpXeWVrNDBUT1NQSU1UZ2JQQ3dWcnRGUFNMRGpvSXhPaHg4ZDIyck1lTW5iM2xkOWs5c1MyMEVHbmlOSkhPeGl2b3ZhemJwYkpFNS1HY3lzcUc5SmFmTyIsInkiOiJBVEd0amlwRm4ycDA3QXRkWV9kV0N3aldjNGI5YS1rSGg3QmczZ3Y0NFQzWHNwLU4yT2ZQQ1dwckcwR1E0bGtoTmdSNGtBWGtKSnBoeTBoWTVYS3JpQmtPIn1dfQ","protected":"eyJhbGciOiJFUzUxMiIsImN0eSI6Imp3ay1zZXQranNvbiJ9","signature":"AHUg2EjvWCBfwahjdRx27tg26dCu994q8dkvtA2ftlbDFPG68SkdsuXP4PZ1A0K1yPqgfFl0VoY77jKeT1pocBmeAO3c5fRRaD618O086z4xDOlaS7QF-57oPCDiDexu1RKNYBANRRSEhaFdAUwegdhN7RSl87EHr4lAOqOzvYL8mZav"}"#;

fn signing_key() -> KeyMaterial {
    KeyMaterial::from_json(SIGNING_KEY.as_bytes()).unwrap()
}

#[test]
fn signing_key_thumbprints() {
    let key = signing_key();

    assert_eq!(key.classify(), KeyRole::Signing);
    assert_eq!(key.thumbprint(ThumbprintAlgorithm::Sha1), "fbRZ2ngN2A75LSTUcUp4VPmREPY");
    assert_eq!(
        key.thumbprint(ThumbprintAlgorithm::Sha256),
        "zQQcKu_w8wqurNmH936BtnLe1VRvWi5Cyqvy93j2wZs"
    );
    assert_eq!(
        key.thumbprint(ThumbprintAlgorithm::Sha512),
        "KT8N0ck99FWX8qIgkblabew2xha76U7MelPnQplrpUItLsLlonlAxJn29jOV7WpX3hdbmNSLLbR5QmzeI9P3og"
    );
}

#[test]
fn foreign_signature_verifies() {
    let signed = SignedPayload::parse(SIGNED_KEY_SET.as_bytes(), &[SignatureAlgorithm::Es512])
        .unwrap();

    assert_eq!(signed.signature_count(), 1);
    assert_eq!(signed.verify_with(&signing_key().public()).unwrap(), 0);
    assert!(signed.content_types().all(|cty| cty == Some(KEY_SET_CONTENT_TYPE)));
}

#[test]
fn foreign_payload_is_a_public_key_set() {
    let signed =
        SignedPayload::parse(SIGNED_KEY_SET.as_bytes(), &SignatureAlgorithm::ALL).unwrap();
    let keys = KeySet::from_json(&signed.unverified_payload().unwrap()).unwrap();

    assert_eq!(keys.len(), 2);
    assert!(!keys.has_private());
    assert!(keys.iter().all(|key| key.curve() == Curve::P521));
    assert!(keys.contains(&signing_key().public()));
}

#[test]
fn foreign_signature_rejected_when_algorithm_not_accepted() {
    let result = SignedPayload::parse(SIGNED_KEY_SET.as_bytes(), &[SignatureAlgorithm::Es256]);
    assert!(result.is_err());
}

#[test]
fn resigned_payload_verifies_with_same_key() {
    let key = signing_key();
    let signed = SignedPayload::parse(SIGNED_KEY_SET.as_bytes(), &SignatureAlgorithm::ALL).unwrap();
    let payload = signed.unverified_payload().unwrap();

    let ours = SignedPayload::sign(&payload, KEY_SET_CONTENT_TYPE, &[&key]).unwrap();
    let reparsed =
        SignedPayload::parse(&ours.to_json().unwrap(), &[SignatureAlgorithm::Es512]).unwrap();

    assert_eq!(reparsed.unverified_payload().unwrap(), payload);
    reparsed.verify_with(&key.public()).unwrap();
}
