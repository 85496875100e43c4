//! Compact JWE envelopes sealed to a shared EC point.
//!
//! `alg = ECDH-ES`, `enc = A256GCM`. The content key is the RFC 7518 Concat
//! KDF of the shared point's x coordinate; no key is wrapped, so the
//! encrypted-key segment of the compact form is always empty:
//!
//! ```text
//! BASE64URL(header) . "" . BASE64URL(iv) . BASE64URL(ciphertext) . BASE64URL(tag)
//! ```
//!
//! The protected header is the AEAD additional data. Besides `alg`, `enc`
//! and `kid` it carries everything needed to rebuild the shared point later:
//! the client public key in `epk` and the server exchange key in `bind`.
//!
//! # Security
//!
//! - The header is authenticated; tampering with `epk` or `bind` fails `open`
//! - Once the header parses, every failure in [`Envelope::open`] is the same
//!   detail-free [`KeyError::Decryption`]
//! - Content keys are zeroized on drop

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{b64, error::KeyError, key::KeyMaterial, thumbprint::ThumbprintAlgorithm};

/// JWE `alg` of every envelope.
pub const KEY_AGREEMENT: &str = "ECDH-ES";

/// JWE `enc` of every envelope.
pub const CONTENT_ENCRYPTION: &str = "A256GCM";

/// AES-GCM nonce size (12 bytes)
const IV_SIZE: usize = 12;

/// AES-GCM tag size (16 bytes)
const TAG_SIZE: usize = 16;

/// AES-256 key size (32 bytes)
const KEY_SIZE: usize = 32;

/// Server exchange key an envelope was sealed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Thumbprint the recovery request is addressed to
    pub thp: String,
    /// Public exchange key
    pub jwk: KeyMaterial,
}

/// Protected header of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    /// Always [`KEY_AGREEMENT`]
    pub alg: String,
    /// Always [`CONTENT_ENCRYPTION`]
    pub enc: String,
    /// SHA-256 thumbprint of the shared point
    pub kid: String,
    /// Client public key
    pub epk: KeyMaterial,
    /// Server exchange key
    #[serde(rename = "bind")]
    pub binding: Binding,
}

/// A sealed envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    header: EnvelopeHeader,
    protected: String,
    iv: [u8; IV_SIZE],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_SIZE],
}

impl Envelope {
    /// Seal `plaintext` under a key derived from `shared`.
    ///
    /// `epk` is recorded without its private scalar.
    ///
    /// # Errors
    ///
    /// - `Encryption`: the RNG or the cipher failed
    pub fn seal(
        plaintext: &[u8],
        shared: &KeyMaterial,
        epk: &KeyMaterial,
        binding: Binding,
        rng: &mut impl CryptoRngCore,
    ) -> Result<Self, KeyError> {
        let header = EnvelopeHeader {
            alg: KEY_AGREEMENT.to_string(),
            enc: CONTENT_ENCRYPTION.to_string(),
            kid: shared.thumbprint(ThumbprintAlgorithm::Sha256),
            epk: epk.public(),
            binding: Binding { thp: binding.thp, jwk: binding.jwk.public() },
        };
        let protected = b64::encode(
            &serde_json::to_vec(&header).map_err(|err| encryption_failed(&err))?,
        );

        let mut iv = [0u8; IV_SIZE];
        rng.try_fill_bytes(&mut iv).map_err(|err| encryption_failed(&err))?;

        let cek = content_key(shared);
        let cipher = Aes256Gcm::new_from_slice(&cek).map_err(|err| encryption_failed(&err))?;
        let mut ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad: protected.as_bytes() })
            .map_err(|err| encryption_failed(&err))?;

        let split = ciphertext.len().saturating_sub(TAG_SIZE);
        let tag: [u8; TAG_SIZE] = ciphertext[split..]
            .try_into()
            .map_err(|_| KeyError::Encryption { reason: "missing GCM tag".to_string() })?;
        ciphertext.truncate(split);

        Ok(Self { header, protected, iv, ciphertext, tag })
    }

    /// Decode a compact envelope. Nothing is decrypted.
    ///
    /// # Errors
    ///
    /// - `MalformedEnvelope`: wrong shape, bad encoding, unsupported
    ///   algorithms, or invalid keys in the header
    pub fn parse(bytes: &[u8]) -> Result<Self, KeyError> {
        let text = std::str::from_utf8(bytes).map_err(|_| KeyError::malformed("not UTF-8"))?;
        let parts: Vec<&str> = text.trim().split('.').collect();
        let [protected, encrypted_key, iv, ciphertext, tag] = parts.as_slice() else {
            return Err(KeyError::malformed(format!(
                "compact JWE has five parts, got {}",
                parts.len()
            )));
        };
        if !encrypted_key.is_empty() {
            return Err(KeyError::malformed("direct key agreement has no encrypted key"));
        }

        let header = b64::decode(protected).map_err(|_| KeyError::malformed("header encoding"))?;
        let header: EnvelopeHeader = serde_json::from_slice(&header)
            .map_err(|err| KeyError::malformed(format!("header: {err}")))?;
        if header.alg != KEY_AGREEMENT || header.enc != CONTENT_ENCRYPTION {
            return Err(KeyError::malformed(format!(
                "unsupported algorithms {}/{}",
                header.alg, header.enc
            )));
        }

        let iv: [u8; IV_SIZE] = b64::decode(iv)
            .map_err(|_| KeyError::malformed("iv encoding"))?
            .try_into()
            .map_err(|_| KeyError::malformed("iv must be 12 bytes"))?;
        let tag: [u8; TAG_SIZE] = b64::decode(tag)
            .map_err(|_| KeyError::malformed("tag encoding"))?
            .try_into()
            .map_err(|_| KeyError::malformed("tag must be 16 bytes"))?;
        let ciphertext =
            b64::decode(ciphertext).map_err(|_| KeyError::malformed("ciphertext encoding"))?;

        Ok(Self { header, protected: (*protected).to_string(), iv, ciphertext, tag })
    }

    /// Compact serialization.
    pub fn to_compact(&self) -> String {
        format!(
            "{}..{}.{}.{}",
            self.protected,
            b64::encode(&self.iv),
            b64::encode(&self.ciphertext),
            b64::encode(&self.tag)
        )
    }

    /// Decoded protected header.
    pub fn header(&self) -> &EnvelopeHeader {
        &self.header
    }

    /// Decrypt with a key derived from `shared`.
    ///
    /// # Errors
    ///
    /// - `Decryption`: for every failure, with no further detail
    pub fn open(&self, shared: &KeyMaterial) -> Result<Vec<u8>, KeyError> {
        if shared.thumbprint(ThumbprintAlgorithm::Sha256) != self.header.kid {
            return Err(KeyError::Decryption);
        }

        let cek = content_key(shared);
        let cipher = Aes256Gcm::new_from_slice(&cek).map_err(|_| KeyError::Decryption)?;

        let mut sealed = Vec::with_capacity(self.ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(&self.ciphertext);
        sealed.extend_from_slice(&self.tag);

        cipher
            .decrypt(
                Nonce::from_slice(&self.iv),
                Payload { msg: &sealed, aad: self.protected.as_bytes() },
            )
            .map_err(|_| KeyError::Decryption)
    }
}

fn encryption_failed(err: &dyn std::fmt::Display) -> KeyError {
    KeyError::Encryption { reason: err.to_string() }
}

fn content_key(shared: &KeyMaterial) -> Zeroizing<Vec<u8>> {
    concat_kdf(shared.x(), CONTENT_ENCRYPTION, b"", b"", KEY_SIZE)
}

/// RFC 7518 §4.6.2 Concat KDF with SHA-256.
///
/// `z` is the shared secret, `key_len` the output length in bytes.
pub fn concat_kdf(
    z: &[u8],
    algorithm_id: &str,
    apu: &[u8],
    apv: &[u8],
    key_len: usize,
) -> Zeroizing<Vec<u8>> {
    let mut other_info = Vec::new();
    for field in [algorithm_id.as_bytes(), apu, apv] {
        other_info.extend_from_slice(&(field.len() as u32).to_be_bytes());
        other_info.extend_from_slice(field);
    }
    other_info.extend_from_slice(&((key_len * 8) as u32).to_be_bytes());

    let mut output = Zeroizing::new(Vec::with_capacity(key_len + 32));
    let mut counter: u32 = 1;
    while output.len() < key_len {
        let mut hasher = Sha256::new();
        hasher.update(counter.to_be_bytes());
        hasher.update(z);
        hasher.update(&other_info);
        output.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    output.truncate(key_len);
    output
}
