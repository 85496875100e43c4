//! RFC 7638 JWK thumbprints.
//!
//! A thumbprint is the digest of the key's required public members, in
//! lexicographic order with no whitespace:
//!
//! ```text
//! {"crv":"P-521","kty":"EC","x":"...","y":"..."}
//! ```
//!
//! Peers may name the same key by different digests, so lookups usually
//! register a key under several algorithms at once.

use std::{fmt, str::FromStr};

use sha2::Digest;

use crate::{b64, error::KeyError, key::KeyMaterial};

/// Hash used to compute a thumbprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThumbprintAlgorithm {
    /// SHA-1
    Sha1,
    /// SHA-224
    Sha224,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl ThumbprintAlgorithm {
    /// Every supported hash, weakest first. This is the default set.
    pub const ALL: [Self; 5] = [Self::Sha1, Self::Sha224, Self::Sha256, Self::Sha384, Self::Sha512];

    /// Short name, as accepted on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "S1",
            Self::Sha224 => "S224",
            Self::Sha256 => "S256",
            Self::Sha384 => "S384",
            Self::Sha512 => "S512",
        }
    }

    /// Digest `input` with this hash.
    pub fn digest(self, input: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => sha1::Sha1::digest(input).to_vec(),
            Self::Sha224 => sha2::Sha224::digest(input).to_vec(),
            Self::Sha256 => sha2::Sha256::digest(input).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(input).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(input).to_vec(),
        }
    }
}

impl fmt::Display for ThumbprintAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThumbprintAlgorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_uppercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "S1" | "SHA1" => Ok(Self::Sha1),
            "S224" | "SHA224" => Ok(Self::Sha224),
            "S256" | "SHA256" => Ok(Self::Sha256),
            "S384" | "SHA384" => Ok(Self::Sha384),
            "S512" | "SHA512" => Ok(Self::Sha512),
            _ => Err(KeyError::invalid(format!("unknown thumbprint hash {s:?}"))),
        }
    }
}

/// Canonical JSON over which thumbprints are computed.
///
/// Base64url strings and curve names never need JSON escaping, so the
/// document is assembled directly.
pub fn canonical_form(key: &KeyMaterial) -> String {
    format!(
        r#"{{"crv":"{}","kty":"EC","x":"{}","y":"{}"}}"#,
        key.curve().name(),
        b64::encode(key.x()),
        b64::encode(key.y())
    )
}

/// Thumbprint of `key` under one hash, base64url without padding.
pub fn thumbprint(key: &KeyMaterial, algorithm: ThumbprintAlgorithm) -> String {
    b64::encode(&algorithm.digest(canonical_form(key).as_bytes()))
}

/// One thumbprint per requested hash, in the order requested.
pub fn thumbprints(key: &KeyMaterial, algorithms: &[ThumbprintAlgorithm]) -> Vec<String> {
    let canonical = canonical_form(key);
    algorithms
        .iter()
        .map(|algorithm| b64::encode(&algorithm.digest(canonical.as_bytes())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!("S256".parse::<ThumbprintAlgorithm>().unwrap(), ThumbprintAlgorithm::Sha256);
        assert_eq!("sha-384".parse::<ThumbprintAlgorithm>().unwrap(), ThumbprintAlgorithm::Sha384);
        assert_eq!("SHA1".parse::<ThumbprintAlgorithm>().unwrap(), ThumbprintAlgorithm::Sha1);
        assert!("md5".parse::<ThumbprintAlgorithm>().is_err());
    }

    #[test]
    fn digest_lengths() {
        let lengths: Vec<usize> =
            ThumbprintAlgorithm::ALL.iter().map(|alg| alg.digest(b"").len()).collect();
        assert_eq!(lengths, vec![20, 28, 32, 48, 64]);
    }

    #[test]
    fn names_roundtrip() {
        for alg in ThumbprintAlgorithm::ALL {
            assert_eq!(alg.name().parse::<ThumbprintAlgorithm>().unwrap(), alg);
        }
    }
}
