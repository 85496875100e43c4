//! Tether Cryptographic Primitives
//!
//! Elliptic-curve key material and the JOSE subset Tether speaks on the wire.
//! Nothing in this crate touches the network or keeps state between calls.
//! Operations that need randomness take the generator from the caller; the
//! `OsRng` conveniences exist for production call sites only.
//!
//! # Key Roles
//!
//! Every key is an EC key on P-256, P-384 or P-521. Its role comes from its
//! tags alone, never from whether it carries a private scalar:
//!
//! ```text
//! alg = "ECMR" and use = "exchange"  →  exchange key (blinded half-ECDH)
//! use = "signECMR"                   →  signing key (advertisement JWS)
//! anything else                      →  unclassified
//! ```
//!
//! # Binding Algebra
//!
//! ```text
//! server exchange key   S = (S, s)       s = S·G
//! client ephemeral      (c, C)           shared K = C·s = c·S
//! recovery blind        (e, E)           x = c + E
//! server half           y = x·S
//! client half           z = s·E          K = y - z
//! ```
//!
//! [`exchange`] exposes exactly the point operations this needs: scalar
//! multiplication after on-curve validation, addition and subtraction.
//!
//! # Security
//!
//! Invalid-curve attacks:
//! - Every point is checked against its curve equation when decoded
//! - Multiplication re-checks the point against the scalar's curve
//!
//! Secret hygiene:
//! - Private scalars and content keys live in `Zeroizing` buffers
//! - `Debug` output of keys never includes the private scalar
//!
//! Decryption oracle:
//! - Every failure after the envelope header is parsed returns the same
//!   detail-free [`KeyError::Decryption`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod b64;
pub mod curve;
pub mod envelope;
pub mod error;
pub mod exchange;
pub mod key;
pub mod key_set;
pub mod signed;
pub mod thumbprint;

pub use curve::{Curve, SignatureAlgorithm};
pub use envelope::{Binding, CONTENT_ENCRYPTION, Envelope, EnvelopeHeader, KEY_AGREEMENT};
pub use error::KeyError;
pub use key::{
    Algorithm, EXCHANGE_ALGORITHM, EXCHANGE_USE, Jwk, KeyMaterial, KeyRole, KeyUse, SIGNING_USE,
};
pub use key_set::KeySet;
pub use signed::{KEY_SET_CONTENT_TYPE, SignedPayload};
pub use thumbprint::ThumbprintAlgorithm;
