//! Tether escrow client.
//!
//! Binds data to a server's exchange key so that it can only be decrypted
//! with that server's cooperation, and without the server ever seeing the
//! data or the key that protects it.
//!
//! # Encrypt
//!
//! ```text
//! s  = server exchange key (advertised)
//! c  = g·C   fresh client key
//! K  = s·C   content key material, discarded after sealing
//! envelope = seal(data, K) + { c, s, thp(s) }
//! ```
//!
//! # Decrypt
//!
//! ```text
//! e = g·E             fresh blind, every call
//! x = c + e ───────►  server: y = x·S
//! z = s·E   ◄───────
//! K = y - z = c·S = s·C
//! ```
//!
//! The recovery round trip is abstracted as a [`RecoveryHandler`]; the
//! `transport` feature provides one over HTTP.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod protocol;
#[cfg(feature = "transport")]
pub mod transport;

pub use config::ClientConfig;
pub use protocol::{ClientProtocol, RecoveryHandler};
