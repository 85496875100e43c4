//! Tether escrow server.
//!
//! Holds the server's private exchange keys and answers two kinds of
//! request: "which keys do you advertise?" and "multiply this blinded point
//! by your key".
//!
//! # Architecture
//!
//! [`ServerProtocol`] is the whole protocol: two thumbprint indices built
//! once at construction and only read afterwards. It does no I/O, so it is
//! shared between request handlers behind an `Arc` without locking.
//!
//! ```text
//! key directory ──► keys::load ──► ServerProtocol ──► http::router
//!                                      │
//!                   advertisement(thp) ┤ recover(thp, x)
//! ```
//!
//! # Components
//!
//! - [`ServerProtocol`]: advertisement lookup and blinded recovery
//! - [`ServerConfig`]: thumbprint hashes the indices accept
//! - [`keys`]: `*.jwk` directory loading and generation
//! - [`http`]: axum routes for `/adv` and `/rec`

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod error;
pub mod http;
pub mod keys;
mod protocol;

pub use config::ServerConfig;
pub use error::ServerError;
pub use protocol::{DEFAULT_ADVERTISEMENT, ServerProtocol};
