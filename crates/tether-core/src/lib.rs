//! Tether Protocol Core
//!
//! Shared protocol types for the Tether escrow server and client: the
//! signed key advertisement, thumbprint-keyed indices, and the single error
//! enumeration both sides report.
//!
//! # Architecture
//!
//! ```text
//! tether-crypto   keys, point arithmetic, JWS, JWE
//!       │
//!       ▼
//! tether-core     Advertisement, ThumbprintIndex, ProtocolError
//!       │
//!       ├──────────────┐
//!       ▼              ▼
//! tether-server   tether-client
//! ```
//!
//! Everything here is synchronous and free of I/O.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod advertisement;
pub mod error;
pub mod index;

pub use advertisement::Advertisement;
pub use error::ProtocolError;
pub use index::ThumbprintIndex;
