//! Server error types.

use std::path::PathBuf;

use tether_core::ProtocolError;
use thiserror::Error;

/// Errors that stop the server from starting or serving.
///
/// Per-request failures are [`ProtocolError`]s answered with a status code;
/// they never surface here.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration (empty key directory, bad bind address).
    ///
    /// Fatal at startup. Fix the configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// A key file could not be read, parsed or written.
    #[error("key store error at {}: {reason}", path.display())]
    KeyStore {
        /// File or directory involved
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// The loaded keys do not form a valid advertisement.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Listener or socket failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl ServerError {
    pub(crate) fn key_store(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::KeyStore { path: path.into(), reason: reason.to_string() }
    }
}
