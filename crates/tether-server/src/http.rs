//! HTTP binding.
//!
//! | Route            | Body                        | Response                         |
//! |------------------|-----------------------------|----------------------------------|
//! | `GET /adv`       |                             | default advertisement (JWS)      |
//! | `GET /adv/{thp}` |                             | advertisement signed by `thp`    |
//! | `POST /rec/{thp}`| blinded point `x` (JWK)     | `y = x·S` (JWK)                  |
//!
//! Unknown thumbprints answer 404, malformed requests 400. Recovery runs on
//! the blocking pool since P-521 multiplication is slow enough to stall the
//! runtime under load.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tether_core::ProtocolError;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{DEFAULT_ADVERTISEMENT, ServerError, ServerProtocol};

/// Content type of a signed advertisement.
pub const ADVERTISEMENT_CONTENT_TYPE: &str = "application/jose+json";

/// Content type of a recovery request and response.
pub const RECOVERY_CONTENT_TYPE: &str = "application/jwk+json";

/// Routes over a shared protocol.
pub fn router(protocol: Arc<ServerProtocol>) -> Router {
    Router::new()
        .route("/adv", get(default_advertisement))
        .route("/adv/", get(default_advertisement))
        .route("/adv/:thp", get(advertisement))
        .route("/rec/:thp", post(recover))
        .with_state(protocol)
        .layer(TraceLayer::new_for_http())
}

/// Serve `protocol` on `listener` until Ctrl-C.
///
/// # Errors
///
/// - `Transport`: the listener failed
pub async fn serve(listener: TcpListener, protocol: Arc<ServerProtocol>) -> Result<(), ServerError> {
    tracing::info!(addr = ?listener.local_addr()?, "escrow server listening");

    axum::serve(listener, router(protocol))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    Ok(())
}

async fn default_advertisement(State(protocol): State<Arc<ServerProtocol>>) -> Response {
    advertisement_response(&protocol, DEFAULT_ADVERTISEMENT)
}

async fn advertisement(
    State(protocol): State<Arc<ServerProtocol>>,
    Path(thp): Path<String>,
) -> Response {
    advertisement_response(&protocol, &thp)
}

fn advertisement_response(protocol: &ServerProtocol, thp: &str) -> Response {
    match protocol.advertisement(thp) {
        Some(bytes) => {
            ([(header::CONTENT_TYPE, ADVERTISEMENT_CONTENT_TYPE)], bytes.to_vec()).into_response()
        },
        None => {
            tracing::debug!(thp, "no advertisement");
            StatusCode::NOT_FOUND.into_response()
        },
    }
}

async fn recover(
    State(protocol): State<Arc<ServerProtocol>>,
    Path(thp): Path<String>,
    body: Bytes,
) -> Response {
    let result = tokio::task::spawn_blocking(move || protocol.recover(&thp, &body)).await;

    match result {
        Ok(Ok(y)) => ([(header::CONTENT_TYPE, RECOVERY_CONTENT_TYPE)], y).into_response(),
        Ok(Err(err)) => (status_for(&err), err.to_string()).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "recovery task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

/// Status code a protocol error is answered with.
pub fn status_for(err: &ProtocolError) -> StatusCode {
    match err {
        ProtocolError::KeyNotFound { .. } => StatusCode::NOT_FOUND,
        ProtocolError::InvalidKey { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
