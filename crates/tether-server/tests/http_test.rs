//! HTTP routes driven through the router without a socket.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use tether_core::Advertisement;
use tether_crypto::{Curve, KeyMaterial, SignatureAlgorithm, ThumbprintAlgorithm};
use tether_server::{
    ServerProtocol,
    http::{ADVERTISEMENT_CONTENT_TYPE, RECOVERY_CONTENT_TYPE, router},
};
use tower::ServiceExt;

struct Fixture {
    router: Router,
    protocol: Arc<ServerProtocol>,
    exchange: KeyMaterial,
    signing: KeyMaterial,
}

fn fixture() -> Fixture {
    let exchange = KeyMaterial::generate_exchange(Curve::P256).unwrap();
    let signing = KeyMaterial::generate_signing(Curve::P256).unwrap();
    let protocol = Arc::new(ServerProtocol::new([exchange.clone(), signing.clone()]).unwrap());
    Fixture { router: router(Arc::clone(&protocol)), protocol, exchange, signing }
}

async fn send(
    router: Router,
    method: Method,
    uri: &str,
    body: Vec<u8>,
) -> (StatusCode, Option<String>, Vec<u8>) {
    let request = Request::builder().method(method).uri(uri).body(Body::from(body)).unwrap();
    let response = router.oneshot(request).await.unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    (status, content_type, body)
}

#[tokio::test]
async fn default_advertisement() {
    let fx = fixture();

    let (status, content_type, body) = send(fx.router, Method::GET, "/adv", Vec::new()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(ADVERTISEMENT_CONTENT_TYPE));
    let adv = Advertisement::parse(&body, &SignatureAlgorithm::ALL).unwrap();
    assert_eq!(adv.exchange_keys().keys(), &[fx.exchange.public()]);
}

#[tokio::test]
async fn advertisement_by_signing_thumbprint() {
    let fx = fixture();
    let thp = fx.signing.thumbprint(ThumbprintAlgorithm::Sha1);

    let (status, _, body) = send(fx.router, Method::GET, &format!("/adv/{thp}"), Vec::new()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(Some(body.as_slice()), fx.protocol.advertisement(""));
}

#[tokio::test]
async fn unknown_advertisement_is_404() {
    let fx = fixture();

    let (status, _, _) = send(fx.router, Method::GET, "/adv/unknown", Vec::new()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recovery_round_trip() {
    let fx = fixture();
    let thp = fx.exchange.thumbprint(ThumbprintAlgorithm::Sha256);
    let x = KeyMaterial::generate_exchange(Curve::P256).unwrap().public();
    let request = x.to_json().unwrap();

    let (status, content_type, body) =
        send(fx.router, Method::POST, &format!("/rec/{thp}"), request.clone()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(RECOVERY_CONTENT_TYPE));
    assert_eq!(body, fx.protocol.recover(&thp, &request).unwrap());
}

#[tokio::test]
async fn recovery_for_unknown_key_is_404() {
    let fx = fixture();
    let request = KeyMaterial::generate_exchange(Curve::P256).unwrap().public().to_json().unwrap();

    let (status, _, _) = send(fx.router, Method::POST, "/rec/unknown", request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_recovery_is_400() {
    let fx = fixture();
    let thp = fx.exchange.thumbprint(ThumbprintAlgorithm::Sha256);

    let (status, _, body) =
        send(fx.router, Method::POST, &format!("/rec/{thp}"), b"garbage".to_vec()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body).unwrap().starts_with("invalid key"));
}

#[tokio::test]
async fn recovery_requires_post() {
    let fx = fixture();
    let thp = fx.exchange.thumbprint(ThumbprintAlgorithm::Sha256);

    let (status, _, _) = send(fx.router, Method::GET, &format!("/rec/{thp}"), Vec::new()).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
