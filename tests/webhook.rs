//! Webhook ingress: signature verification and acknowledgement

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use pearl_sync::api;
use pearl_sync::provider::SIGNATURE_HEADER;
use sha2::Sha256;
use tower::ServiceExt;

const KEY: &str = "wh-signature-key";

/// Matches the provider's scheme: HMAC-SHA256 over notification URL + raw body
fn sign(url: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(KEY.as_bytes()).unwrap();
    mac.update(url.as_bytes());
    mac.update(body);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

fn post_webhook(body: &[u8], signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/webhooks").header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header(SIGNATURE_HEADER, sig);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let app = api::create_router(common::test_state(Some(KEY)));

    let body = br#"{"type":"order.created","merchant_id":"PM1"}"#;
    let resp = app.oneshot(post_webhook(body, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tampered_body_is_rejected() {
    let app = api::create_router(common::test_state(Some(KEY)));

    let signed = br#"{"type":"order.created","merchant_id":"PM1"}"#;
    let sig = sign("https://app.example.com/webhooks", signed);
    let tampered = br#"{"type":"order.created","merchant_id":"PM2"}"#;

    let resp = app
        .oneshot(post_webhook(tampered, Some(&sig)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_signature_is_rejected() {
    let app = api::create_router(common::test_state(Some(KEY)));

    let body = br#"{"type":"order.created","merchant_id":"PM1"}"#;
    let resp = app
        .oneshot(post_webhook(body, Some("not base64!!")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_signature_is_acknowledged_immediately() {
    let app = api::create_router(common::test_state(Some(KEY)));

    // Unknown merchant: the spawned processing task drops the event, but the
    // delivery is still acknowledged with 200 before that runs.
    let body = br#"{"type":"order.created","merchant_id":"PM-unknown"}"#;
    let sig = sign("https://app.example.com/webhooks", body);

    let resp = app.oneshot(post_webhook(body, Some(&sig))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["received"], true);
}

#[tokio::test]
async fn invalid_json_after_valid_signature_is_bad_request() {
    let app = api::create_router(common::test_state(Some(KEY)));

    let body = b"not json";
    let sig = sign("https://app.example.com/webhooks", body);

    let resp = app.oneshot(post_webhook(body, Some(&sig))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn no_key_configured_skips_verification() {
    let app = api::create_router(common::test_state(None));

    let body = br#"{"type":"order.created","merchant_id":"PM-unknown"}"#;
    let resp = app.oneshot(post_webhook(body, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
