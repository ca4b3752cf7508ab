//! OAuth connect/callback flow over the router

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use pearl_sync::api;
use tower::ServiceExt;

#[tokio::test]
async fn connect_requires_merchant_id() {
    let app = api::create_router(common::test_state(None));

    let resp = app
        .oneshot(Request::get("/connect").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn connect_rejects_blank_merchant_id() {
    let app = api::create_router(common::test_state(None));

    let resp = app
        .oneshot(
            Request::get("/connect?merchant_id=%20%20")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn connect_redirects_to_provider_with_state() {
    let app = api::create_router(common::test_state(None));

    let resp = app
        .oneshot(
            Request::get("/connect?merchant_id=m1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(location.starts_with("https://connect.example.com/oauth2/authorize?"));
    assert!(location.contains("state="));
    assert!(location.contains("client_id=app-id"));
}

#[tokio::test]
async fn callback_rejects_unknown_state() {
    // Unknown state must fail before anything is persisted
    let app = api::create_router(common::test_state(None));

    let resp = app
        .oneshot(
            Request::get("/callback?code=C&state=never-issued")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn callback_rejects_missing_state() {
    let app = api::create_router(common::test_state(None));

    let resp = app
        .oneshot(
            Request::get("/callback?code=C")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn callback_denial_redirects_to_denied_landing() {
    let app = api::create_router(common::test_state(None));

    let resp = app
        .oneshot(
            Request::get("/callback?error=access_denied")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(location.starts_with("https://dash.example.com/"));
    assert!(location.contains("connection=denied"));
}

#[tokio::test]
async fn status_requires_merchant_id() {
    let app = api::create_router(common::test_state(None));

    let resp = app
        .oneshot(Request::get("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn disconnect_requires_merchant_id() {
    let app = api::create_router(common::test_state(None));

    let resp = app
        .oneshot(
            Request::delete("/disconnect")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"merchant_id":""}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
