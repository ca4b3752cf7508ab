//! Webhook ingress
//!
//! POST /webhooks — receive → verify → acknowledge → process.
//!
//! The handler must see the raw body bytes: the signature covers the
//! configured notification URL plus the exact bytes on the wire, and any
//! reserialization before verification invalidates it. The 200 response is
//! sent as soon as verification passes — the provider enforces delivery
//! timeouts and retries on non-2xx, so processing happens in a spawned
//! task and its failures are only visible in logs and on the connection
//! row.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::provider::{SIGNATURE_HEADER, verify_signature};
use crate::state::AppState;
use crate::sync::events;

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match &state.config.webhook_signature_key {
        Some(key) => {
            let signature = match headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
                Some(s) => s,
                None => {
                    tracing::warn!("Webhook missing signature header");
                    return StatusCode::UNAUTHORIZED.into_response();
                }
            };

            let notification_url = state.config.notification_url();
            if let Err(e) = verify_signature(&notification_url, &body, signature, key) {
                tracing::warn!(error = e, "Webhook signature verification failed");
                return StatusCode::UNAUTHORIZED.into_response();
            }
        }
        None => {
            tracing::warn!(
                "WEBHOOK_SIGNATURE_KEY not configured — accepting webhook WITHOUT \
                 signature verification"
            );
        }
    }

    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    tracing::info!(
        event_type = event["type"].as_str().unwrap_or("<missing>"),
        "Webhook received"
    );

    // Acknowledge now; process asynchronously
    tokio::spawn(events::process_event(state, event));

    Json(serde_json::json!({ "received": true })).into_response()
}
