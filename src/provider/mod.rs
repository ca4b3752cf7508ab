//! Square integration via REST API (no SDK dependency)
//!
//! OAuth token exchange, webhook signature verification, and the
//! authenticated [`client::ProviderClient`] used by the sync engine.

pub mod client;
pub mod types;

pub use client::ProviderClient;

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::Config;
use types::TokenResponse;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Signature header sent with every webhook delivery
pub const SIGNATURE_HEADER: &str = "x-provider-signature";

/// OAuth scopes requested on connect
pub const OAUTH_SCOPES: &[&str] = &[
    "MERCHANT_PROFILE_READ",
    "ITEMS_READ",
    "CUSTOMERS_READ",
    "ORDERS_READ",
    "APPOINTMENTS_READ",
    "PAYMENTS_READ",
    "INVENTORY_READ",
    "EMPLOYEES_READ",
];

/// Exchange an authorization code for a token pair
pub async fn obtain_token(config: &Config, code: &str) -> Result<TokenResponse, BoxError> {
    token_request(
        config,
        serde_json::json!({
            "client_id": config.provider_app_id,
            "client_secret": config.provider_app_secret,
            "code": code,
            "grant_type": "authorization_code",
        }),
    )
    .await
}

/// Exchange a refresh token for a new token pair
pub async fn refresh_token(config: &Config, refresh: &str) -> Result<TokenResponse, BoxError> {
    token_request(
        config,
        serde_json::json!({
            "client_id": config.provider_app_id,
            "client_secret": config.provider_app_secret,
            "refresh_token": refresh,
            "grant_type": "refresh_token",
        }),
    )
    .await
}

async fn token_request(
    config: &Config,
    body: serde_json::Value,
) -> Result<TokenResponse, BoxError> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    let resp: serde_json::Value = client
        .post(format!("{}/oauth2/token", config.provider_base_url))
        .json(&body)
        .send()
        .await?
        .json()
        .await?;

    if resp.get("access_token").is_none() {
        return Err(format!("Token exchange failed: {resp}").into());
    }

    Ok(serde_json::from_value(resp)?)
}

/// Verify a webhook signature (HMAC-SHA256 over notification URL + raw body)
///
/// The signature header carries `base64(HMAC-SHA256(key, url || body))`.
/// Comparison is constant-time via `Mac::verify_slice`. The body must be the
/// exact bytes received on the wire — reserializing before verification
/// invalidates the signature.
pub fn verify_signature(
    notification_url: &str,
    body: &[u8],
    signature_b64: &str,
    key: &str,
) -> Result<(), &'static str> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(notification_url.as_bytes());
    mac.update(body);

    let sig_bytes = base64::engine::general_purpose::STANDARD
        .decode(signature_b64)
        .map_err(|_| "Invalid signature base64")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(url: &str, body: &[u8], key: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes()).unwrap();
        mac.update(url.as_bytes());
        mac.update(body);
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let url = "https://app.example.com/webhooks";
        let body = br#"{"type":"order.updated","merchant_id":"M1"}"#;
        let sig = sign(url, body, "signing-key");
        assert!(verify_signature(url, body, &sig, "signing-key").is_ok());
    }

    #[test]
    fn rejects_mutated_body() {
        let url = "https://app.example.com/webhooks";
        let body = br#"{"type":"order.updated","merchant_id":"M1"}"#;
        let sig = sign(url, body, "signing-key");
        let mut tampered = body.to_vec();
        tampered[10] ^= 1;
        assert!(verify_signature(url, &tampered, &sig, "signing-key").is_err());
    }

    #[test]
    fn rejects_mutated_signature() {
        let url = "https://app.example.com/webhooks";
        let body = br#"{"type":"order.updated","merchant_id":"M1"}"#;
        let mut sig = sign(url, body, "signing-key");
        sig.replace_range(0..1, if sig.starts_with('A') { "B" } else { "A" });
        assert!(verify_signature(url, body, &sig, "signing-key").is_err());
    }

    #[test]
    fn rejects_wrong_url() {
        let body = br#"{"type":"order.updated"}"#;
        let sig = sign("https://app.example.com/webhooks", body, "signing-key");
        assert!(
            verify_signature("https://other.example.com/webhooks", body, &sig, "signing-key")
                .is_err()
        );
    }

    #[test]
    fn rejects_garbage_base64() {
        assert!(verify_signature("u", b"b", "!!not-base64!!", "k").is_err());
    }
}
