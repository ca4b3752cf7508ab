//! OAuth flow support: anti-forgery state store and authorize URL
//!
//! State entries live in-process for the duration of one handshake; entries
//! not consumed within the TTL are swept by the periodic cleanup task in
//! `main`. A multi-instance deployment would need these in a shared store —
//! single-process is the current deployment target.

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::Config;
use crate::db;
use crate::db::connections::Credentials;
use crate::provider::{self, OAUTH_SCOPES};
use crate::provider::types::ts_millis;
use crate::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// State entries expire 10 minutes after issuance
pub const STATE_TTL_MS: i64 = 10 * 60 * 1000;

#[derive(Debug, Clone)]
struct PendingAuth {
    merchant_id: String,
    expires_at: i64,
}

/// In-memory anti-forgery state map for in-flight OAuth handshakes
#[derive(Clone, Default)]
pub struct StateStore {
    entries: Arc<DashMap<String, PendingAuth>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new single-use state token for a merchant
    pub fn issue(&self, merchant_id: &str, now: i64) -> String {
        let state = uuid::Uuid::new_v4().to_string();
        self.entries.insert(
            state.clone(),
            PendingAuth {
                merchant_id: merchant_id.to_string(),
                expires_at: now + STATE_TTL_MS,
            },
        );
        state
    }

    /// Consume a state token (single use), returning the merchant it was
    /// issued for. Unknown or expired tokens return `None`.
    pub fn consume(&self, state: &str, now: i64) -> Option<String> {
        let (_, pending) = self.entries.remove(state)?;
        if pending.expires_at < now {
            return None;
        }
        Some(pending.merchant_id)
    }

    /// Drop expired entries (periodic sweep)
    pub fn cleanup(&self, now: i64) {
        self.entries.retain(|_, pending| pending.expires_at >= now);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Refresh the stored token pair for a merchant, preserving all other
/// connection fields. Requires an existing refresh token.
pub async fn refresh_credentials(
    state: &AppState,
    merchant_id: &str,
) -> Result<Credentials, BoxError> {
    let creds = db::connections::get(&state.pool, &state.master_key, merchant_id)
        .await?
        .ok_or("No credentials stored for merchant")?;
    let refresh = creds
        .refresh_token
        .as_deref()
        .ok_or("No refresh token stored for merchant")?;

    let tokens = provider::refresh_token(&state.config, refresh).await?;
    let provider_merchant_id = tokens
        .merchant_id
        .clone()
        .unwrap_or_else(|| creds.provider_merchant_id.clone());
    let expires_at = ts_millis(tokens.expires_at.as_deref());

    db::connections::save(
        &state.pool,
        &state.master_key,
        merchant_id,
        &provider_merchant_id,
        &db::connections::TokenSet {
            access_token: &tokens.access_token,
            refresh_token: tokens.refresh_token.as_deref(),
            expires_at,
            token_type: tokens.token_type.as_deref(),
            scopes: tokens.scopes.as_ref().map(|s| s.join(" ")),
        },
        db::now_millis(),
    )
    .await?;

    tracing::info!(merchant_id = %merchant_id, "Provider tokens refreshed");

    Ok(Credentials {
        merchant_id: merchant_id.to_string(),
        provider_merchant_id,
        access_token: tokens.access_token,
        refresh_token: tokens
            .refresh_token
            .or(creds.refresh_token),
        expires_at,
    })
}

/// Provider authorization URL carrying the scope list and state value
pub fn authorize_url(config: &Config, state: &str) -> String {
    format!(
        "{}/oauth2/authorize?client_id={}&scope={}&session=false&state={}",
        config.provider_base_url,
        config.provider_app_id,
        OAUTH_SCOPES.join("+"),
        state,
    )
}
