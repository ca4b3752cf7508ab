//! OAuth connection endpoints
//!
//! GET /connect — redirect to the provider authorization page
//! GET /callback — authorization-code exchange + background initial sync
//! GET /status — connection and sync status for a merchant
//! DELETE /disconnect — remove the connection entirely

use axum::Json;
use axum::extract::{Query, State};
use axum::response::Redirect;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::oauth;
use crate::provider::{self, ProviderClient};
use crate::provider::types::ts_millis;
use crate::state::AppState;
use crate::sync;

#[derive(Deserialize)]
pub struct ConnectParams {
    pub merchant_id: Option<String>,
}

/// Start the OAuth handshake for a merchant
pub async fn connect(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
) -> ApiResult<Redirect> {
    let merchant_id = params
        .merchant_id
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::validation("merchant_id is required"))?;

    let oauth_state = state.oauth_states.issue(merchant_id, db::now_millis());
    let url = oauth::authorize_url(&state.config, &oauth_state);

    tracing::info!(merchant_id = %merchant_id, "OAuth connect initiated");
    Ok(Redirect::to(&url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// OAuth callback from the provider
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Redirect> {
    if let Some(error) = params.error {
        tracing::info!(error = %error, "OAuth authorization denied");
        return Ok(landing(&state, "denied"));
    }

    // State must exist, be unexpired, and is single use — rejects CSRF and
    // stale callbacks before anything is persisted.
    let merchant_id = params
        .state
        .as_deref()
        .and_then(|s| state.oauth_states.consume(s, db::now_millis()))
        .ok_or_else(|| ApiError::validation("Invalid or expired OAuth state"))?;

    let code = params
        .code
        .as_deref()
        .ok_or_else(|| ApiError::validation("Missing authorization code"))?;

    let tokens = match provider::obtain_token(&state.config, code).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(merchant_id = %merchant_id, error = %e, "Token exchange failed");
            return Ok(landing(&state, "error"));
        }
    };

    let Some(provider_merchant_id) = tokens.merchant_id.clone() else {
        tracing::error!(merchant_id = %merchant_id, "Token response missing merchant_id");
        return Ok(landing(&state, "error"));
    };

    let now = db::now_millis();
    db::connections::save(
        &state.pool,
        &state.master_key,
        &merchant_id,
        &provider_merchant_id,
        &db::connections::TokenSet {
            access_token: &tokens.access_token,
            refresh_token: tokens.refresh_token.as_deref(),
            expires_at: ts_millis(tokens.expires_at.as_deref()),
            token_type: tokens.token_type.as_deref(),
            scopes: tokens.scopes.as_ref().map(|s| s.join(" ")),
        },
        now,
    )
    .await?;
    db::connections::mark_sync_pending(&state.pool, &merchant_id).await?;

    tracing::info!(
        merchant_id = %merchant_id,
        provider_merchant_id = %provider_merchant_id,
        "Provider connected, starting initial sync"
    );

    // The browser redirect never waits on the sync; the outcome lands on
    // the connection row.
    let client = ProviderClient::new(&state.config.provider_base_url, &tokens.access_token)?;
    tokio::spawn(sync::run_and_record(
        state.pool.clone(),
        client,
        merchant_id,
    ));

    Ok(landing(&state, "success"))
}

fn landing(state: &AppState, outcome: &str) -> Redirect {
    Redirect::to(&format!(
        "{}/settings/integrations?connection={outcome}",
        state.config.frontend_url.trim_end_matches('/')
    ))
}

#[derive(Serialize)]
pub struct SyncStatus {
    pub status: String,
    pub completed_at: Option<i64>,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_merchant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncStatus>,
}

/// Connection and sync status for a merchant
pub async fn status(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
) -> ApiResult<Json<StatusResponse>> {
    let merchant_id = params
        .merchant_id
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::validation("merchant_id is required"))?;

    let Some(row) = db::connections::find(&state.pool, merchant_id).await? else {
        return Ok(Json(StatusResponse {
            connected: false,
            provider_merchant_id: None,
            connected_at: None,
            token_expires_at: None,
            location_count: None,
            sync: None,
        }));
    };

    let location_count = db::locations::count(&state.pool, merchant_id).await?;

    Ok(Json(StatusResponse {
        connected: true,
        provider_merchant_id: Some(row.provider_merchant_id),
        connected_at: Some(row.connected_at),
        token_expires_at: row.expires_at,
        location_count: Some(location_count),
        sync: Some(SyncStatus {
            status: row.sync_status,
            completed_at: row.sync_completed_at,
            error: row.last_sync_error,
        }),
    }))
}

#[derive(Deserialize)]
pub struct DisconnectBody {
    pub merchant_id: String,
}

/// Remove the connection. Hard delete — reconnecting requires a fresh
/// authorization.
pub async fn disconnect(
    State(state): State<AppState>,
    Json(body): Json<DisconnectBody>,
) -> ApiResult<Json<serde_json::Value>> {
    if body.merchant_id.trim().is_empty() {
        return Err(ApiError::validation("merchant_id is required"));
    }

    db::connections::delete(&state.pool, &body.merchant_id).await?;
    tracing::info!(merchant_id = %body.merchant_id, "Provider disconnected");

    Ok(Json(serde_json::json!({ "success": true })))
}
