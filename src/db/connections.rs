//! Credential store: one connection row per merchant
//!
//! Tokens are encrypted at rest; decryption failure surfaces as an error
//! for that read, never as an empty token.

use sqlx::PgPool;

use crate::crypto::MasterKey;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A token is treated as expired this long before its actual expiry, to
/// avoid races where it lapses mid-request.
pub const EXPIRY_MARGIN_MS: i64 = 5 * 60 * 1000;

/// Connection row without token material (status endpoint)
#[derive(Debug, sqlx::FromRow)]
pub struct ConnectionRow {
    pub merchant_id: String,
    pub provider_merchant_id: String,
    pub expires_at: Option<i64>,
    pub sync_status: String,
    pub sync_completed_at: Option<i64>,
    pub last_sync_error: Option<String>,
    pub connected_at: i64,
}

/// Decrypted credentials for one merchant
#[derive(Debug, Clone)]
pub struct Credentials {
    pub merchant_id: String,
    pub provider_merchant_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
}

impl Credentials {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|exp| exp - EXPIRY_MARGIN_MS <= now)
    }
}

/// Token fields to persist
#[derive(Debug)]
pub struct TokenSet<'a> {
    pub access_token: &'a str,
    pub refresh_token: Option<&'a str>,
    pub expires_at: Option<i64>,
    pub token_type: Option<&'a str>,
    pub scopes: Option<String>,
}

/// Upsert the connection row for a merchant. Token fields and the provider
/// merchant id are replaced; sync status fields are left to the explicit
/// markers below.
pub async fn save(
    pool: &PgPool,
    key: &MasterKey,
    merchant_id: &str,
    provider_merchant_id: &str,
    tokens: &TokenSet<'_>,
    now: i64,
) -> Result<(), BoxError> {
    let access_enc = key.encrypt_string(tokens.access_token)?;
    let refresh_enc = tokens
        .refresh_token
        .map(|t| key.encrypt_string(t))
        .transpose()?;

    sqlx::query(
        r#"
        INSERT INTO connections (
            merchant_id, provider_merchant_id, access_token_enc,
            refresh_token_enc, expires_at, token_type, scopes, connected_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (merchant_id)
        DO UPDATE SET provider_merchant_id = EXCLUDED.provider_merchant_id,
                      access_token_enc = EXCLUDED.access_token_enc,
                      refresh_token_enc = COALESCE(EXCLUDED.refresh_token_enc,
                                                   connections.refresh_token_enc),
                      expires_at = EXCLUDED.expires_at,
                      token_type = EXCLUDED.token_type,
                      scopes = COALESCE(EXCLUDED.scopes, connections.scopes)
        "#,
    )
    .bind(merchant_id)
    .bind(provider_merchant_id)
    .bind(&access_enc)
    .bind(&refresh_enc)
    .bind(tokens.expires_at)
    .bind(tokens.token_type)
    .bind(&tokens.scopes)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Decrypted credentials for a merchant, or None when not connected
pub async fn get(
    pool: &PgPool,
    key: &MasterKey,
    merchant_id: &str,
) -> Result<Option<Credentials>, BoxError> {
    let row: Option<(String, String, String, Option<String>, Option<i64>)> = sqlx::query_as(
        "SELECT merchant_id, provider_merchant_id, access_token_enc,
                refresh_token_enc, expires_at
         FROM connections WHERE merchant_id = $1",
    )
    .bind(merchant_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| decrypt_row(key, r)).transpose()
}

/// Reverse lookup by provider merchant id (webhook routing)
pub async fn get_by_provider_merchant_id(
    pool: &PgPool,
    key: &MasterKey,
    provider_merchant_id: &str,
) -> Result<Option<Credentials>, BoxError> {
    let row: Option<(String, String, String, Option<String>, Option<i64>)> = sqlx::query_as(
        "SELECT merchant_id, provider_merchant_id, access_token_enc,
                refresh_token_enc, expires_at
         FROM connections WHERE provider_merchant_id = $1",
    )
    .bind(provider_merchant_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| decrypt_row(key, r)).transpose()
}

fn decrypt_row(
    key: &MasterKey,
    (merchant_id, provider_merchant_id, access_enc, refresh_enc, expires_at): (
        String,
        String,
        String,
        Option<String>,
        Option<i64>,
    ),
) -> Result<Credentials, BoxError> {
    let access_token = key.decrypt_string(&access_enc)?;
    let refresh_token = refresh_enc
        .as_deref()
        .map(|enc| key.decrypt_string(enc))
        .transpose()?;
    Ok(Credentials {
        merchant_id,
        provider_merchant_id,
        access_token,
        refresh_token,
        expires_at,
    })
}

/// Connection row for the status endpoint (no token decryption)
pub async fn find(pool: &PgPool, merchant_id: &str) -> Result<Option<ConnectionRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT merchant_id, provider_merchant_id, expires_at, sync_status,
                sync_completed_at, last_sync_error, connected_at
         FROM connections WHERE merchant_id = $1",
    )
    .bind(merchant_id)
    .fetch_optional(pool)
    .await
}

/// Hard delete — disconnection is irreversible and requires re-authorization
pub async fn delete(pool: &PgPool, merchant_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM connections WHERE merchant_id = $1")
        .bind(merchant_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_sync_pending(pool: &PgPool, merchant_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE connections
         SET sync_status = 'pending', sync_completed_at = NULL, last_sync_error = NULL
         WHERE merchant_id = $1",
    )
    .bind(merchant_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_sync_success(
    pool: &PgPool,
    merchant_id: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE connections
         SET sync_status = 'success', sync_completed_at = $1, last_sync_error = NULL
         WHERE merchant_id = $2",
    )
    .bind(now)
    .bind(merchant_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_sync_error(
    pool: &PgPool,
    merchant_id: &str,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE connections SET sync_status = 'error', last_sync_error = $1
         WHERE merchant_id = $2",
    )
    .bind(message)
    .bind(merchant_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a webhook processing failure on the connection row without
/// touching the sync status.
pub async fn record_webhook_error(
    pool: &PgPool,
    merchant_id: &str,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE connections SET last_sync_error = $1 WHERE merchant_id = $2")
        .bind(message)
        .bind(merchant_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(expires_at: Option<i64>) -> Credentials {
        Credentials {
            merchant_id: "m1".into(),
            provider_merchant_id: "PM1".into(),
            access_token: "tok".into(),
            refresh_token: None,
            expires_at,
        }
    }

    #[test]
    fn expiry_applies_safety_margin() {
        let now = 1_000_000_000;
        assert!(creds(Some(now)).is_expired(now));
        assert!(creds(Some(now + EXPIRY_MARGIN_MS)).is_expired(now));
        assert!(!creds(Some(now + EXPIRY_MARGIN_MS + 1)).is_expired(now));
    }

    #[test]
    fn missing_expiry_never_expires() {
        assert!(!creds(None).is_expired(i64::MAX));
    }
}
