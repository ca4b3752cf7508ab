//! Location mirror
//!
//! Locations are never deleted once seen — the provider signals
//! deactivation through its own status field.

use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::provider::types::Location;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Upsert one page inside a single transaction, returning the location ids
/// seen on the page.
pub async fn upsert_page(
    pool: &PgPool,
    merchant_id: &str,
    records: &[Value],
    now: i64,
) -> Result<Vec<String>, BoxError> {
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(records.len());
    for raw in records {
        ids.push(upsert(&mut tx, merchant_id, raw, now).await?);
    }
    tx.commit().await?;
    Ok(ids)
}

async fn upsert(
    conn: &mut PgConnection,
    merchant_id: &str,
    raw: &Value,
    now: i64,
) -> Result<String, BoxError> {
    let location: Location = serde_json::from_value(raw.clone())?;
    let address = location.address.as_ref();

    sqlx::query(
        r#"
        INSERT INTO locations (
            merchant_id, location_id, name, status, timezone,
            address_line_1, locality, postal_code, country,
            business_hours, raw_data, synced_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (merchant_id, location_id)
        DO UPDATE SET name = EXCLUDED.name,
                      status = EXCLUDED.status,
                      timezone = EXCLUDED.timezone,
                      address_line_1 = EXCLUDED.address_line_1,
                      locality = EXCLUDED.locality,
                      postal_code = EXCLUDED.postal_code,
                      country = EXCLUDED.country,
                      business_hours = EXCLUDED.business_hours,
                      raw_data = EXCLUDED.raw_data,
                      synced_at = EXCLUDED.synced_at
        "#,
    )
    .bind(merchant_id)
    .bind(&location.id)
    .bind(&location.name)
    .bind(&location.status)
    .bind(&location.timezone)
    .bind(address.and_then(|a| a.address_line_1.as_deref()))
    .bind(address.and_then(|a| a.locality.as_deref()))
    .bind(address.and_then(|a| a.postal_code.as_deref()))
    .bind(address.and_then(|a| a.country.as_deref()))
    .bind(&location.business_hours)
    .bind(raw)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(location.id)
}

/// Location count for the status endpoint
pub async fn count(pool: &PgPool, merchant_id: &str) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM locations WHERE merchant_id = $1")
        .bind(merchant_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
