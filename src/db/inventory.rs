//! Inventory count mirror, keyed by (merchant, object, location)

use serde_json::Value;
use sqlx::PgPool;

use crate::provider::types::{InventoryCount, ts_millis};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn upsert_one(
    pool: &PgPool,
    merchant_id: &str,
    raw: &Value,
    now: i64,
) -> Result<(), BoxError> {
    let count: InventoryCount = serde_json::from_value(raw.clone())?;
    let quantity: f64 = count
        .quantity
        .as_deref()
        .and_then(|q| q.parse().ok())
        .unwrap_or(0.0);

    sqlx::query(
        r#"
        INSERT INTO inventory (
            merchant_id, catalog_object_id, location_id, state,
            quantity, calculated_at, raw_data, synced_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (merchant_id, catalog_object_id, location_id)
        DO UPDATE SET state = EXCLUDED.state,
                      quantity = EXCLUDED.quantity,
                      calculated_at = EXCLUDED.calculated_at,
                      raw_data = EXCLUDED.raw_data,
                      synced_at = EXCLUDED.synced_at
        "#,
    )
    .bind(merchant_id)
    .bind(&count.catalog_object_id)
    .bind(&count.location_id)
    .bind(&count.state)
    .bind(quantity)
    .bind(ts_millis(count.calculated_at.as_deref()))
    .bind(raw)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}
