//! Catalog mirror (items, categories, variations)
//!
//! Tombstoned remote objects become local soft-deletes; the row is retained
//! for referential integrity with historical orders.

use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::provider::types::CatalogObject;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Upsert one page inside a single transaction
pub async fn upsert_page(
    pool: &PgPool,
    merchant_id: &str,
    records: &[Value],
    now: i64,
) -> Result<(), BoxError> {
    let mut tx = pool.begin().await?;
    for raw in records {
        upsert(&mut tx, merchant_id, raw, now).await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Single-record path for webhook-triggered updates
pub async fn upsert_one(
    pool: &PgPool,
    merchant_id: &str,
    raw: &Value,
    now: i64,
) -> Result<(), BoxError> {
    let mut tx = pool.begin().await?;
    upsert(&mut tx, merchant_id, raw, now).await?;
    tx.commit().await?;
    Ok(())
}

async fn upsert(
    conn: &mut PgConnection,
    merchant_id: &str,
    raw: &Value,
    now: i64,
) -> Result<(), BoxError> {
    let object: CatalogObject = serde_json::from_value(raw.clone())?;
    let price = object.price();

    sqlx::query(
        r#"
        INSERT INTO catalog_items (
            merchant_id, object_id, object_type, name, price_amount,
            currency, category_id, is_deleted, version, raw_data, synced_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (merchant_id, object_id)
        DO UPDATE SET object_type = EXCLUDED.object_type,
                      name = EXCLUDED.name,
                      price_amount = EXCLUDED.price_amount,
                      currency = EXCLUDED.currency,
                      category_id = EXCLUDED.category_id,
                      is_deleted = EXCLUDED.is_deleted,
                      version = EXCLUDED.version,
                      raw_data = EXCLUDED.raw_data,
                      synced_at = EXCLUDED.synced_at
        "#,
    )
    .bind(merchant_id)
    .bind(&object.id)
    .bind(&object.object_type)
    .bind(object.display_name())
    .bind(price.amount_or_zero())
    .bind(&price.currency)
    .bind(object.parent_ref())
    .bind(object.is_deleted)
    .bind(object.version)
    .bind(raw)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}
