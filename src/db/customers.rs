//! Customer mirror
//!
//! The locally derived `segment` column is never written by sync paths —
//! upserts list provider-owned columns only.

use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::provider::types::Customer;

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
    let customer: Customer = serde_json::from_value(raw.clone())?;

    sqlx::query(
        r#"
        INSERT INTO customers (
            merchant_id, customer_id, given_name, family_name,
            email_address, phone_number, note, is_deleted, raw_data, synced_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8, $9)
        ON CONFLICT (merchant_id, customer_id)
        DO UPDATE SET given_name = EXCLUDED.given_name,
                      family_name = EXCLUDED.family_name,
                      email_address = EXCLUDED.email_address,
                      phone_number = EXCLUDED.phone_number,
                      note = EXCLUDED.note,
                      is_deleted = FALSE,
                      raw_data = EXCLUDED.raw_data,
                      synced_at = EXCLUDED.synced_at
        "#,
    )
    .bind(merchant_id)
    .bind(&customer.id)
    .bind(&customer.given_name)
    .bind(&customer.family_name)
    .bind(&customer.email_address)
    .bind(&customer.phone_number)
    .bind(&customer.note)
    .bind(raw)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Soft delete on a customer.deleted event
pub async fn soft_delete(
    pool: &PgPool,
    merchant_id: &str,
    customer_id: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE customers SET is_deleted = TRUE, synced_at = $1
         WHERE merchant_id = $2 AND customer_id = $3",
    )
    .bind(now)
    .bind(merchant_id)
    .bind(customer_id)
    .execute(pool)
    .await?;
    Ok(())
}
