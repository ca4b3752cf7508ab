//! Order mirror with detachable line items
//!
//! The line-item set is fully replaced (delete-then-insert) on every
//! re-sync of an order; line items are never merged.

use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::provider::types::{Order, ts_millis};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Upsert one page of orders (and their line items) in a single transaction
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

/// Single-order path for webhook-triggered updates (order re-fetched by id)
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
    let order: Order = serde_json::from_value(raw.clone())?;

    sqlx::query(
        r#"
        INSERT INTO orders (
            merchant_id, order_id, location_id, customer_id, state,
            total_amount, total_tax_amount, total_discount_amount,
            total_tip_amount, currency, created_at, updated_at, closed_at,
            raw_data, synced_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        ON CONFLICT (merchant_id, order_id)
        DO UPDATE SET location_id = EXCLUDED.location_id,
                      customer_id = EXCLUDED.customer_id,
                      state = EXCLUDED.state,
                      total_amount = EXCLUDED.total_amount,
                      total_tax_amount = EXCLUDED.total_tax_amount,
                      total_discount_amount = EXCLUDED.total_discount_amount,
                      total_tip_amount = EXCLUDED.total_tip_amount,
                      currency = EXCLUDED.currency,
                      created_at = EXCLUDED.created_at,
                      updated_at = EXCLUDED.updated_at,
                      closed_at = EXCLUDED.closed_at,
                      raw_data = EXCLUDED.raw_data,
                      synced_at = EXCLUDED.synced_at
        "#,
    )
    .bind(merchant_id)
    .bind(&order.id)
    .bind(&order.location_id)
    .bind(&order.customer_id)
    .bind(&order.state)
    .bind(order.total_money.amount_or_zero())
    .bind(order.total_tax_money.amount_or_zero())
    .bind(order.total_discount_money.amount_or_zero())
    .bind(order.total_tip_money.amount_or_zero())
    .bind(&order.total_money.currency)
    .bind(ts_millis(order.created_at.as_deref()))
    .bind(ts_millis(order.updated_at.as_deref()))
    .bind(ts_millis(order.closed_at.as_deref()))
    .bind(raw)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    // Replace the line-item set wholesale
    sqlx::query("DELETE FROM order_line_items WHERE merchant_id = $1 AND order_id = $2")
        .bind(merchant_id)
        .bind(&order.id)
        .execute(&mut *conn)
        .await?;

    for li in &order.line_items {
        sqlx::query(
            r#"
            INSERT INTO order_line_items (
                merchant_id, order_id, uid, name, quantity,
                catalog_object_id, variation_name, base_price_amount,
                total_amount, currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(merchant_id)
        .bind(&order.id)
        .bind(&li.uid)
        .bind(&li.name)
        .bind(li.quantity_f64())
        .bind(&li.catalog_object_id)
        .bind(&li.variation_name)
        .bind(li.base_price_money.amount_or_zero())
        .bind(li.total_money.amount_or_zero())
        .bind(&li.total_money.currency)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
