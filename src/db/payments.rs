//! Payment mirror
//!
//! Linked to an order by id only — a payment may arrive before or without
//! its order, so no foreign key is enforced.

use serde_json::Value;
use sqlx::PgPool;

use crate::provider::types::{Payment, ts_millis};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn upsert_one(
    pool: &PgPool,
    merchant_id: &str,
    raw: &Value,
    now: i64,
) -> Result<(), BoxError> {
    let payment: Payment = serde_json::from_value(raw.clone())?;
    let card = payment
        .card_details
        .as_ref()
        .and_then(|d| d.card.as_ref());

    sqlx::query(
        r#"
        INSERT INTO payments (
            merchant_id, payment_id, order_id, location_id, status,
            amount, tip_amount, total_amount, currency, source_type,
            card_brand, card_last_4, created_at, updated_at, raw_data, synced_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ON CONFLICT (merchant_id, payment_id)
        DO UPDATE SET order_id = EXCLUDED.order_id,
                      location_id = EXCLUDED.location_id,
                      status = EXCLUDED.status,
                      amount = EXCLUDED.amount,
                      tip_amount = EXCLUDED.tip_amount,
                      total_amount = EXCLUDED.total_amount,
                      currency = EXCLUDED.currency,
                      source_type = EXCLUDED.source_type,
                      card_brand = EXCLUDED.card_brand,
                      card_last_4 = EXCLUDED.card_last_4,
                      created_at = EXCLUDED.created_at,
                      updated_at = EXCLUDED.updated_at,
                      raw_data = EXCLUDED.raw_data,
                      synced_at = EXCLUDED.synced_at
        "#,
    )
    .bind(merchant_id)
    .bind(&payment.id)
    .bind(&payment.order_id)
    .bind(&payment.location_id)
    .bind(&payment.status)
    .bind(payment.amount_money.amount_or_zero())
    .bind(payment.tip_money.amount_or_zero())
    .bind(payment.total_money.amount_or_zero())
    .bind(&payment.amount_money.currency)
    .bind(&payment.source_type)
    .bind(card.and_then(|c| c.card_brand.as_deref()))
    .bind(card.and_then(|c| c.last_4.as_deref()))
    .bind(ts_millis(payment.created_at.as_deref()))
    .bind(ts_millis(payment.updated_at.as_deref()))
    .bind(raw)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}
