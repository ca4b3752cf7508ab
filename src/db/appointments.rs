//! Appointment (booking) mirror

use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::provider::types::{Booking, ts_millis};

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
    let booking: Booking = serde_json::from_value(raw.clone())?;
    let segment = booking.appointment_segments.first();

    sqlx::query(
        r#"
        INSERT INTO appointments (
            merchant_id, booking_id, location_id, customer_id, status,
            start_at, team_member_id, service_variation_id,
            duration_minutes, no_show, raw_data, synced_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (merchant_id, booking_id)
        DO UPDATE SET location_id = EXCLUDED.location_id,
                      customer_id = EXCLUDED.customer_id,
                      status = EXCLUDED.status,
                      start_at = EXCLUDED.start_at,
                      team_member_id = EXCLUDED.team_member_id,
                      service_variation_id = EXCLUDED.service_variation_id,
                      duration_minutes = EXCLUDED.duration_minutes,
                      no_show = EXCLUDED.no_show,
                      raw_data = EXCLUDED.raw_data,
                      synced_at = EXCLUDED.synced_at
        "#,
    )
    .bind(merchant_id)
    .bind(&booking.id)
    .bind(&booking.location_id)
    .bind(&booking.customer_id)
    .bind(&booking.status)
    .bind(ts_millis(booking.start_at.as_deref()))
    .bind(segment.and_then(|s| s.team_member_id.as_deref()))
    .bind(segment.and_then(|s| s.service_variation_id.as_deref()))
    .bind(segment.and_then(|s| s.duration_minutes))
    .bind(booking.is_no_show())
    .bind(raw)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}
