//! Appointments (bookings) sync, one task per location
//!
//! Not every merchant has the appointments feature enabled; the provider
//! reports that as a service-unavailable/invalid-request error, which we
//! treat as a zero-result success rather than failing the whole sync.

use sqlx::PgPool;

use crate::db;
use crate::provider::ProviderClient;
use crate::provider::types::format_errors;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn sync_location(
    pool: &PgPool,
    client: &ProviderClient,
    merchant_id: &str,
    location_id: &str,
    start_at_min_ms: i64,
) -> Result<u32, BoxError> {
    let mut cursor: Option<String> = None;
    let mut total = 0u32;

    loop {
        let page = client
            .list_bookings(location_id, start_at_min_ms, cursor.as_deref())
            .await?;
        if !page.errors.is_empty() {
            if page.errors.iter().any(|e| e.is_feature_unavailable()) {
                tracing::info!(
                    merchant_id = %merchant_id,
                    location_id = %location_id,
                    "Appointments not enabled for merchant, skipping"
                );
                return Ok(total);
            }
            return Err(format!(
                "Appointments sync failed for location {location_id}: {}",
                format_errors(&page.errors)
            )
            .into());
        }

        let now = db::now_millis();
        db::appointments::upsert_page(pool, merchant_id, &page.records, now).await?;
        total += page.records.len() as u32;

        match page.cursor {
            Some(c) => cursor = Some(c),
            None => break,
        }
    }

    tracing::info!(
        merchant_id = %merchant_id,
        location_id = %location_id,
        count = total,
        "Appointments synced"
    );
    Ok(total)
}
