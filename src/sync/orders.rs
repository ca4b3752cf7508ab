//! Historical orders sync, one task per location
//!
//! Bulk pulls are bounded by the lookback window and restricted to
//! terminal states; in-progress orders arrive via webhooks instead.

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
    closed_at_start_ms: i64,
) -> Result<u32, BoxError> {
    let mut cursor: Option<String> = None;
    let mut total = 0u32;

    loop {
        let page = client
            .search_orders(location_id, closed_at_start_ms, cursor.as_deref())
            .await?;
        if !page.errors.is_empty() {
            return Err(format!(
                "Orders sync failed for location {location_id}: {}",
                format_errors(&page.errors)
            )
            .into());
        }

        let now = db::now_millis();
        db::orders::upsert_page(pool, merchant_id, &page.records, now).await?;
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
        "Orders synced"
    );
    Ok(total)
}
