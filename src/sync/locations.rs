//! Locations bulk sync — first stage, produces the location id set that
//! scopes the per-location stages.

use sqlx::PgPool;

use crate::db;
use crate::provider::ProviderClient;
use crate::provider::types::format_errors;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn sync_all(
    pool: &PgPool,
    client: &ProviderClient,
    merchant_id: &str,
) -> Result<Vec<String>, BoxError> {
    let mut cursor: Option<String> = None;
    let mut ids = Vec::new();

    loop {
        let page = client.list_locations(cursor.as_deref()).await?;
        if !page.errors.is_empty() {
            return Err(format!("Locations sync failed: {}", format_errors(&page.errors)).into());
        }

        let now = db::now_millis();
        ids.extend(db::locations::upsert_page(pool, merchant_id, &page.records, now).await?);

        match page.cursor {
            Some(c) => cursor = Some(c),
            None => break,
        }
    }

    tracing::info!(merchant_id = %merchant_id, count = ids.len(), "Locations synced");
    Ok(ids)
}
