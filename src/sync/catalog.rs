//! Catalog bulk sync
//!
//! Also the target of `catalog.version.updated` webhooks: catalog volume is
//! small enough that a full re-list is cheaper than incremental diffing.

use sqlx::PgPool;

use crate::db;
use crate::provider::ProviderClient;
use crate::provider::types::format_errors;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn sync_all(
    pool: &PgPool,
    client: &ProviderClient,
    merchant_id: &str,
) -> Result<u32, BoxError> {
    let mut cursor: Option<String> = None;
    let mut total = 0u32;

    loop {
        let page = client.list_catalog(cursor.as_deref()).await?;
        if !page.errors.is_empty() {
            return Err(format!("Catalog sync failed: {}", format_errors(&page.errors)).into());
        }

        let now = db::now_millis();
        db::catalog::upsert_page(pool, merchant_id, &page.records, now).await?;
        total += page.records.len() as u32;

        match page.cursor {
            Some(c) => cursor = Some(c),
            None => break,
        }
    }

    tracing::info!(merchant_id = %merchant_id, count = total, "Catalog synced");
    Ok(total)
}
