//! Initial sync orchestrator
//!
//! Runs the entity modules in dependency order after a merchant first
//! connects. Locations come first because every later stage is scoped by
//! the discovered location set; catalog and customers are independent but
//! run before orders for referential completeness. Per-location order and
//! appointment syncs fan out concurrently within their stage; stages never
//! overlap. Any stage failure aborts the rest — a retry re-runs everything,
//! there is no checkpointing of partial progress.

pub mod appointments;
pub mod catalog;
pub mod customers;
pub mod events;
pub mod locations;
pub mod orders;

use sqlx::PgPool;

use crate::db;
use crate::provider::ProviderClient;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Historical depth of the initial pull
pub const LOOKBACK_DAYS: i64 = 365;

/// Per-stage record counts for logging
#[derive(Debug, Default)]
pub struct SyncReport {
    pub locations: u32,
    pub catalog_objects: u32,
    pub customers: u32,
    pub orders: u32,
    pub appointments: u32,
}

/// Run the full initial sync pipeline, fail-fast
pub async fn run_initial_sync(
    pool: &PgPool,
    client: &ProviderClient,
    merchant_id: &str,
) -> Result<SyncReport, BoxError> {
    let mut report = SyncReport::default();

    let location_ids = locations::sync_all(pool, client, merchant_id).await?;
    report.locations = location_ids.len() as u32;

    report.catalog_objects = catalog::sync_all(pool, client, merchant_id).await?;
    report.customers = customers::sync_all(pool, client, merchant_id).await?;

    let begin = db::now_millis() - LOOKBACK_DAYS * 24 * 60 * 60 * 1000;

    // Per-location fan-out: concurrent within the stage, rows partitioned
    // by location id so no mutual locking is needed.
    let order_counts = futures::future::try_join_all(
        location_ids
            .iter()
            .map(|loc| orders::sync_location(pool, client, merchant_id, loc, begin)),
    )
    .await?;
    report.orders = order_counts.iter().sum();

    let appointment_counts = futures::future::try_join_all(
        location_ids
            .iter()
            .map(|loc| appointments::sync_location(pool, client, merchant_id, loc, begin)),
    )
    .await?;
    report.appointments = appointment_counts.iter().sum();

    Ok(report)
}

/// Run the pipeline and record the outcome on the connection row. This is
/// the background entry point — errors land in `sync_status`/`last_sync_error`,
/// never on the caller.
pub async fn run_and_record(pool: PgPool, client: ProviderClient, merchant_id: String) {
    match run_initial_sync(&pool, &client, &merchant_id).await {
        Ok(report) => {
            tracing::info!(
                merchant_id = %merchant_id,
                locations = report.locations,
                catalog_objects = report.catalog_objects,
                customers = report.customers,
                orders = report.orders,
                appointments = report.appointments,
                "Initial sync completed"
            );
            if let Err(e) =
                db::connections::mark_sync_success(&pool, &merchant_id, db::now_millis()).await
            {
                tracing::error!(merchant_id = %merchant_id, %e, "Failed to record sync success");
            }
        }
        Err(e) => {
            tracing::error!(merchant_id = %merchant_id, error = %e, "Initial sync failed");
            if let Err(e) =
                db::connections::mark_sync_error(&pool, &merchant_id, &e.to_string()).await
            {
                tracing::error!(merchant_id = %merchant_id, %e, "Failed to record sync error");
            }
        }
    }
}
