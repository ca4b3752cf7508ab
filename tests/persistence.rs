//! Database-side invariants: upsert idempotence, line-item replacement,
//! page transaction atomicity, and initial-sync status recording.
//!
//! Each test runs against a fresh database with the crate migrations
//! applied by `#[sqlx::test]`.

use pearl_sync::crypto::MasterKey;
use pearl_sync::db;
use pearl_sync::provider::ProviderClient;
use pearl_sync::sync;
use serde_json::{Value, json};
use sqlx::PgPool;

fn order_json(id: &str, state: &str, total: i64, line_items: Value) -> Value {
    json!({
        "id": id,
        "location_id": "L1",
        "state": state,
        "total_money": { "amount": total, "currency": "EUR" },
        "line_items": line_items,
    })
}

fn line_item(uid: &str, quantity: &str) -> Value {
    json!({
        "uid": uid,
        "name": "Espresso",
        "quantity": quantity,
        "total_money": { "amount": 250, "currency": "EUR" },
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn order_upsert_is_idempotent(pool: PgPool) {
    let open = order_json("ord_1", "OPEN", 500, json!([line_item("li_1", "1")]));
    db::orders::upsert_one(&pool, "m1", &open, 1_000).await.unwrap();

    let completed = order_json("ord_1", "COMPLETED", 750, json!([line_item("li_1", "1")]));
    db::orders::upsert_one(&pool, "m1", &completed, 2_000)
        .await
        .unwrap();

    let rows: Vec<(String, i64, i64)> = sqlx::query_as(
        "SELECT state, total_amount, synced_at FROM orders
         WHERE merchant_id = 'm1' AND order_id = 'ord_1'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], ("COMPLETED".to_string(), 750, 2_000));
}

#[sqlx::test(migrations = "./migrations")]
async fn line_items_are_replaced_wholesale(pool: PgPool) {
    let first = order_json(
        "ord_1",
        "OPEN",
        500,
        json!([line_item("li_1", "1"), line_item("li_2", "2")]),
    );
    db::orders::upsert_one(&pool, "m1", &first, 1_000).await.unwrap();

    // Re-sync drops li_2 entirely; no stale row may survive
    let second = order_json("ord_1", "COMPLETED", 250, json!([line_item("li_1", "1")]));
    db::orders::upsert_one(&pool, "m1", &second, 2_000)
        .await
        .unwrap();

    let uids: Vec<(String,)> = sqlx::query_as(
        "SELECT uid FROM order_line_items
         WHERE merchant_id = 'm1' AND order_id = 'ord_1'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(uids.len(), 1);
    assert_eq!(uids[0].0, "li_1");
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_page_rolls_back_without_touching_prior_pages(pool: PgPool) {
    let page_one = vec![order_json("ord_a", "COMPLETED", 100, json!([]))];
    db::orders::upsert_page(&pool, "m1", &page_one, 1_000)
        .await
        .unwrap();

    // Second record has no id and fails to parse after ord_b was written
    // inside the same transaction.
    let page_two = vec![
        order_json("ord_b", "COMPLETED", 200, json!([])),
        json!({ "state": "COMPLETED" }),
    ];
    let result = db::orders::upsert_page(&pool, "m1", &page_two, 2_000).await;
    assert!(result.is_err());

    let ids: Vec<(String,)> =
        sqlx::query_as("SELECT order_id FROM orders WHERE merchant_id = 'm1' ORDER BY order_id")
            .fetch_all(&pool)
            .await
            .unwrap();

    // Failed page absent entirely, earlier page intact
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].0, "ord_a");
}

#[sqlx::test(migrations = "./migrations")]
async fn connection_save_replaces_tokens_but_keeps_refresh_when_absent(pool: PgPool) {
    let key = MasterKey::from_secret("test-secret");

    db::connections::save(
        &pool,
        &key,
        "m1",
        "PM1",
        &db::connections::TokenSet {
            access_token: "access-1",
            refresh_token: Some("refresh-1"),
            expires_at: Some(10_000),
            token_type: Some("bearer"),
            scopes: Some("ORDERS_READ".into()),
        },
        1_000,
    )
    .await
    .unwrap();

    // Refresh responses may omit the refresh token; the stored one survives
    db::connections::save(
        &pool,
        &key,
        "m1",
        "PM1",
        &db::connections::TokenSet {
            access_token: "access-2",
            refresh_token: None,
            expires_at: Some(20_000),
            token_type: Some("bearer"),
            scopes: None,
        },
        2_000,
    )
    .await
    .unwrap();

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM connections")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let creds = db::connections::get(&pool, &key, "m1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(creds.access_token, "access-2");
    assert_eq!(creds.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(creds.expires_at, Some(20_000));
}

/// Minimal provider stub: a merchant with no locations, no catalog, no
/// customers. The per-location stages then have nothing to fan out over.
async fn spawn_stub_provider() -> String {
    use axum::routing::{get, post};
    use axum::{Json, Router};

    let app = Router::new()
        .route(
            "/v2/locations",
            get(|| async { Json(json!({ "locations": [] })) }),
        )
        .route(
            "/v2/catalog/list",
            get(|| async { Json(json!({ "objects": [] })) }),
        )
        .route(
            "/v2/customers/search",
            post(|| async { Json(json!({ "customers": [] })) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[sqlx::test(migrations = "./migrations")]
async fn initial_sync_with_no_locations_completes_with_success(pool: PgPool) {
    let key = MasterKey::from_secret("test-secret");
    db::connections::save(
        &pool,
        &key,
        "m1",
        "PM1",
        &db::connections::TokenSet {
            access_token: "access-1",
            refresh_token: None,
            expires_at: None,
            token_type: Some("bearer"),
            scopes: None,
        },
        1_000,
    )
    .await
    .unwrap();
    db::connections::mark_sync_pending(&pool, "m1").await.unwrap();

    let base_url = spawn_stub_provider().await;
    let client = ProviderClient::new(&base_url, "access-1").unwrap();
    sync::run_and_record(pool.clone(), client, "m1".to_string()).await;

    let row = db::connections::find(&pool, "m1").await.unwrap().unwrap();
    assert_eq!(row.sync_status, "success");
    assert!(row.sync_completed_at.is_some());
    assert_eq!(row.last_sync_error, None);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM locations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
