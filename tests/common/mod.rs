//! Shared test fixtures
//!
//! The pool is lazy and never actually connects — these tests exercise the
//! request paths that terminate before any database round-trip.

use pearl_sync::config::Config;
use pearl_sync::state::AppState;
use sqlx::PgPool;

pub fn test_config(webhook_key: Option<&str>) -> Config {
    Config {
        database_url: "postgres://postgres@127.0.0.1:1/pearl_test".into(),
        http_port: 0,
        environment: "development".into(),
        app_base_url: "https://app.example.com".into(),
        frontend_url: "https://dash.example.com".into(),
        provider_base_url: "https://connect.example.com".into(),
        provider_app_id: "app-id".into(),
        provider_app_secret: "app-secret".into(),
        webhook_signature_key: webhook_key.map(String::from),
        token_encryption_secret: "test-secret".into(),
    }
}

pub fn test_state(webhook_key: Option<&str>) -> AppState {
    let config = test_config(webhook_key);
    let pool = PgPool::connect_lazy(&config.database_url).expect("lazy pool");
    AppState::build(config, pool)
}
