//! pearl-sync service entry point
//!
//! Long-running service that:
//! - Handles the provider OAuth handshake per merchant
//! - Runs the initial historical sync after first connection
//! - Receives signed provider webhooks for incremental updates
//! - Maintains the merchant data mirror in PostgreSQL

use pearl_sync::api;
use pearl_sync::config::Config;
use pearl_sync::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pearl_sync=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting pearl-sync (env: {})", config.environment);

    let state = AppState::new(config.clone()).await?;

    // Periodic OAuth state sweep (every 5 minutes)
    let oauth_states = state.oauth_states.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            oauth_states.cleanup(chrono::Utc::now().timestamp_millis());
        }
    });

    let app = api::create_router(state);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("pearl-sync listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
