//! Service configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Sync service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Public base URL of this service (OAuth redirect + webhook
    /// notification URL construction)
    pub app_base_url: String,
    /// Frontend base URL for OAuth landing pages
    pub frontend_url: String,
    /// Provider API base URL
    pub provider_base_url: String,
    /// Provider application id
    pub provider_app_id: String,
    /// Provider application secret
    pub provider_app_secret: String,
    /// Webhook signing key; verification is bypassed (with a loud warning)
    /// when unset
    pub webhook_signature_key: Option<String>,
    /// Secret the token-encryption key is derived from
    pub token_encryption_secret: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in
    /// non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let webhook_signature_key = std::env::var("WEBHOOK_SIGNATURE_KEY")
            .ok()
            .filter(|s| !s.is_empty());
        if webhook_signature_key.is_none() && environment != "development" {
            return Err(format!(
                "WEBHOOK_SIGNATURE_KEY must be set in {environment} environment"
            )
            .into());
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: environment.clone(),
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            provider_base_url: std::env::var("PROVIDER_BASE_URL")
                .unwrap_or_else(|_| "https://connect.squareup.com".into()),
            provider_app_id: Self::require_secret("PROVIDER_APP_ID", &environment)?,
            provider_app_secret: Self::require_secret("PROVIDER_APP_SECRET", &environment)?,
            webhook_signature_key,
            token_encryption_secret: Self::require_secret("TOKEN_ENCRYPTION_SECRET", &environment)?,
        })
    }

    /// Webhook notification URL as registered with the provider — the exact
    /// string the provider signs over.
    pub fn notification_url(&self) -> String {
        format!("{}/webhooks", self.app_base_url.trim_end_matches('/'))
    }
}
