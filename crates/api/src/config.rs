//! Startup configuration.
//!
//! Everything the process needs is read once at startup; a missing
//! required variable fails the boot instead of producing confusing
//! per-request errors later.

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// HS256 secret shared with the identity provider.
    pub jwt_secret: String,
    /// Static bearer token authenticating the extraction pipeline on the
    /// internal routes.
    pub internal_api_token: String,
    pub blob_store_url: String,
    pub entitlement_base_url: String,
    pub entitlement_api_key: String,
    /// Metered feature key gating uploads.
    pub scan_feature_key: String,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            internal_api_token: required("INTERNAL_API_TOKEN")?,
            blob_store_url: required("BLOB_STORE_URL")?,
            entitlement_base_url: required("ENTITLEMENT_BASE_URL")?,
            entitlement_api_key: required("ENTITLEMENT_API_KEY")?,
            scan_feature_key: std::env::var("SCAN_FEATURE_KEY")
                .unwrap_or_else(|_| "scans".to_string()),
        })
    }
}
