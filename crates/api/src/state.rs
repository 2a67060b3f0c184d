//! Application state.

use std::sync::Arc;

use recibo_core::{CoreConfig, CoreResult, EntitlementConfig, ReceiptCore};
use sqlx::PgPool;

use crate::auth::JwtManager;
use crate::config::Config;

/// Shared application state.
///
/// All external-service clients are constructed here, once, from validated
/// configuration and injected into the core; nothing is referenced lazily
/// or held in process globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub jwt_manager: JwtManager,
    pub core: Arc<ReceiptCore>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> CoreResult<Self> {
        let jwt_manager = JwtManager::new(&config.jwt_secret);

        let core = ReceiptCore::new(
            CoreConfig {
                blob_base_url: config.blob_store_url.clone(),
                entitlement: EntitlementConfig {
                    base_url: config.entitlement_base_url.clone(),
                    api_key: config.entitlement_api_key.clone(),
                },
                feature_key: config.scan_feature_key.clone(),
            },
            pool,
        )?;

        Ok(Self {
            config,
            jwt_manager,
            core: Arc::new(core),
        })
    }
}
