//! Entitlement gate.
//!
//! Answers "may this account perform one more scan right now?" by querying
//! the external entitlement service for a feature's enabled flag, usage
//! counter, and allocation ceiling. Pure query; the core enforces but
//! never computes entitlement, and nothing here is cached.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};
use crate::model::AccountId;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Snapshot of one account's standing for a metered feature.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuotaStatus {
    /// Whether one more use of the feature is currently allowed.
    pub enabled: bool,
    /// Uses consumed in the current period.
    pub used: i64,
    /// Allocation ceiling for the current period.
    pub allocation: i64,
}

#[async_trait]
pub trait EntitlementGate: Send + Sync {
    async fn check_quota(&self, account: &AccountId, feature: &str) -> CoreResult<QuotaStatus>;
}

/// Configuration for the external entitlement service.
#[derive(Debug, Clone)]
pub struct EntitlementConfig {
    pub base_url: String,
    /// API key for the service. Absence is a startup-time
    /// misconfiguration, never a per-request error.
    pub api_key: String,
}

/// HTTP client for the entitlement service.
///
/// Entitlement is tracked per account (the service's "company" resource),
/// not per user session.
#[derive(Debug, Clone)]
pub struct EntitlementClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl EntitlementClient {
    pub fn new(config: EntitlementConfig) -> CoreResult<Self> {
        if config.api_key.is_empty() {
            return Err(CoreError::Validation(
                "entitlement API key is not configured".to_string(),
            ));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

#[async_trait]
impl EntitlementGate for EntitlementClient {
    async fn check_quota(&self, account: &AccountId, feature: &str) -> CoreResult<QuotaStatus> {
        let response = self
            .http
            .get(format!("{}/features/{}/check", self.base_url, feature))
            .query(&[("company", account.as_str())])
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| CoreError::transient("check_quota", e))?;

        if !response.status().is_success() {
            return Err(CoreError::Transient {
                operation: "check_quota",
                message: format!("entitlement service returned {}", response.status()),
            });
        }

        let status: QuotaStatus = response
            .json()
            .await
            .map_err(|e| CoreError::transient("check_quota", e))?;

        tracing::debug!(
            account = %account,
            feature = feature,
            enabled = status.enabled,
            used = status.used,
            allocation = status.allocation,
            "Quota checked"
        );
        Ok(status)
    }
}
