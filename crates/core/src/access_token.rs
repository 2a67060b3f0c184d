//! Temporary access token issuance.
//!
//! The embedded entitlement UI authenticates with a short-lived token
//! scoped to one account, so the long-lived service API key never reaches
//! a client. Tokens are re-issued on every request and must not be cached.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::entitlement::EntitlementClient;
use crate::error::{CoreError, CoreResult};
use crate::model::AccountId;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Entitlement is tracked against the service's "company" resource, keyed
/// by account id.
const RESOURCE_TYPE: &str = "company";

#[derive(Deserialize)]
struct IssuedToken {
    token: String,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    data: Option<IssuedToken>,
}

/// Issues temporary entitlement-UI tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    client: Arc<EntitlementClient>,
}

impl TokenIssuer {
    pub fn new(client: Arc<EntitlementClient>) -> Self {
        Self { client }
    }

    /// Issue a token scoped to `account`.
    ///
    /// `None` account means there is no authenticated caller; that yields
    /// `Ok(None)` ("cannot render the embedded UI"), never an error. A
    /// failing remote call is a hard error since no usable UI can render
    /// without the token.
    pub async fn issue_access_token(
        &self,
        account: Option<&AccountId>,
    ) -> CoreResult<Option<String>> {
        let Some(account) = account else {
            tracing::debug!("No authenticated account, skipping token issuance");
            return Ok(None);
        };

        let response = self
            .client
            .http()
            .post(format!("{}/access-tokens", self.client.base_url()))
            .bearer_auth(self.client.api_key())
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({
                "resourceType": RESOURCE_TYPE,
                "lookup": { "id": account.as_str() },
            }))
            .send()
            .await
            .map_err(|e| CoreError::transient("issue_access_token", e))?;

        if !response.status().is_success() {
            return Err(CoreError::Transient {
                operation: "issue_access_token",
                message: format!("token endpoint returned {}", response.status()),
            });
        }

        let body: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| CoreError::transient("issue_access_token", e))?;

        let token = body.data.map(|d| d.token).ok_or(CoreError::Transient {
            operation: "issue_access_token",
            message: "no token in response".to_string(),
        })?;

        tracing::debug!(account = %account, "Issued temporary access token");
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::EntitlementConfig;

    fn issuer_for(server: &mockito::Server) -> TokenIssuer {
        let client = EntitlementClient::new(EntitlementConfig {
            base_url: server.url(),
            api_key: "sch_test_key".to_string(),
        })
        .unwrap();
        TokenIssuer::new(Arc::new(client))
    }

    #[tokio::test]
    async fn unauthenticated_caller_gets_none_without_any_call() {
        // Unroutable base URL proves no request is attempted
        let client = EntitlementClient::new(EntitlementConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "sch_test_key".to_string(),
        })
        .unwrap();
        let issuer = TokenIssuer::new(Arc::new(client));

        let token = issuer.issue_access_token(None).await.unwrap();
        assert_eq!(token, None);
    }

    #[tokio::test]
    async fn issues_token_scoped_to_account() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/access-tokens")
            .match_header("authorization", "Bearer sch_test_key")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "resourceType": "company",
                "lookup": { "id": "acct_42" },
            })))
            .with_status(200)
            .with_body(r#"{"data": {"token": "tat_abc"}}"#)
            .create_async()
            .await;

        let issuer = issuer_for(&server);
        let token = issuer
            .issue_access_token(Some(&AccountId::new("acct_42")))
            .await
            .unwrap();

        assert_eq!(token.as_deref(), Some("tat_abc"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn remote_failure_is_a_hard_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/access-tokens")
            .with_status(500)
            .create_async()
            .await;

        let issuer = issuer_for(&server);
        let err = issuer
            .issue_access_token(Some(&AccountId::new("acct_42")))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Transient { .. }));
    }

    #[tokio::test]
    async fn empty_payload_is_a_hard_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/access-tokens")
            .with_status(200)
            .with_body(r#"{"data": null}"#)
            .create_async()
            .await;

        let issuer = issuer_for(&server);
        let err = issuer
            .issue_access_token(Some(&AccountId::new("acct_42")))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Transient { .. }));
    }
}
