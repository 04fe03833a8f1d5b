//! Gateway API client implementation
//!
//! `GatewayApi` is the seam the reconcile engine works against; the
//! production implementation is `HttpGatewayClient`, an HTTPS client for
//! the Zero Trust gateway endpoint.

use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::{ApiError, ApiResult};
use super::types::{
    constants, ApiEnvelope, CreateListRequest, CreateRuleRequest, GatewayList, GatewayRule,
};
use crate::config::ApiConfig;

/// HTTP request timeout (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote CRUD operations the reconcile engine depends on
///
/// All operations are remote calls that may fail for any reason
/// (network, auth, validation); a `success: false` envelope surfaces as
/// `ApiError::Rejected` with the server detail, never a silent default.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    async fn list_rules(&self) -> ApiResult<Vec<GatewayRule>>;
    async fn create_rule(&self, rule: CreateRuleRequest) -> ApiResult<GatewayRule>;
    async fn delete_rule(&self, id: &str) -> ApiResult<()>;
    async fn list_lists(&self) -> ApiResult<Vec<GatewayList>>;
    async fn create_list(&self, list: CreateListRequest) -> ApiResult<GatewayList>;
    async fn delete_list(&self, id: &str) -> ApiResult<()>;
}

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Build an HTTP/1.1 client with native TLS roots
///
/// Also used by the source loader for plain-text fetches.
pub(crate) fn build_https_client() -> ApiResult<HttpsClient> {
    // Install rustls crypto provider if not already installed
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|e| ApiError::Tls(e.to_string()))?
        .https_or_http()
        .enable_http1()
        .build();

    Ok(Client::builder(TokioExecutor::new()).build(https))
}

/// HTTPS client for the gateway account API
pub struct HttpGatewayClient {
    client: HttpsClient,
    base_url: String,
    account_id: String,
    token: String,
}

impl HttpGatewayClient {
    /// Create a client from the API configuration
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Tls` if the TLS backend cannot be initialized.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        Ok(Self {
            client: build_https_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_id: config.account_id.clone(),
            token: config.token.clone(),
        })
    }

    fn gateway_url(&self, path: &str) -> String {
        format!(
            "{}/accounts/{}/gateway/{}",
            self.base_url, self.account_id, path
        )
    }

    /// Issue one API call and decode the response envelope
    ///
    /// Non-2xx statuses and `success: false` envelopes both become
    /// `ApiError::Rejected` carrying the server detail verbatim; 429
    /// becomes `ApiError::RateLimited` with the advertised delay.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        operation: &'static str,
    ) -> ApiResult<ApiEnvelope<T>> {
        let uri = self.gateway_url(path);

        let request = Request::builder()
            .method(method)
            .uri(&uri)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .header("User-Agent", constants::USER_AGENT)
            .body(Full::new(Bytes::from(body.unwrap_or_default())))?;

        debug!("Sending {} request to {}", operation, uri);

        let response = tokio::time::timeout(HTTP_TIMEOUT, self.client.request(request))
            .await
            .map_err(|_| ApiError::Timeout(HTTP_TIMEOUT.as_secs()))?
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let (parts, body) = response.into_parts();
        let body_bytes = body.collect().await?.to_bytes();

        if !parts.status.is_success() {
            if parts.status.as_u16() == 429 {
                let retry_after = parts
                    .headers
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(ApiError::RateLimited(retry_after));
            }

            let body_str = String::from_utf8_lossy(&body_bytes);
            return Err(ApiError::Rejected {
                operation,
                detail: format!("HTTP {}: {}", parts.status, body_str),
            });
        }

        let envelope: ApiEnvelope<T> = serde_json::from_slice(&body_bytes)
            .map_err(|e| ApiError::InvalidResponse(format!("{operation}: {e}")))?;

        if !envelope.success {
            return Err(ApiError::Rejected {
                operation,
                detail: envelope.error_detail(),
            });
        }

        Ok(envelope)
    }
}

#[async_trait]
impl GatewayApi for HttpGatewayClient {
    async fn list_rules(&self) -> ApiResult<Vec<GatewayRule>> {
        let envelope = self
            .call::<Vec<GatewayRule>>(Method::GET, "rules", None, "list rules")
            .await?;
        Ok(envelope.result.unwrap_or_default())
    }

    async fn create_rule(&self, rule: CreateRuleRequest) -> ApiResult<GatewayRule> {
        let body = serde_json::to_string(&rule)?;
        let envelope = self
            .call::<GatewayRule>(Method::POST, "rules", Some(body), "create rule")
            .await?;
        envelope
            .result
            .ok_or_else(|| ApiError::InvalidResponse("create rule: missing result".to_string()))
    }

    async fn delete_rule(&self, id: &str) -> ApiResult<()> {
        self.call::<serde_json::Value>(
            Method::DELETE,
            &format!("rules/{id}"),
            None,
            "delete rule",
        )
        .await?;
        Ok(())
    }

    async fn list_lists(&self) -> ApiResult<Vec<GatewayList>> {
        let envelope = self
            .call::<Vec<GatewayList>>(Method::GET, "lists", None, "list lists")
            .await?;
        Ok(envelope.result.unwrap_or_default())
    }

    async fn create_list(&self, list: CreateListRequest) -> ApiResult<GatewayList> {
        let body = serde_json::to_string(&list)?;
        let envelope = self
            .call::<GatewayList>(Method::POST, "lists", Some(body), "create list")
            .await?;
        envelope
            .result
            .ok_or_else(|| ApiError::InvalidResponse("create list: missing result".to_string()))
    }

    async fn delete_list(&self, id: &str) -> ApiResult<()> {
        self.call::<serde_json::Value>(
            Method::DELETE,
            &format!("lists/{id}"),
            None,
            "delete list",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpGatewayClient {
        HttpGatewayClient::new(&ApiConfig {
            token: "token".to_string(),
            account_id: "acc-1".to_string(),
            base_url: "https://api.example.com/client/v4/".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_gateway_url_building() {
        let client = client();
        assert_eq!(
            client.gateway_url("rules"),
            "https://api.example.com/client/v4/accounts/acc-1/gateway/rules"
        );
        assert_eq!(
            client.gateway_url("lists/abc"),
            "https://api.example.com/client/v4/accounts/acc-1/gateway/lists/abc"
        );
    }
}
