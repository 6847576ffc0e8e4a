//! Shared utilities for all providers
//!
//! HTTP client construction and the JSON POST round-trip every adapter uses,
//! so that timeouts and status mapping behave the same for every vendor.

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::ProviderType;
use super::unified_provider::ProviderError;

/// Connect timeout applied to every vendor client
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the HTTP client for a provider
pub fn build_http_client(provider: &'static str) -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| {
            ProviderError::configuration(provider, format!("Failed to create HTTP client: {}", e))
        })
}

/// Resolve the base URL, trimming any trailing slash
pub fn base_url(provider_type: ProviderType, configured: Option<&str>) -> String {
    configured
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(provider_type.default_base_url())
        .trim_end_matches('/')
        .to_string()
}

/// Map a transport-level failure
pub fn map_reqwest_error(provider: &'static str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::timeout(provider, error.to_string())
    } else {
        ProviderError::network(provider, error.to_string())
    }
}

/// POST `body` as JSON and decode a successful response as `R`.
///
/// The whole exchange, body read included, runs under `timeout`; expiry is
/// reported as a transient [`ProviderError::Timeout`].
pub async fn post_json<B, R>(
    provider: &'static str,
    request: RequestBuilder,
    body: &B,
    timeout: Duration,
) -> Result<R, ProviderError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let exchange = async {
        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(provider, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(provider, e))?;
        Ok::<_, ProviderError>((status, text))
    };

    let (status, text) = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| {
            ProviderError::timeout(provider, format!("No response within {:?}", timeout))
        })??;

    if !status.is_success() {
        debug!(provider, status = status.as_u16(), "Vendor returned an error status");
        return Err(ProviderError::from_status(provider, status.as_u16(), &text));
    }

    serde_json::from_str(&text).map_err(|e| {
        ProviderError::response_parsing(provider, format!("Unexpected response body: {}", e))
    })
}
