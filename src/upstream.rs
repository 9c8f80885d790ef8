//! Outbound HTTP client for one upstream provider.

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::providers::Provider;

use serde::Serialize;
use std::time::Duration;

/// Bearer-authenticated JSON POST client bound to one provider endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    provider: Provider,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(provider: Provider, config: &RelayConfig, http: reqwest::Client) -> Self {
        Self {
            provider,
            url: config.effective_url(provider).to_string(),
            api_key: config.api_key(provider).map(str::to_string),
            timeout: Duration::from_millis(config.request_timeout_ms),
            http,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `payload` upstream.
    ///
    /// The timeout covers connecting and receiving response headers; when it fires the
    /// in-flight request is dropped. A 2xx response is returned with its body unread so
    /// the caller can choose to stream or buffer it.
    ///
    /// # Errors
    /// `Config` if no API key is configured (nothing is sent), `Timeout` on expiry,
    /// `Upstream` with the full error body on a non-2xx status, `Http` on transport failure.
    pub async fn call<T: Serialize + ?Sized>(&self, payload: &T) -> Result<reqwest::Response> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            RelayError::config(format!("{} API key not configured", self.provider))
        })?;

        let send = self
            .http
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(payload)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| RelayError::Timeout {
                provider: self.provider,
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream {
                provider: self.provider,
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let mut config = RelayConfig::default();
        // Unroutable; a network attempt would surface as Http or Timeout instead.
        config.coze.url = Some("http://192.0.2.1:9/v1/chat".to_string());
        let client = UpstreamClient::new(Provider::Coze, &config, reqwest::Client::new());

        let err = client.call(&json!({"bot_id": "b1"})).await.unwrap_err();
        assert!(matches!(err, RelayError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: Coze API key not configured");
    }

    #[test]
    fn test_uses_config_endpoint_and_timeout() {
        let mut config = RelayConfig::default();
        config.request_timeout_ms = 1234;
        config.deepseek.api_key = Some("dk".to_string());
        let client = UpstreamClient::new(Provider::DeepSeek, &config, reqwest::Client::new());

        assert_eq!(client.provider(), Provider::DeepSeek);
        assert_eq!(client.url(), Provider::DeepSeek.default_url());
        assert_eq!(client.timeout, Duration::from_millis(1234));
    }
}
