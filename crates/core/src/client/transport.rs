//! Network transport used by the mirror clients.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;

use super::RequestError;

/// Maximum number of body characters kept in an HTTP status error.
const ERROR_BODY_LIMIT: usize = 200;

/// Moves requests to a mirror and back.
///
/// Implementations report every failure (connect, timeout, non-2xx status,
/// unreadable body) as a [`RequestError`]; they never inspect the GraphQL
/// envelope.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON and parse the response body as JSON.
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, RequestError>;

    /// GET `url` and return the response body as text.
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, RequestError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the configured connect timeout and user agent.
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout())
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, RequestError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RequestError::HttpStatus {
            status: status.as_u16(),
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, RequestError> {
        debug!(url = url, "POST");

        let response = self
            .client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        Self::checked(response)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| RequestError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, RequestError> {
        debug!(url = url, "GET");

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        Self::checked(response)
            .await?
            .text()
            .await
            .map_err(|e| RequestError::InvalidResponse(format!("Failed to read response: {}", e)))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> RequestError {
    if e.is_timeout() {
        RequestError::Timeout
    } else if e.is_connect() {
        RequestError::ConnectionFailed(e.to_string())
    } else {
        RequestError::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_default_config() {
        let transport = ReqwestTransport::new(&ClientConfig::default());
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_failure() {
        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        // port 9 (discard) on localhost is closed on test machines
        let err = transport
            .get_text("http://127.0.0.1:9/", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RequestError::ConnectionFailed(_) | RequestError::Timeout | RequestError::Http(_)
        ));
    }
}
