//! Mock transport for testing.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

use crate::client::{RequestError, Transport};

/// HTTP method of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

/// A recorded request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: RequestMethod,
    /// Full request URL.
    pub url: String,
    /// JSON body for POST requests, `Value::Null` for GET.
    pub body: Value,
    pub timeout: Duration,
    /// When the request was made.
    pub timestamp: Instant,
}

impl RecordedRequest {
    /// Origin (`scheme://host[:port]`) the request was sent to.
    pub fn origin(&self) -> String {
        origin_of(&self.url)
    }
}

/// Produces a JSON response for a POST request, or `None` to answer 404.
type RequestHandler = Box<dyn Fn(&RecordedRequest) -> Option<Value> + Send + Sync>;

/// Mock implementation of the Transport trait.
///
/// Provides controllable behavior for testing:
/// - Answer POST requests through a pluggable handler
/// - Serve fixed pages for GET requests
/// - Fail every request to selected origins
/// - Delay responses to simulate a slow upstream
/// - Track requests for assertions
///
/// # Example
///
/// ```rust,ignore
/// use mangaroute_core::testing::{fixtures, MockTransport};
///
/// let transport = MockTransport::new();
/// transport.fail_origin("https://bato.to").await;
/// transport
///     .set_handler(|_| Some(fixtures::search_response(&[("One", "/title/1-one")])))
///     .await;
///
/// // ... run a search ...
///
/// let requests = transport.recorded_requests().await;
/// assert_eq!(requests[0].origin(), "https://bato.to");
/// ```
pub struct MockTransport {
    /// Recorded requests.
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    /// Origins that fail every request, with the error they return.
    failing_origins: Arc<RwLock<HashMap<String, RequestError>>>,
    /// Handler for POST requests.
    handler: Arc<RwLock<Option<RequestHandler>>>,
    /// Pages served to GET requests, keyed by full URL.
    pages: Arc<RwLock<HashMap<String, String>>>,
    /// Time each request takes before answering.
    delay: Arc<RwLock<Duration>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &"<requests>")
            .field("failing_origins", &"<failing_origins>")
            .field("handler", &"<handler>")
            .field("pages", &"<pages>")
            .field("delay", &"<delay>")
            .finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a transport that answers every POST with an empty `data`
    /// object and every GET with 404.
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            failing_origins: Arc::new(RwLock::new(HashMap::new())),
            handler: Arc::new(RwLock::new(None)),
            pages: Arc::new(RwLock::new(HashMap::new())),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    // =========================================================================
    // Configuration methods
    // =========================================================================

    /// Answer POST requests with `handler`.
    pub async fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&RecordedRequest) -> Option<Value> + Send + Sync + 'static,
    {
        *self.handler.write().await = Some(Box::new(handler));
    }

    /// Serve `content` for GET requests to `url`.
    pub async fn set_page(&self, url: &str, content: &str) {
        self.pages
            .write()
            .await
            .insert(url.to_string(), content.to_string());
    }

    /// Make every request wait `delay` before it is answered.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Fail every request to `origin` with a connection error.
    pub async fn fail_origin(&self, origin: &str) {
        self.fail_origin_with(
            origin,
            RequestError::ConnectionFailed(format!("{} unreachable", origin)),
        )
        .await;
    }

    /// Fail every request to `origin` with `error`.
    pub async fn fail_origin_with(&self, origin: &str, error: RequestError) {
        self.failing_origins
            .write()
            .await
            .insert(normalize_origin(origin), error);
    }

    /// Let requests to `origin` through again.
    pub async fn recover_origin(&self, origin: &str) {
        self.failing_origins
            .write()
            .await
            .remove(&normalize_origin(origin));
    }

    // =========================================================================
    // Query methods (for assertions)
    // =========================================================================

    /// Get all recorded requests.
    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Origins of all recorded requests, in order.
    pub async fn requested_origins(&self) -> Vec<String> {
        self.requests
            .read()
            .await
            .iter()
            .map(RecordedRequest::origin)
            .collect()
    }

    /// Clear recorded requests.
    pub async fn clear_requests(&self) {
        self.requests.write().await.clear();
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    async fn record(&self, request: RecordedRequest) -> Result<RecordedRequest, RequestError> {
        self.requests.write().await.push(request.clone());

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failing_origins.read().await.get(&request.origin()) {
            return Err(error.clone());
        }
        Ok(request)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, RequestError> {
        let request = self
            .record(RecordedRequest {
                method: RequestMethod::Post,
                url: url.to_string(),
                body: body.clone(),
                timeout,
                timestamp: Instant::now(),
            })
            .await?;

        match self.handler.read().await.as_ref() {
            Some(handler) => handler(&request).ok_or_else(|| RequestError::HttpStatus {
                status: 404,
                body: "no mock response".to_string(),
            }),
            None => Ok(json!({"data": {}})),
        }
    }

    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, RequestError> {
        self.record(RecordedRequest {
            method: RequestMethod::Get,
            url: url.to_string(),
            body: Value::Null,
            timeout,
            timestamp: Instant::now(),
        })
        .await?;

        self.pages
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| RequestError::HttpStatus {
                status: 404,
                body: "no mock page".to_string(),
            })
    }
}

fn origin_of(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_else(|_| url.to_string())
}

fn normalize_origin(origin: &str) -> String {
    origin_of(origin.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_origin_is_recorded_and_fails() {
        let transport = MockTransport::new();
        transport.fail_origin("https://a.test/").await;

        let err = transport
            .post_json("https://a.test/apo/", &json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::ConnectionFailed(_)));

        let ok = transport
            .post_json("https://b.test/apo/", &json!({}), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(ok, json!({"data": {}}));

        assert_eq!(
            transport.requested_origins().await,
            vec!["https://a.test", "https://b.test"]
        );
    }

    #[tokio::test]
    async fn test_recover_origin() {
        let transport = MockTransport::new();
        transport.fail_origin("https://a.test").await;
        transport.recover_origin("https://a.test").await;

        assert!(transport
            .post_json("https://a.test/apo/", &json!({}), Duration::from_secs(1))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_pages_and_missing_pages() {
        let transport = MockTransport::new();
        transport.set_page("https://a.test/chapter/1", "<html/>").await;

        assert_eq!(
            transport
                .get_text("https://a.test/chapter/1", Duration::from_secs(1))
                .await
                .unwrap(),
            "<html/>"
        );
        assert!(matches!(
            transport
                .get_text("https://a.test/chapter/2", Duration::from_secs(1))
                .await,
            Err(RequestError::HttpStatus { status: 404, .. })
        ));
    }
}
