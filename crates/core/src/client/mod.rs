//! Mirror-aware API clients.
//!
//! Every request goes through a [`FallbackExecutor`], which tries the active
//! mirror first and cycles through the remaining ones on failure. The
//! clients build the GraphQL payloads, hand them to a [`Transport`] and
//! normalize the responses into [`SearchHit`], [`SeriesInfo`] and
//! [`ParsedChapter`](crate::extract::ParsedChapter) records.

mod chapter;
mod facade;
mod fallback;
pub(crate) mod graphql;
mod rate_limiter;
mod search;
mod series;
mod transport;
mod types;

pub use chapter::ChapterClient;
pub use facade::BatoClient;
pub use fallback::FallbackExecutor;
pub use rate_limiter::RateLimiter;
pub use search::SearchClient;
pub use series::SeriesClient;
pub use transport::{ReqwestTransport, Transport};
pub use types::*;

use thiserror::Error;
use url::Url;

/// Failure of a single request against one mirror, or of a whole
/// fallback-wrapped operation once every mirror has been tried.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("All mirrors failed for {0}")]
    AllMirrorsFailed(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Errors returned by the public client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Chapter page could not be parsed: {0}")]
    NotParseable(String),

    #[error("Failed to create HTTP client: {0}")]
    Setup(#[from] reqwest::Error),
}

/// Resolve `path` against a mirror origin.
pub(crate) fn resolve_url(base_url: &str, path: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(path).ok().map(String::from)
}
