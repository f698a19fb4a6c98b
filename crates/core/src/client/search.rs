//! Paginated series search.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::metrics;
use crate::mirror::MirrorRecord;

use super::graphql::{self, SearchItem, SearchPage, SEARCH_FIELD};
use super::{resolve_url, ClientError, FallbackExecutor, RequestError, SearchHit, Transport};

/// Searches the active mirror, one fallback-wrapped request per page.
#[derive(Clone)]
pub struct SearchClient {
    executor: FallbackExecutor,
    transport: Arc<dyn Transport>,
    api_path: String,
    timeout: Duration,
    default_max_pages: u32,
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("api_path", &self.api_path)
            .field("timeout", &self.timeout)
            .field("default_max_pages", &self.default_max_pages)
            .finish_non_exhaustive()
    }
}

impl SearchClient {
    pub fn new(
        executor: FallbackExecutor,
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            executor,
            transport,
            api_path: config.api_path.clone(),
            timeout: config.search_timeout(),
            default_max_pages: config.max_search_pages,
        }
    }

    pub fn executor(&self) -> &FallbackExecutor {
        &self.executor
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Search for series matching `query`.
    ///
    /// Fetches pages `1..=max_pages` (the configured default when `None`),
    /// stopping early at the first empty page. Hits are deduplicated by
    /// their absolute URL, first occurrence wins. A page that fails on
    /// every mirror aborts the whole search.
    pub async fn search(
        &self,
        query: &str,
        max_pages: Option<u32>,
    ) -> Result<Vec<SearchHit>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let max_pages = max_pages.unwrap_or(self.default_max_pages).max(1);
        let mut hits: Vec<SearchHit> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for page in 1..=max_pages {
            if self.executor.is_cancelled() {
                return Err(RequestError::Cancelled.into());
            }

            let (items, mirror) = self.fetch_page(query, page).await?;
            if items.is_empty() {
                debug!(query = query, page = page, "Empty search page, stopping");
                break;
            }

            for item in items {
                if let Some(hit) = normalize_item(item, &mirror) {
                    if seen.insert(hit.url.clone()) {
                        hits.push(hit);
                    }
                }
            }
        }

        metrics::SEARCH_RESULTS
            .with_label_values(&[])
            .observe(hits.len() as f64);
        info!(query = query, results = hits.len(), "Search complete");

        Ok(hits)
    }

    async fn fetch_page(
        &self,
        query: &str,
        page: u32,
    ) -> Result<(Vec<SearchItem>, MirrorRecord), RequestError> {
        let request = graphql::search_request(query, page);
        let body = &request;
        let transport = self.transport.as_ref();
        let api_path = self.api_path.as_str();
        let timeout = self.timeout;

        let (page, mirror) = self
            .executor
            .execute("search", move |mirror| {
                async move {
                    graphql::query::<SearchPage>(
                        transport,
                        &mirror,
                        api_path,
                        body,
                        SEARCH_FIELD,
                        timeout,
                    )
                    .await
                }
            })
            .await?;

        Ok((page.items.unwrap_or_default(), mirror))
    }
}

fn normalize_item(item: SearchItem, mirror: &MirrorRecord) -> Option<SearchHit> {
    let data = item.data?;
    let url_path = data.url_path.filter(|p| !p.is_empty())?;
    let url = resolve_url(mirror.base_url(), &url_path)?;

    Some(SearchHit {
        title: data.name.unwrap_or_else(|| "Unknown".to_string()),
        url,
        subtitle: data.slug.unwrap_or_default(),
    })
}
