//! Series metadata and chapter listing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::mirror::MirrorRecord;

use super::graphql::{self, ChapterItem, ComicData, ComicNode, CHAPTER_LIST_FIELD, COMIC_FIELD};
use super::{
    resolve_url, AttributeValue, ChapterRef, ClientError, FallbackExecutor, RequestError,
    SeriesInfo, Transport,
};

static COMIC_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/title/(\d+)").unwrap());

/// Fetches series metadata and the chapter list from the active mirror.
#[derive(Clone)]
pub struct SeriesClient {
    executor: FallbackExecutor,
    transport: Arc<dyn Transport>,
    api_path: String,
    timeout: Duration,
}

impl std::fmt::Debug for SeriesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesClient")
            .field("api_path", &self.api_path)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SeriesClient {
    pub fn new(
        executor: FallbackExecutor,
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            executor,
            transport,
            api_path: config.api_path.clone(),
            timeout: config.series_info_timeout(),
        }
    }

    /// Resolve a series URL (any mirror, or a bare `/title/<id>-slug` path)
    /// into its metadata and chapters, oldest chapter first.
    pub async fn get_series_info(&self, series_url: &str) -> Result<SeriesInfo, ClientError> {
        let path = url_path(series_url);
        let comic_id = extract_comic_id(&path).ok_or_else(|| {
            ClientError::InvalidInput(format!("Cannot extract comic ID from URL: {}", series_url))
        })?;

        debug!(comic_id = %comic_id, "Fetching series info");
        let comic_id = comic_id.as_str();

        let ((comic, chapters), mirror) = self
            .executor
            .execute("series_info", move |mirror| self.fetch(mirror, comic_id))
            .await?;

        Ok(normalize(comic, chapters, &mirror, &path))
    }

    /// Metadata and chapter list from one mirror. Either call failing fails
    /// the attempt.
    async fn fetch(
        &self,
        mirror: MirrorRecord,
        comic_id: &str,
    ) -> Result<(ComicData, Vec<ChapterItem>), RequestError> {
        let node: ComicNode = graphql::query(
            self.transport.as_ref(),
            &mirror,
            &self.api_path,
            &graphql::comic_request(comic_id),
            COMIC_FIELD,
            self.timeout,
        )
        .await?;

        self.executor.rate_limiter().acquire().await;

        let chapters: Vec<ChapterItem> = graphql::query(
            self.transport.as_ref(),
            &mirror,
            &self.api_path,
            &graphql::chapter_list_request(comic_id),
            CHAPTER_LIST_FIELD,
            self.timeout,
        )
        .await?;

        Ok((node.data.unwrap_or_default(), chapters))
    }
}

/// Path component of a series URL. Inputs that do not parse as absolute
/// URLs are treated as paths with any query or fragment removed.
fn url_path(series_url: &str) -> String {
    let trimmed = series_url.trim();
    match Url::parse(trimmed) {
        Ok(url) => url.path().to_string(),
        Err(_) => trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

fn extract_comic_id(path: &str) -> Option<String> {
    COMIC_ID
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn normalize(
    comic: ComicData,
    chapters: Vec<ChapterItem>,
    mirror: &MirrorRecord,
    path: &str,
) -> SeriesInfo {
    let mut attributes = BTreeMap::new();
    if let Some(authors) = comic.authors.filter(|a| !a.is_empty()) {
        attributes.insert("Authors".to_string(), AttributeValue::List(authors));
    }
    if let Some(genres) = comic.genres.filter(|g| !g.is_empty()) {
        attributes.insert("Genres".to_string(), AttributeValue::List(genres));
    }

    let mut chapters: Vec<ChapterRef> = chapters
        .into_iter()
        .filter_map(|item| {
            let data = item.data?;
            let url_path = data.url_path.filter(|p| !p.is_empty())?;
            let url = resolve_url(mirror.base_url(), &url_path)?;
            let name = data.dname.unwrap_or_else(|| "Unknown".to_string());
            Some(ChapterRef {
                title: name.clone(),
                url,
                label: name,
            })
        })
        .collect();
    // upstream lists newest first
    chapters.reverse();

    SeriesInfo {
        title: comic.name.unwrap_or_else(|| "Unknown Title".to_string()),
        description: comic.summary.and_then(|s| s.code).unwrap_or_default(),
        attributes,
        chapters,
        canonical_url: resolve_url(mirror.base_url(), path)
            .unwrap_or_else(|| format!("{}{}", mirror.base_url(), path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RateLimiter;
    use crate::mirror::MirrorManager;
    use crate::testing::{fixtures, MockTransport};

    fn client(transport: Arc<MockTransport>) -> SeriesClient {
        let executor = FallbackExecutor::new(
            Arc::new(MirrorManager::in_memory()),
            Arc::new(RateLimiter::disabled()),
        );
        SeriesClient::new(executor, transport, &ClientConfig::default())
    }

    #[test]
    fn test_extract_comic_id() {
        assert_eq!(
            extract_comic_id("/title/91934-some-slug").as_deref(),
            Some("91934")
        );
        assert_eq!(extract_comic_id("/title/12/ch_1").as_deref(), Some("12"));
        assert_eq!(extract_comic_id("/series/91934"), None);
        assert_eq!(extract_comic_id("/title/abc"), None);
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("https://bato.si/title/1-x?a=b"), "/title/1-x");
        assert_eq!(url_path("/title/1-x#top"), "/title/1-x");
    }

    #[tokio::test]
    async fn test_invalid_url_makes_no_request() {
        let transport = Arc::new(MockTransport::new());
        let series = client(transport.clone());

        let err = series
            .get_series_info("https://bato.to/series/abc")
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidInput(msg) if msg.contains("Cannot extract comic ID")));
        assert!(transport.recorded_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_series_info_is_normalized() {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_handler(|request| {
                if request.body["variables"].get("comicId").is_some() {
                    Some(fixtures::chapter_list_response(&[
                        ("Chapter 3", "/title/91934-x/3"),
                        ("Chapter 2", "/title/91934-x/2"),
                        ("", ""),
                        ("Chapter 1", "/title/91934-x/1"),
                    ]))
                } else {
                    Some(fixtures::comic_response(
                        "Some Series",
                        "A summary",
                        &["Author A"],
                        &["Action", "Drama"],
                    ))
                }
            })
            .await;
        let series = client(transport.clone());

        let info = series
            .get_series_info("https://bato.si/title/91934-x?ref=1")
            .await
            .unwrap();

        assert_eq!(info.title, "Some Series");
        assert_eq!(info.description, "A summary");
        assert_eq!(
            info.attributes.get("Genres"),
            Some(&AttributeValue::List(vec![
                "Action".to_string(),
                "Drama".to_string()
            ]))
        );
        let labels: Vec<_> = info.chapters.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Chapter 1", "Chapter 2", "Chapter 3"]);
        assert_eq!(info.chapters[0].url, "https://bato.to/title/91934-x/1");
        assert_eq!(info.canonical_url, "https://bato.to/title/91934-x");

        let requests = transport.recorded_requests().await;
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.url == "https://bato.to/apo/"));
    }

    #[tokio::test]
    async fn test_missing_fields_use_defaults() {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_handler(|_| Some(serde_json::json!({"data": {}})))
            .await;
        let series = client(transport);

        let info = series.get_series_info("/title/5").await.unwrap();

        assert_eq!(info.title, "Unknown Title");
        assert_eq!(info.description, "");
        assert!(info.attributes.is_empty());
        assert!(info.chapters.is_empty());
    }
}
