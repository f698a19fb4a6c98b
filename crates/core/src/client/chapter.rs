//! Chapter page retrieval.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::extract::{BatoChapterExtractor, ChapterExtractor, ParsedChapter};

use super::{resolve_url, ClientError, FallbackExecutor, RequestError, Transport};

/// Downloads chapter pages through the mirror fallback and hands them to a
/// [`ChapterExtractor`].
#[derive(Clone)]
pub struct ChapterClient {
    executor: FallbackExecutor,
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn ChapterExtractor>,
    timeout: Duration,
}

impl std::fmt::Debug for ChapterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapterClient")
            .field("extractor", &self.extractor.name())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ChapterClient {
    pub fn new(
        executor: FallbackExecutor,
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            executor,
            transport,
            extractor: Arc::new(BatoChapterExtractor::new()),
            timeout: config.request_timeout(),
        }
    }

    /// Use a different page extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn ChapterExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn extractor(&self) -> &Arc<dyn ChapterExtractor> {
        &self.extractor
    }

    /// Fetch the chapter page from the active mirror and extract its images.
    ///
    /// Only the path and query of `chapter_url` are used; the origin is
    /// replaced by whichever mirror answers.
    pub async fn get_chapter(&self, chapter_url: &str) -> Result<ParsedChapter, ClientError> {
        let path = chapter_path(chapter_url).ok_or_else(|| {
            ClientError::InvalidInput(format!("Invalid chapter URL: {}", chapter_url))
        })?;
        let path = path.as_str();
        let transport = self.transport.as_ref();
        let timeout = self.timeout;

        let ((content, page_url), mirror) = self
            .executor
            .execute("chapter_page", move |mirror| async move {
                let page_url = resolve_url(mirror.base_url(), path).ok_or_else(|| {
                    RequestError::InvalidResponse(format!(
                        "Invalid mirror origin: {}",
                        mirror.base_url()
                    ))
                })?;
                let content = transport.get_text(&page_url, timeout).await?;
                Ok::<_, RequestError>((content, page_url))
            })
            .await?;

        debug!(
            mirror = %mirror.base_url(),
            extractor = self.extractor.name(),
            "Extracting chapter page"
        );

        self.extractor
            .extract(&content, &page_url)
            .ok_or_else(|| ClientError::NotParseable(chapter_url.to_string()))
    }
}

/// Path plus query of a chapter URL. Bare paths are accepted; an empty or
/// root path is rejected.
fn chapter_path(chapter_url: &str) -> Option<String> {
    let trimmed = chapter_url.trim();
    let path = match Url::parse(trimmed) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(_) if trimmed.starts_with('/') => trimmed
            .split('#')
            .next()
            .unwrap_or_default()
            .to_string(),
        Err(_) => return None,
    };

    let bare = path.split('?').next().unwrap_or_default();
    if bare.is_empty() || bare == "/" {
        return None;
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RateLimiter;
    use crate::mirror::{MirrorManager, MirrorRecord};
    use crate::testing::MockTransport;

    const PAGE: &str = r#"<html><body><script>
        const local_text_sub = "Series";
        const local_text_epi = "Ch 1";
        const imgHttps = ["https://k00.mbabc.org/1.webp"];
    </script></body></html>"#;

    fn client(transport: Arc<MockTransport>, manager: Arc<MirrorManager>) -> ChapterClient {
        let executor = FallbackExecutor::new(manager, Arc::new(RateLimiter::disabled()));
        ChapterClient::new(executor, transport, &ClientConfig::default())
    }

    #[test]
    fn test_chapter_path() {
        assert_eq!(
            chapter_path("https://bato.to/title/1-x/99?load=2").as_deref(),
            Some("/title/1-x/99?load=2")
        );
        assert_eq!(chapter_path("/chapter/5#p2").as_deref(), Some("/chapter/5"));
        assert_eq!(chapter_path("https://bato.to/"), None);
        assert_eq!(chapter_path("chapter 5"), None);
    }

    #[tokio::test]
    async fn test_get_chapter_uses_active_mirror() {
        let transport = Arc::new(MockTransport::new());
        transport.set_page("https://bato.si/chapter/5", PAGE).await;
        transport.fail_origin("https://a.test").await;
        let manager = Arc::new(MirrorManager::with_mirrors(vec![
            MirrorRecord::from_origin("https://a.test"),
            MirrorRecord::from_origin("https://bato.si"),
        ]));
        let chapters = client(transport.clone(), manager.clone());

        let parsed = chapters
            .get_chapter("https://bato.to/chapter/5")
            .await
            .unwrap();

        assert_eq!(parsed.title, "Series");
        assert_eq!(parsed.image_urls, vec!["https://k00.mbabc.org/1.webp"]);
        assert_eq!(manager.current_base_url(), "https://bato.si");
    }

    #[tokio::test]
    async fn test_unparseable_page() {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_page("https://bato.to/chapter/5", "<html></html>")
            .await;
        let chapters = client(transport, Arc::new(MirrorManager::in_memory()));

        let err = chapters.get_chapter("/chapter/5").await.unwrap_err();

        assert!(matches!(err, ClientError::NotParseable(_)));
    }

    #[tokio::test]
    async fn test_invalid_chapter_url() {
        let transport = Arc::new(MockTransport::new());
        let chapters = client(transport.clone(), Arc::new(MirrorManager::in_memory()));

        let err = chapters.get_chapter("https://bato.to").await.unwrap_err();

        assert!(matches!(err, ClientError::InvalidInput(_)));
        assert!(transport.recorded_requests().await.is_empty());
    }
}
