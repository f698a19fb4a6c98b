//! Single entry point bundling the mirror clients.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::extract::ParsedChapter;
use crate::mirror::MirrorManager;

use super::{
    ChapterClient, ClientError, FallbackExecutor, RateLimiter, ReqwestTransport, SearchClient,
    SearchHit, SeriesClient, SeriesInfo, Transport,
};

/// Search, series and chapter clients sharing one mirror manager, one rate
/// limiter and one transport.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use mangaroute_core::{BatoClient, ClientConfig, MirrorManager};
///
/// let mirrors = Arc::new(MirrorManager::in_memory());
/// let client = BatoClient::new(&ClientConfig::default(), mirrors)?;
/// let hits = client.search("one piece", None).await?;
/// ```
#[derive(Debug, Clone)]
pub struct BatoClient {
    mirrors: Arc<MirrorManager>,
    search: SearchClient,
    series: SeriesClient,
    chapters: ChapterClient,
}

impl BatoClient {
    /// Create a client over HTTP.
    pub fn new(config: &ClientConfig, mirrors: Arc<MirrorManager>) -> Result<Self, ClientError> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Ok(Self::with_transport(config, mirrors, transport))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(
        config: &ClientConfig,
        mirrors: Arc<MirrorManager>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit()));
        let executor = FallbackExecutor::new(mirrors.clone(), rate_limiter);
        Self::from_executor(config, executor, transport)
    }

    fn from_executor(
        config: &ClientConfig,
        executor: FallbackExecutor,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            mirrors: executor.mirrors().clone(),
            search: SearchClient::new(executor.clone(), transport.clone(), config),
            series: SeriesClient::new(executor.clone(), transport.clone(), config),
            chapters: ChapterClient::new(executor, transport, config),
        }
    }

    /// Abort pending and future requests once `token` is cancelled.
    pub fn with_cancellation(self, config: &ClientConfig, token: CancellationToken) -> Self {
        let executor = self.search.executor().clone().with_cancellation(token);
        let transport = self.search.transport().clone();
        Self::from_executor(config, executor, transport)
    }

    pub fn mirrors(&self) -> &Arc<MirrorManager> {
        &self.mirrors
    }

    pub fn search_client(&self) -> &SearchClient {
        &self.search
    }

    pub fn series_client(&self) -> &SeriesClient {
        &self.series
    }

    pub fn chapter_client(&self) -> &ChapterClient {
        &self.chapters
    }

    pub async fn search(
        &self,
        query: &str,
        max_pages: Option<u32>,
    ) -> Result<Vec<SearchHit>, ClientError> {
        self.search.search(query, max_pages).await
    }

    pub async fn get_series_info(&self, series_url: &str) -> Result<SeriesInfo, ClientError> {
        self.series.get_series_info(series_url).await
    }

    pub async fn get_chapter(&self, chapter_url: &str) -> Result<ParsedChapter, ClientError> {
        self.chapters.get_chapter(chapter_url).await
    }
}
