pub mod client;
pub mod config;
pub mod extract;
pub mod metrics;
pub mod mirror;
pub mod testing;

pub use client::{
    AttributeValue, BatoClient, ChapterClient, ChapterRef, ClientError, FallbackExecutor,
    RateLimiter, RequestError, ReqwestTransport, SearchClient, SearchHit, SeriesClient,
    SeriesInfo, Transport,
};
pub use config::{
    load_config, load_config_from_str, validate_config, ClientConfig, Config, ConfigError,
    MirrorsConfig,
};
pub use extract::{BatoChapterExtractor, ChapterExtractor, ParsedChapter};
pub use mirror::{
    parse_search_url, MirrorChange, MirrorError, MirrorManager, MirrorRecord, MirrorStore,
    MutationOutcome,
};
