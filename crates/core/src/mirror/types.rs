//! Types for mirror configuration.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Search path shared by every built-in mirror.
pub const DEFAULT_SEARCH_PATH: &str = "/v4x-search";

/// Origins installed when no usable mirror list is persisted.
const DEFAULT_ORIGINS: [&str; 3] = ["https://bato.to", "https://bato.si", "https://bato.ing"];

/// A single mirror site serving the same backend API.
///
/// Records are values: they are never mutated in place, the store replaces
/// them instead. Two records are equal when they share a `base_url`.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorRecord {
    base_url: String,
    search_path: String,
    search_params: BTreeMap<String, String>,
}

impl MirrorRecord {
    /// Create a record. A trailing slash on `base_url` is stripped.
    pub fn new(
        base_url: impl Into<String>,
        search_path: impl Into<String>,
        search_params: BTreeMap<String, String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            search_path: search_path.into(),
            search_params,
        }
    }

    /// Record for a bare origin, using the built-in search path and params.
    pub fn from_origin(base_url: impl Into<String>) -> Self {
        Self::new(base_url, DEFAULT_SEARCH_PATH, default_search_params())
    }

    /// Origin (scheme + host + optional port), without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn search_path(&self) -> &str {
        &self.search_path
    }

    pub fn search_params(&self) -> &BTreeMap<String, String> {
        &self.search_params
    }

    /// Copy of this record carrying the search settings of `other`.
    pub fn with_search_from(&self, other: &MirrorRecord) -> Self {
        Self {
            base_url: self.base_url.clone(),
            search_path: other.search_path.clone(),
            search_params: other.search_params.clone(),
        }
    }

    /// Browser search URL for `word` on this mirror.
    ///
    /// The record's own params come first, followed by `word` and `page`.
    pub fn search_url(&self, word: &str, page: u32) -> String {
        let mut pairs: Vec<String> = self
            .search_params
            .iter()
            .filter(|(key, _)| key.as_str() != "word" && key.as_str() != "page")
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect();
        pairs.push(format!("word={}", urlencoding::encode(word)));
        pairs.push(format!("page={}", page));

        format!("{}{}?{}", self.base_url, self.search_path, pairs.join("&"))
    }
}

impl PartialEq for MirrorRecord {
    fn eq(&self, other: &Self) -> bool {
        self.base_url == other.base_url
    }
}

impl Eq for MirrorRecord {}

impl fmt::Display for MirrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.base_url, self.search_path)
    }
}

fn default_search_params() -> BTreeMap<String, String> {
    BTreeMap::from([("type".to_string(), "comic".to_string())])
}

/// First built-in mirror, used when nothing else is available.
pub fn primary_default() -> MirrorRecord {
    MirrorRecord::from_origin(DEFAULT_ORIGINS[0])
}

/// The built-in mirror set.
pub fn default_mirrors() -> Vec<MirrorRecord> {
    DEFAULT_ORIGINS
        .iter()
        .map(|origin| MirrorRecord::from_origin(*origin))
        .collect()
}

/// A rejected mirror-management operation.
///
/// The `Display` text is meant to be shown to users as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MirrorError {
    #[error("Invalid URL format. Please paste a search URL from your browser.")]
    InvalidUrl(String),

    #[error("Invalid mirror index")]
    InvalidIndex(usize),

    #[error("Cannot remove the last mirror")]
    LastMirror,
}

/// A successful mirror-management operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorChange {
    Added(MirrorRecord),
    Updated(MirrorRecord),
    Removed(MirrorRecord),
    Moved { from: usize, to: usize },
    Unchanged,
    Reset,
}

impl fmt::Display for MirrorChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorChange::Added(record) => write!(
                f,
                "Added mirror: {} (path: {})",
                record.base_url(),
                record.search_path()
            ),
            MirrorChange::Updated(record) => write!(
                f,
                "Updated {} search path to {}",
                record.base_url(),
                record.search_path()
            ),
            MirrorChange::Removed(record) => write!(f, "Removed mirror: {}", record.base_url()),
            MirrorChange::Moved { from, to } => write!(f, "Moved mirror from {} to {}", from, to),
            MirrorChange::Unchanged => write!(f, "No changes"),
            MirrorChange::Reset => write!(f, "Mirrors reset to defaults"),
        }
    }
}

/// `(success, message)` pair for direct display by a UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub success: bool,
    pub message: String,
}

impl From<Result<MirrorChange, MirrorError>> for MutationOutcome {
    fn from(result: Result<MirrorChange, MirrorError>) -> Self {
        match result {
            Ok(change) => Self {
                success: true,
                message: change.to_string(),
            },
            Err(err) => Self {
                success: false,
                message: err.to_string(),
            },
        }
    }
}
