//! Chapter page extraction.
//!
//! An extractor turns the HTML of a chapter page into the chapter's title
//! and its ordered image URLs. Extractors are selected by URL; a page an
//! extractor cannot make sense of yields `None` rather than an error.

mod bato;

pub use bato::BatoChapterExtractor;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

static INVALID_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_.\-]").unwrap());
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{3,}").unwrap());

/// Title, chapter name and image list extracted from a chapter page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedChapter {
    /// Series title, sanitized for use as a file name.
    pub title: String,
    /// Chapter name, sanitized for use as a file name.
    pub chapter: String,
    /// Page images in reading order.
    pub image_urls: Vec<String>,
}

/// Parses chapter pages of one site family.
pub trait ChapterExtractor: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Whether this extractor understands pages at `url`.
    fn can_handle(&self, url: &str) -> bool;

    /// Extract the chapter from page HTML, or `None` when the page does not
    /// carry a recognizable payload.
    fn extract(&self, content: &str, url: &str) -> Option<ParsedChapter>;

    /// Alternative URL to try after an image download from `failed_url`
    /// fails.
    fn image_fallback(&self, _failed_url: &str) -> Option<String> {
        None
    }
}

/// Make `name` safe to use as a file or directory name.
///
/// Anything outside `[a-zA-Z0-9_.-]` becomes `_`, runs of three or more
/// underscores collapse to two, and leading/trailing underscores are
/// dropped.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = INVALID_FILENAME_CHARS.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "__");
    collapsed.trim_matches('_').to_string()
}
