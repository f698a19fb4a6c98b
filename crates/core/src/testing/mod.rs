//! Testing utilities and mock implementations.
//!
//! This module provides a mock [`Transport`](crate::client::Transport) and
//! fixtures for mirror API responses, allowing the fallback behavior to be
//! exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mangaroute_core::testing::{fixtures, isolated_manager, MockTransport};
//! use mangaroute_core::{BatoClient, ClientConfig};
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.fail_origin("https://a.test").await;
//! transport
//!     .set_handler(|_| Some(fixtures::search_response(&[("One", "/title/1-one")])))
//!     .await;
//!
//! let mirrors = isolated_manager(&["https://a.test", "https://b.test"]);
//! let client = BatoClient::with_transport(&ClientConfig::default(), mirrors, transport);
//! ```

mod mock_transport;

pub use mock_transport::{MockTransport, RecordedRequest, RequestMethod};

use std::path::Path;
use std::sync::Arc;

use crate::config::MIRRORS_FILE_NAME;
use crate::mirror::{MirrorManager, MirrorRecord};

/// Fresh in-memory manager over `origins`, in order. An empty slice gives
/// the built-in mirrors.
pub fn isolated_manager(origins: &[&str]) -> Arc<MirrorManager> {
    Arc::new(MirrorManager::with_mirrors(
        origins.iter().map(|origin| MirrorRecord::from_origin(*origin)),
    ))
}

/// Manager persisted under `dir`, as the application would open it.
pub fn persistent_manager(dir: &Path) -> Arc<MirrorManager> {
    Arc::new(MirrorManager::open(dir.join(MIRRORS_FILE_NAME)))
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};

    fn slug(name: &str) -> String {
        name.to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }

    /// A search page response with one item per `(name, urlPath)` pair.
    pub fn search_response(items: &[(&str, &str)]) -> Value {
        let items: Vec<Value> = items
            .iter()
            .enumerate()
            .map(|(i, (name, url_path))| {
                json!({
                    "id": (i + 1).to_string(),
                    "data": {
                        "id": (i + 1).to_string(),
                        "slug": slug(name),
                        "name": name,
                        "urlPath": url_path,
                    }
                })
            })
            .collect();

        json!({
            "data": {
                "get_content_searchComic": {
                    "reqWord": "",
                    "reqPage": 1,
                    "paging": {"pages": 1, "page": 1},
                    "items": items,
                }
            }
        })
    }

    /// A comic metadata response.
    pub fn comic_response(name: &str, summary: &str, authors: &[&str], genres: &[&str]) -> Value {
        json!({
            "data": {
                "get_content_comicNode": {
                    "data": {
                        "id": "1",
                        "slug": slug(name),
                        "name": name,
                        "urlPath": format!("/title/1-{}", slug(name)),
                        "authors": authors,
                        "genres": genres,
                        "summary": {"code": summary},
                    }
                }
            }
        })
    }

    /// A chapter list response, newest first as the API returns it, with
    /// one entry per `(dname, urlPath)` pair.
    pub fn chapter_list_response(chapters: &[(&str, &str)]) -> Value {
        let chapters: Vec<Value> = chapters
            .iter()
            .enumerate()
            .map(|(i, (dname, url_path))| {
                json!({
                    "id": (i + 1).to_string(),
                    "data": {
                        "id": (i + 1).to_string(),
                        "urlPath": url_path,
                        "dname": dname,
                    }
                })
            })
            .collect();

        json!({
            "data": {
                "get_content_chapterList": chapters
            }
        })
    }

    /// A GraphQL error response.
    pub fn graphql_error(message: &str) -> Value {
        json!({"errors": [{"message": message}]})
    }

    /// A chapter page in the scripted reader layout.
    pub fn chapter_page(title: &str, chapter: &str, image_urls: &[&str]) -> String {
        format!(
            r#"<html><head><title>{title}</title></head><body>
<script>
  const local_text_sub = "{title}";
  const local_text_epi = "{chapter}";
  const imgHttps = {images};
</script>
</body></html>"#,
            title = title,
            chapter = chapter,
            images = json!(image_urls),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_manager_keeps_order() {
        let manager = isolated_manager(&["https://a.test", "https://b.test"]);
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.current_base_url(), "https://a.test");
        assert!(manager.path().is_none());
    }

    #[test]
    fn test_search_fixture_shape() {
        let value = fixtures::search_response(&[("Solo Leveling", "/title/1-solo")]);
        let item = &value["data"]["get_content_searchComic"]["items"][0]["data"];
        assert_eq!(item["slug"], "solo-leveling");
        assert_eq!(item["urlPath"], "/title/1-solo");
    }
}
