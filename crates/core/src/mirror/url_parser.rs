//! Extract a mirror definition from a search URL pasted by a user.

use std::collections::BTreeMap;

use tracing::debug;
use url::Url;

use super::MirrorRecord;

/// Query keys that belong to a specific search rather than to the mirror.
const EXCLUDED_PARAMS: [&str; 6] = ["word", "page", "q", "query", "search", "keyword"];

/// Parse a search URL into a mirror record.
///
/// Accepts URLs such as `https://bato.ing/v4x-search?type=comic&word=test`
/// or `bato.to/search?word=test` (the scheme defaults to `https`). The
/// origin becomes `base_url`, the path becomes `search_path`, and every
/// query parameter that is not search-specific is kept in `search_params`.
///
/// Returns `None` for anything that does not parse into a URL with a host.
pub fn parse_search_url(raw_url: &str) -> Option<MirrorRecord> {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lowered = trimmed.to_ascii_lowercase();
    let candidate = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = match Url::parse(&candidate) {
        Ok(url) => url,
        Err(e) => {
            debug!("Failed to parse URL {}: {}", candidate, e);
            return None;
        }
    };

    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => return None,
    };

    let base_url = match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    };

    let search_path = match parsed.path() {
        "" => "/".to_string(),
        path => path.to_string(),
    };

    let mut search_params = BTreeMap::new();
    for (key, value) in parsed.query_pairs() {
        if value.is_empty() || is_excluded(&key) {
            continue;
        }
        search_params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }

    Some(MirrorRecord::new(base_url, search_path, search_params))
}

fn is_excluded(key: &str) -> bool {
    EXCLUDED_PARAMS
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(key))
}
