//! GraphQL payloads and response shapes of the mirror API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::mirror::MirrorRecord;

use super::{resolve_url, RequestError, Transport};

pub(crate) const SEARCH_QUERY: &str = r#"
query get_content_searchComic($select: SearchComic_Select) {
  get_content_searchComic(select: $select) {
    reqWord reqPage
    paging { pages page }
    items {
      id
      data {
        id slug name urlPath
      }
    }
  }
}
"#;

pub(crate) const COMIC_QUERY: &str = r#"
query get_content_comicNode($id: ID!) {
  get_content_comicNode(id: $id) {
    data {
      id slug name urlPath
      authors
      genres
      summary { code }
    }
  }
}
"#;

pub(crate) const CHAPTER_LIST_QUERY: &str = r#"
query get_content_chapterList($comicId: ID!) {
  get_content_chapterList(comicId: $comicId) {
    id
    data {
      id urlPath dname
    }
  }
}
"#;

pub(crate) const SEARCH_FIELD: &str = "get_content_searchComic";
pub(crate) const COMIC_FIELD: &str = "get_content_comicNode";
pub(crate) const CHAPTER_LIST_FIELD: &str = "get_content_chapterList";

pub(crate) fn search_request(word: &str, page: u32) -> Value {
    json!({
        "query": SEARCH_QUERY,
        "variables": {
            "select": {
                "where": "browse",
                "word": word,
                "page": page,
            }
        }
    })
}

pub(crate) fn comic_request(comic_id: &str) -> Value {
    json!({
        "query": COMIC_QUERY,
        "variables": { "id": comic_id }
    })
}

pub(crate) fn chapter_list_request(comic_id: &str) -> Value {
    json!({
        "query": CHAPTER_LIST_QUERY,
        "variables": { "comicId": comic_id }
    })
}

/// Pull `data.<field>` out of a GraphQL response.
///
/// Any `errors` key fails the request, whatever the HTTP status was. A
/// missing or null field yields `T::default()`.
pub(crate) fn extract_data<T>(response: &Value, field: &str) -> Result<T, RequestError>
where
    T: DeserializeOwned + Default,
{
    let object = response
        .as_object()
        .ok_or_else(|| RequestError::InvalidResponse("Expected a JSON object".to_string()))?;

    if let Some(errors) = object.get("errors") {
        return Err(RequestError::Graphql(errors.to_string()));
    }

    match object.get("data").and_then(|data| data.get(field)) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => T::deserialize(value)
            .map_err(|e| RequestError::InvalidResponse(format!("Unexpected {} shape: {}", field, e))),
    }
}

/// POST a GraphQL body to the mirror's API endpoint and extract one field.
pub(crate) async fn query<T>(
    transport: &dyn Transport,
    mirror: &MirrorRecord,
    api_path: &str,
    body: &Value,
    field: &str,
    timeout: Duration,
) -> Result<T, RequestError>
where
    T: DeserializeOwned + Default,
{
    let api_url = resolve_url(mirror.base_url(), api_path).ok_or_else(|| {
        RequestError::InvalidResponse(format!("Invalid mirror origin: {}", mirror.base_url()))
    })?;

    let response = transport.post_json(&api_url, body, timeout).await?;
    extract_data(&response, field)
}

// =============================================================================
// Response shapes
// =============================================================================

// Upstream payloads drift between mirrors. Items and fields that do not
// have the expected type are coerced or dropped one by one, so a single odd
// entry never fails the whole response.

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchPage {
    #[serde(default)]
    pub items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(from = "Value")]
pub(crate) struct SearchItem {
    pub data: Option<ComicData>,
}

impl From<Value> for SearchItem {
    fn from(value: Value) -> Self {
        Self {
            data: data_of(value),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(from = "Value")]
pub(crate) struct ComicNode {
    pub data: Option<ComicData>,
}

impl From<Value> for ComicNode {
    fn from(value: Value) -> Self {
        Self {
            data: data_of(value),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ComicData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub slug: Option<String>,
    #[serde(default, rename = "urlPath", deserialize_with = "lenient_string")]
    pub url_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub authors: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub genres: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub summary: Option<Summary>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Summary {
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(from = "Value")]
pub(crate) struct ChapterItem {
    pub data: Option<ChapterData>,
}

impl From<Value> for ChapterItem {
    fn from(value: Value) -> Self {
        Self {
            data: data_of(value),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChapterData {
    #[serde(default, rename = "urlPath", deserialize_with = "lenient_string")]
    pub url_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dname: Option<String>,
}

fn data_of<T: DeserializeOwned>(value: Value) -> Option<T> {
    match value {
        Value::Object(mut object) => serde_json::from_value(object.remove("data")?).ok(),
        _ => None,
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_string(&Value::deserialize(deserializer)?))
}

/// A list of scalars; a lone scalar becomes a one-element list.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(items.iter().filter_map(coerce_string).collect()),
        other => coerce_string(&other).map(|s| vec![s]),
    })
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_variables() {
        let body = search_request("one piece", 2);
        assert_eq!(body["variables"]["select"]["where"], "browse");
        assert_eq!(body["variables"]["select"]["word"], "one piece");
        assert_eq!(body["variables"]["select"]["page"], 2);
        assert!(body["query"].as_str().unwrap().contains(SEARCH_FIELD));
    }

    #[test]
    fn test_series_request_variables() {
        assert_eq!(comic_request("91934")["variables"]["id"], "91934");
        assert_eq!(
            chapter_list_request("91934")["variables"]["comicId"],
            "91934"
        );
    }

    #[test]
    fn test_extract_errors_key_fails() {
        let response = json!({"data": {"x": 1}, "errors": [{"message": "boom"}]});
        let err = extract_data::<Value>(&response, "x").unwrap_err();
        assert!(matches!(err, RequestError::Graphql(msg) if msg.contains("boom")));
    }

    #[test]
    fn test_extract_missing_field_defaults() {
        let page: SearchPage = extract_data(&json!({"data": {}}), SEARCH_FIELD).unwrap();
        assert!(page.items.is_none());

        let chapters: Vec<ChapterItem> =
            extract_data(&json!({"data": {(CHAPTER_LIST_FIELD): null}}), CHAPTER_LIST_FIELD)
                .unwrap();
        assert!(chapters.is_empty());
    }

    #[test]
    fn test_extract_non_object_is_invalid() {
        let err = extract_data::<Value>(&json!([1, 2]), "x").unwrap_err();
        assert!(matches!(err, RequestError::InvalidResponse(_)));
    }

    #[test]
    fn test_extract_comic_node() {
        let response = json!({
            "data": {
                (COMIC_FIELD): {
                    "data": {
                        "id": 1,
                        "name": "Title",
                        "urlPath": "/title/1-title",
                        "authors": ["A"],
                        "summary": {"code": "desc"}
                    }
                }
            }
        });
        let node: ComicNode = extract_data(&response, COMIC_FIELD).unwrap();
        let data = node.data.unwrap();
        assert_eq!(data.name.as_deref(), Some("Title"));
        assert_eq!(data.url_path.as_deref(), Some("/title/1-title"));
        assert_eq!(data.summary.unwrap().code.as_deref(), Some("desc"));
        assert!(data.genres.is_none());
    }

    #[test]
    fn test_odd_items_do_not_fail_the_page() {
        let response = json!({
            "data": {
                (SEARCH_FIELD): {
                    "items": [
                        {"data": {"name": 42, "urlPath": "/title/42-answer", "slug": null}},
                        null,
                        {"data": "not an object"},
                        {"id": "3"},
                        {"data": {"name": "Fine", "urlPath": "/title/7-fine", "slug": ["x"]}}
                    ]
                }
            }
        });

        let page: SearchPage = extract_data(&response, SEARCH_FIELD).unwrap();
        let items = page.items.unwrap();

        assert_eq!(items.len(), 5);
        let first = items[0].data.as_ref().unwrap();
        assert_eq!(first.name.as_deref(), Some("42"));
        assert!(first.slug.is_none());
        assert!(items[1].data.is_none());
        assert!(items[2].data.is_none());
        assert!(items[3].data.is_none());
        let last = items[4].data.as_ref().unwrap();
        assert_eq!(last.name.as_deref(), Some("Fine"));
        assert!(last.slug.is_none());
    }

    #[test]
    fn test_comic_fields_are_coerced() {
        let response = json!({
            "data": {
                (COMIC_FIELD): {
                    "data": {
                        "name": "Title",
                        "authors": "Solo Author",
                        "genres": ["Action", 7, null, {"x": 1}],
                        "summary": "plain text"
                    }
                }
            }
        });

        let node: ComicNode = extract_data(&response, COMIC_FIELD).unwrap();
        let data = node.data.unwrap();

        assert_eq!(data.authors.unwrap(), vec!["Solo Author"]);
        assert_eq!(data.genres.unwrap(), vec!["Action", "7"]);
        assert!(data.summary.is_none());
    }

    #[test]
    fn test_chapter_items_with_bad_entries() {
        let response = json!({
            "data": {
                (CHAPTER_LIST_FIELD): [
                    {"data": {"urlPath": "/title/1/2", "dname": 2}},
                    "garbage",
                    {"data": {"urlPath": 5}}
                ]
            }
        });

        let chapters: Vec<ChapterItem> = extract_data(&response, CHAPTER_LIST_FIELD).unwrap();

        assert_eq!(chapters.len(), 3);
        let first = chapters[0].data.as_ref().unwrap();
        assert_eq!(first.dname.as_deref(), Some("2"));
        assert!(chapters[1].data.is_none());
        assert_eq!(
            chapters[2].data.as_ref().unwrap().url_path.as_deref(),
            Some("5")
        );
    }
}
