//! Extractor for Bato chapter pages.
//!
//! Two page layouts are understood: the scripted reader that declares
//! `const imgHttps = [...]` inline, and the Qwik-rendered reader that ships
//! its state as a `qwik/json` script with references encoded as base-36
//! indexes into an `objs` table.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{sanitize_filename, ChapterExtractor, ParsedChapter};

static IMG_HTTPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)const\s+imgHttps\s*=\s*(\[.*?\])\s*;").unwrap());
static SHORT_DOMAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]to\.to$").unwrap());
static IMAGE_SERVER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^k(\d+)\.(mb[a-z]+\.org)$").unwrap());
static BASE36_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-z]+$").unwrap());

const KNOWN_HOSTS: &[&str] = &[
    "bato.to",
    "batoto.in",
    "batoto.tv",
    "batotoo.com",
    "batotwo.com",
    "mangatoto.com",
    "comiko.net",
    "batpub.com",
    "batread.com",
    "batocomic.com",
    "readtoto.com",
    "kuku.to",
    "okok.to",
    "ruru.to",
    "xdxd.to",
];

/// Limit on nested reference hops when resolving Qwik state.
const MAX_RESOLVE_DEPTH: usize = 64;

#[derive(Debug, Default, Clone, Copy)]
pub struct BatoChapterExtractor;

impl BatoChapterExtractor {
    pub fn new() -> Self {
        Self
    }

    fn parse_modern_script(&self, document: &Html) -> Option<ParsedChapter> {
        let scripts = Selector::parse("script").ok()?;
        for script in document.select(&scripts) {
            let content: String = script.text().collect();
            if content.is_empty() {
                continue;
            }

            let Some(array) = IMG_HTTPS.captures(&content).and_then(|c| c.get(1)) else {
                continue;
            };

            let urls = match serde_json::from_str::<Vec<Value>>(array.as_str()) {
                Ok(urls) => urls,
                Err(e) => {
                    debug!(error = %e, "Invalid JSON in imgHttps payload");
                    continue;
                }
            };

            let image_urls = non_empty_strings(&urls);
            if image_urls.is_empty() {
                continue;
            }

            let title = js_string(&content, "local_text_sub").unwrap_or_else(|| "Manga".to_string());
            let chapter =
                js_string(&content, "local_text_epi").unwrap_or_else(|| "Chapter".to_string());

            return Some(ParsedChapter {
                title: sanitize_filename(&title),
                chapter: sanitize_filename(&chapter),
                image_urls,
            });
        }

        None
    }

    fn parse_qwik_payload(&self, document: &Html, url: &str) -> Option<ParsedChapter> {
        let selector = Selector::parse(r#"script[type="qwik/json"]"#).ok()?;
        let script = document.select(&selector).next()?;
        let content: String = script.text().collect();

        let data: Value = match serde_json::from_str(&content) {
            Ok(data) => data,
            Err(e) => {
                debug!(url = url, error = %e, "Failed to parse qwik/json payload");
                return None;
            }
        };
        let objs = data.get("objs")?.as_array()?;

        let state = objs.iter().find(|obj| {
            obj.is_object()
                && obj.get("chapterData").is_some_and(is_truthy)
                && obj.get("comicData").is_some_and(is_truthy)
        })?;

        let mut resolver = Resolver::new(objs);
        let chapter_data = resolver.resolve(&state["chapterData"], 0);
        let comic_data = resolver.resolve(&state["comicData"], 0);
        if !chapter_data.is_object() || !comic_data.is_object() {
            return None;
        }

        let image_file = resolver.resolve(&chapter_data["imageFile"], 0);
        let image_list = if image_file.is_object() {
            resolver.resolve(&image_file["urlList"], 0)
        } else {
            image_file
        };

        let image_urls = non_empty_strings(image_list.as_array()?);
        if image_urls.is_empty() {
            return None;
        }

        let title = first_truthy(&comic_data, &["name", "title"]).unwrap_or_else(|| "Manga".to_string());
        let chapter =
            first_truthy(&chapter_data, &["dname", "title"]).unwrap_or_else(|| "Chapter".to_string());

        Some(ParsedChapter {
            title: sanitize_filename(&title),
            chapter: sanitize_filename(&chapter),
            image_urls,
        })
    }
}

impl ChapterExtractor for BatoChapterExtractor {
    fn name(&self) -> &str {
        "Bato"
    }

    fn can_handle(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
        else {
            return false;
        };

        if KNOWN_HOSTS.contains(&host.as_str()) || host.starts_with("bato.") {
            return true;
        }

        let short_domain = SHORT_DOMAIN.is_match(&host);

        short_domain || host.contains("bato")
    }

    fn extract(&self, content: &str, url: &str) -> Option<ParsedChapter> {
        let document = Html::parse_document(content);

        self.parse_modern_script(&document)
            .or_else(|| self.parse_qwik_payload(&document, url))
    }

    /// Bato CDN hosts `kNN.mbXXX.org` are mirrored at `nNN.mbXXX.org`.
    fn image_fallback(&self, failed_url: &str) -> Option<String> {
        let mut url = Url::parse(failed_url).ok()?;
        let host = url.host_str()?.to_lowercase();

        let caps = IMAGE_SERVER.captures(&host)?;
        let new_host = format!("n{}.{}", &caps[1], &caps[2]);

        url.set_host(Some(&new_host)).ok()?;
        debug!(from = %host, to = %new_host, "Bato image fallback");
        Some(url.to_string())
    }
}

/// Follows base-36 string references into the Qwik `objs` table.
struct Resolver<'a> {
    objs: &'a [Value],
    cache: HashMap<String, Value>,
}

impl<'a> Resolver<'a> {
    fn new(objs: &'a [Value]) -> Self {
        Self {
            objs,
            cache: HashMap::new(),
        }
    }

    fn resolve(&mut self, value: &Value, depth: usize) -> Value {
        if depth > MAX_RESOLVE_DEPTH {
            return value.clone();
        }

        match value {
            Value::String(s) => self.resolve_token(s, depth),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve(item, depth + 1))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve(v, depth + 1)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn resolve_token(&mut self, token: &str, depth: usize) -> Value {
        if let Some(cached) = self.cache.get(token) {
            return cached.clone();
        }

        let is_token = BASE36_TOKEN.is_match(token);
        let target = is_token
            .then(|| usize::from_str_radix(token, 36).ok())
            .flatten()
            .and_then(|index| self.objs.get(index));

        let resolved = match target {
            Some(Value::String(s)) if s == token => Value::String(s.clone()),
            Some(target) => self.resolve(target, depth + 1),
            None => Value::String(token.to_string()),
        };

        self.cache.insert(token.to_string(), resolved.clone());
        resolved
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn first_truthy(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| is_truthy(value))
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

fn non_empty_strings(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Value of `const <name> = "..."` (or single-quoted) in a script body.
fn js_string(content: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"(?s)const\s+{}\s*=\s*(?:"(.*?)"|'(.*?)')\s*;"#,
        regex_lite::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(content)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modern_page() -> String {
        r#"<html><head></head><body>
        <script>var unrelated = 1;</script>
        <script>
          const local_text_sub = 'My Series: Part 2';
          const local_text_epi = "Chapter 5";
          const imgHttps = ["https://k03.mbabc.org/a.webp", "", "https://k03.mbabc.org/b.webp"];
        </script>
        </body></html>"#
            .to_string()
    }

    fn qwik_page() -> String {
        let state = serde_json::json!({
            "objs": [
                {"chapterData": "1", "comicData": "2"},
                {"dname": "Ch. 7", "imageFile": "3"},
                {"name": "Qwik Comic"},
                {"urlList": ["4", "5"]},
                "https://n01.mbxyz.org/1.webp",
                "https://n01.mbxyz.org/2.webp"
            ]
        });
        format!(
            r#"<html><body><script type="qwik/json">{}</script></body></html>"#,
            state
        )
    }

    #[test]
    fn test_can_handle() {
        let extractor = BatoChapterExtractor::new();
        assert!(extractor.can_handle("https://bato.to/chapter/1"));
        assert!(extractor.can_handle("https://bato.ing/title/1/2"));
        assert!(extractor.can_handle("https://mto.to/chapter/1"));
        assert!(extractor.can_handle("https://kuku.to/x"));
        assert!(extractor.can_handle("https://mybatomirror.net/x"));
        assert!(!extractor.can_handle("https://mangadex.org/chapter/1"));
        assert!(!extractor.can_handle("not a url"));
    }

    #[test]
    fn test_extract_modern_script() {
        let parsed = BatoChapterExtractor::new()
            .extract(&modern_page(), "https://bato.to/chapter/1")
            .unwrap();

        assert_eq!(parsed.title, "My_Series__Part_2");
        assert_eq!(parsed.chapter, "Chapter_5");
        assert_eq!(
            parsed.image_urls,
            vec![
                "https://k03.mbabc.org/a.webp".to_string(),
                "https://k03.mbabc.org/b.webp".to_string()
            ]
        );
    }

    #[test]
    fn test_extract_qwik_payload() {
        let parsed = BatoChapterExtractor::new()
            .extract(&qwik_page(), "https://bato.to/chapter/1")
            .unwrap();

        assert_eq!(parsed.title, "Qwik_Comic");
        assert_eq!(parsed.chapter, "Ch._7");
        assert_eq!(parsed.image_urls.len(), 2);
        assert_eq!(parsed.image_urls[0], "https://n01.mbxyz.org/1.webp");
    }

    #[test]
    fn test_extract_unrecognized_page() {
        let extractor = BatoChapterExtractor::new();
        assert!(extractor
            .extract("<html><body><p>nothing</p></body></html>", "https://bato.to/x")
            .is_none());
        assert!(extractor
            .extract(
                r#"<script type="qwik/json">{not json</script>"#,
                "https://bato.to/x"
            )
            .is_none());
    }

    #[test]
    fn test_self_referencing_token_terminates() {
        let objs = vec![Value::String("0".to_string())];
        let mut resolver = Resolver::new(&objs);
        assert_eq!(
            resolver.resolve(&Value::String("0".to_string()), 0),
            Value::String("0".to_string())
        );

        let cyclic = vec![Value::String("1".to_string()), Value::String("0".to_string())];
        let mut resolver = Resolver::new(&cyclic);
        // must return rather than recurse forever
        let _ = resolver.resolve(&Value::String("0".to_string()), 0);
    }

    #[test]
    fn test_image_fallback() {
        let extractor = BatoChapterExtractor::new();
        assert_eq!(
            extractor.image_fallback("https://k05.mbxma.org/media/1.webp").as_deref(),
            Some("https://n05.mbxma.org/media/1.webp")
        );
        assert_eq!(extractor.image_fallback("https://n05.mbxma.org/1.webp"), None);
        assert_eq!(extractor.image_fallback("https://example.com/1.webp"), None);
    }

    #[test]
    fn test_static_patterns_compile() {
        for pattern in [&IMG_HTTPS, &SHORT_DOMAIN, &IMAGE_SERVER, &BASE36_TOKEN] {
            Lazy::force(pattern);
        }
        assert!(SHORT_DOMAIN.is_match("mto.to"));
        assert!(BASE36_TOKEN.is_match("1z"));
        assert!(!BASE36_TOKEN.is_match("1Z"));
    }
}
