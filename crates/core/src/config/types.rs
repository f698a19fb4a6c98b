use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// File name of the persisted mirror list inside the config directory.
pub const MIRRORS_FILE_NAME: &str = "bato_mirrors.json";

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub mirrors: MirrorsConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Where the mirror list is persisted
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MirrorsConfig {
    /// Explicit path to the mirror file. When unset the per-user config
    /// directory is used (see [`MirrorsConfig::resolved_path`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
}

impl MirrorsConfig {
    /// Resolve the mirror file location.
    ///
    /// Returns `None` when no explicit path is configured and the platform
    /// has no home directory; callers then keep the mirror list in memory.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }
        directories::ProjectDirs::from("dev", "mangaroute", "mangaroute")
            .map(|dirs| dirs.config_dir().join(MIRRORS_FILE_NAME))
    }
}

/// Network client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Minimum delay between two requests of one client, in milliseconds.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Pages fetched per search when the caller does not say otherwise.
    #[serde(default = "default_max_search_pages")]
    pub max_search_pages: u32,
    /// Connection establishment timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Per-request timeout for search pages.
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
    /// Per-request timeout for series metadata and chapter lists.
    #[serde(default = "default_series_info_timeout")]
    pub series_info_timeout_secs: u64,
    /// Per-request timeout for plain page fetches.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Path of the GraphQL endpoint on every mirror.
    #[serde(default = "default_api_path")]
    pub api_path: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ClientConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn series_info_timeout(&self) -> Duration {
        Duration::from_secs(self.series_info_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_rate_limit_ms(),
            max_search_pages: default_max_search_pages(),
            connect_timeout_secs: default_connect_timeout(),
            search_timeout_secs: default_search_timeout(),
            series_info_timeout_secs: default_series_info_timeout(),
            request_timeout_secs: default_request_timeout(),
            api_path: default_api_path(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_rate_limit_ms() -> u64 {
    500
}

fn default_max_search_pages() -> u32 {
    3
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_search_timeout() -> u64 {
    15
}

fn default_series_info_timeout() -> u64 {
    20
}

fn default_request_timeout() -> u64 {
    30
}

fn default_api_path() -> String {
    "/apo/".to_string()
}

fn default_user_agent() -> String {
    format!("mangaroute/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.mirrors.config_path.is_none());
        assert_eq!(config.client.rate_limit_ms, 500);
        assert_eq!(config.client.max_search_pages, 3);
        assert_eq!(config.client.connect_timeout_secs, 5);
        assert_eq!(config.client.search_timeout_secs, 15);
        assert_eq!(config.client.series_info_timeout_secs, 20);
        assert_eq!(config.client.request_timeout_secs, 30);
        assert_eq!(config.client.api_path, "/apo/");
        assert!(config.client.user_agent.starts_with("mangaroute/"));
    }

    #[test]
    fn test_deserialize_partial_client_section() {
        let toml = r#"
[client]
rate_limit_ms = 0
max_search_pages = 7
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.client.rate_limit_ms, 0);
        assert_eq!(config.client.max_search_pages, 7);
        // untouched fields keep their defaults
        assert_eq!(config.client.search_timeout_secs, 15);
    }

    #[test]
    fn test_deserialize_with_custom_mirror_path() {
        let toml = r#"
[mirrors]
config_path = "/data/mirrors.json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.mirrors.resolved_path(),
            Some(PathBuf::from("/data/mirrors.json"))
        );
    }

    #[test]
    fn test_duration_helpers() {
        let client = ClientConfig::default();
        assert_eq!(client.rate_limit(), Duration::from_millis(500));
        assert_eq!(client.connect_timeout(), Duration::from_secs(5));
        assert_eq!(client.series_info_timeout(), Duration::from_secs(20));
    }
}
