use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Every timeout is non-zero
/// - At least one search page is requested
/// - The API path is absolute
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let client = &config.client;

    let timeouts = [
        ("client.connect_timeout_secs", client.connect_timeout_secs),
        ("client.search_timeout_secs", client.search_timeout_secs),
        ("client.series_info_timeout_secs", client.series_info_timeout_secs),
        ("client.request_timeout_secs", client.request_timeout_secs),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!("{} cannot be 0", name)));
        }
    }

    if client.max_search_pages == 0 {
        return Err(ConfigError::ValidationError(
            "client.max_search_pages must be at least 1".to_string(),
        ));
    }

    if !client.api_path.starts_with('/') {
        return Err(ConfigError::ValidationError(format!(
            "client.api_path must start with '/', got {:?}",
            client.api_path
        )));
    }

    Ok(())
}
