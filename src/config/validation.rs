//! Configuration validation rules

use crate::config::types::Config;
use crate::ConfigError;
use url::Url;

/// Validates a parsed configuration
///
/// Checks that the numeric knobs are in sane ranges and that every seed URL
/// parses as an absolute http(s) URL.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.crawler.worker_count == 0 {
        return Err(ConfigError::Validation(
            "worker-count must be at least 1".to_string(),
        ));
    }

    if config.crawler.avg_delay_seconds < 0.0 {
        return Err(ConfigError::Validation(
            "avg-delay-seconds must not be negative".to_string(),
        ));
    }

    if config.crawler.min_delay_seconds < 0.0 {
        return Err(ConfigError::Validation(
            "min-delay-seconds must not be negative".to_string(),
        ));
    }

    if config.crawler.min_delay_seconds > config.crawler.avg_delay_seconds {
        return Err(ConfigError::Validation(
            "min-delay-seconds must not exceed avg-delay-seconds".to_string(),
        ));
    }

    if config.crawler.fetch_timeout_seconds == 0 {
        return Err(ConfigError::Validation(
            "fetch-timeout-seconds must be at least 1".to_string(),
        ));
    }

    if config.crawler.join_timeout_seconds == 0 {
        return Err(ConfigError::Validation(
            "join-timeout-seconds must be at least 1".to_string(),
        ));
    }

    if config.frontier.priority_increment <= 0.0 {
        return Err(ConfigError::Validation(
            "priority-increment must be positive".to_string(),
        ));
    }

    if config.frontier.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path must not be empty".to_string(),
        ));
    }

    for seed in &config.seed_urls {
        let url =
            Url::parse(seed).map_err(|_| ConfigError::InvalidUrl(seed.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(seed.clone()));
        }
    }

    Ok(())
}
