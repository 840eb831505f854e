use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is stored with each run record so operators can tell which
/// configuration a past run was started with.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
seed-urls = ["https://example.com/archive"]

[crawler]
worker-count = 3
url-budget = 500
avg-delay-seconds = 8.0
min-delay-seconds = 2.0
fetch-timeout-seconds = 30
join-timeout-seconds = 15
origin-filter = "https://example.com/"

[frontier]
database-path = "./frontier.db"
baseline-priority = 1.0
priority-increment = 0.5
stale-claim-minutes = 45

[user-agent]
crawler-name = "PlumeHarvest"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.worker_count, 3);
        assert_eq!(config.crawler.url_budget, 500);
        assert_eq!(config.frontier.priority_increment, 0.5);
        assert_eq!(config.frontier.stale_claim_minutes, 45);
        assert_eq!(config.seed_urls.len(), 1);
        assert_eq!(
            config.crawler.origin_filter.as_deref(),
            Some("https://example.com/")
        );
    }

    #[test]
    fn test_defaults_applied() {
        // Leave out the optional keys
        let minimal = r#"
[crawler]
worker-count = 1
avg-delay-seconds = 5.0
min-delay-seconds = 1.0
fetch-timeout-seconds = 30
join-timeout-seconds = 10

[frontier]
database-path = "./frontier.db"
priority-increment = 1.0

[user-agent]
crawler-name = "PlumeHarvest"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"
"#;
        let file = create_temp_config(minimal);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.url_budget, 0);
        assert_eq!(config.crawler.idle_backoff_seconds, 2);
        assert_eq!(config.frontier.baseline_priority, 1.0);
        assert_eq!(config.frontier.stale_claim_minutes, 60);
        assert!(config.crawler.origin_filter.is_none());
        assert!(config.seed_urls.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let bad = VALID_CONFIG.replace("worker-count = 3", "worker-count = 0");
        let file = create_temp_config(&bad);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
