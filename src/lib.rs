//! Plume-Harvest: a targeted single-site article crawler
//!
//! This crate implements the orchestration core of an article crawler: a
//! persisted URL frontier with priority and state tracking, an atomic claim
//! manager, a concurrent worker pool, an idempotent outcome recorder that
//! folds discovered links back into the frontier, and cooperative shutdown.

pub mod config;
pub mod crawl;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod stats;

use thiserror::Error;

/// Main error type for Plume-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frontier store error: {0}")]
    Store(#[from] frontier::StoreError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Plume-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawl::{run_crawl, CrawlReport, EndReason};
pub use frontier::{ClaimFilter, SqliteFrontier, UrlRecord, UrlState};
