use serde::Deserialize;

/// Main configuration structure for Plume-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub frontier: FrontierConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(rename = "seed-urls", default)]
    pub seed_urls: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    #[serde(rename = "worker-count")]
    pub worker_count: u32,

    /// Maximum number of URLs processed this run (0 = unlimited)
    #[serde(rename = "url-budget", default)]
    pub url_budget: u64,

    /// Average inter-request delay per worker (seconds)
    #[serde(rename = "avg-delay-seconds")]
    pub avg_delay_seconds: f64,

    /// Lower clip for the jittered delay (seconds)
    #[serde(rename = "min-delay-seconds")]
    pub min_delay_seconds: f64,

    /// Per-fetch timeout (seconds)
    #[serde(rename = "fetch-timeout-seconds")]
    pub fetch_timeout_seconds: u64,

    /// How long to wait for in-flight tasks after shutdown (seconds)
    #[serde(rename = "join-timeout-seconds")]
    pub join_timeout_seconds: u64,

    /// Idle sleep after an empty claim (seconds)
    #[serde(rename = "idle-backoff-seconds", default = "default_idle_backoff")]
    pub idle_backoff_seconds: u64,

    /// Optional address prefix restricting which URLs may be claimed
    #[serde(rename = "origin-filter", default)]
    pub origin_filter: Option<String>,
}

fn default_idle_backoff() -> u64 {
    2
}

/// Frontier store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FrontierConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Priority assigned to newly folded links
    #[serde(rename = "baseline-priority", default = "default_baseline")]
    pub baseline_priority: f64,

    /// Priority added each time a known address is rediscovered
    #[serde(rename = "priority-increment")]
    pub priority_increment: f64,

    /// Age after which a Claimed record counts as stuck (minutes)
    #[serde(rename = "stale-claim-minutes", default = "default_stale_minutes")]
    pub stale_claim_minutes: u64,
}

fn default_baseline() -> f64 {
    1.0
}

fn default_stale_minutes() -> u64 {
    60
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the full user agent string: Name/Version (+ContactURL; Email)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}
