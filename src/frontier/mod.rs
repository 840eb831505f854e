//! Frontier module: the persisted set of known URLs
//!
//! The frontier is the one piece of state shared between workers. It tracks
//! every URL the crawler has ever seen, together with its crawl state and
//! priority, and backs the atomic claim operation that hands URLs to workers.

mod schema;
mod sqlite;
mod store;

pub use sqlite::SqliteFrontier;
pub use store::{FoldStats, FrontierStore, StoreError, StoreResult};

use std::fmt;

/// Crawl state of a URL record
///
/// Unclaimed and Claimed are active states; the rest are terminal. A record
/// only leaves a terminal state through an explicit operator pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    /// Known but not yet handed to any worker
    Unclaimed,

    /// Reserved by exactly one worker
    Claimed,

    /// Fetched, extracted, and persisted with an artifact
    Success,

    /// Fetch or extraction failed; failure_reason records why
    Failed,

    /// Fetched and verified not to be a content page
    NotTarget,
}

impl UrlState {
    /// Returns true if no further processing is expected for this state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unclaimed | Self::Claimed)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Unclaimed => "unclaimed",
            Self::Claimed => "claimed",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::NotTarget => "not_target",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "unclaimed" => Some(Self::Unclaimed),
            "claimed" => Some(Self::Claimed),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "not_target" => Some(Self::NotTarget),
            _ => None,
        }
    }

    pub fn all_states() -> [Self; 5] {
        [
            Self::Unclaimed,
            Self::Claimed,
            Self::Success,
            Self::Failed,
            Self::NotTarget,
        ]
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A URL record in the frontier
#[derive(Debug, Clone)]
pub struct UrlRecord {
    pub id: i64,
    pub address: String,
    pub priority: f64,
    pub state: UrlState,
    pub failure_reason: Option<String>,
    /// Id of the URL on whose page this one was first discovered
    pub discovered_from: Option<i64>,
    /// RFC 3339 timestamp of the most recent claim
    pub last_attempt: Option<String>,
}

/// Restricts which records a claim may select
#[derive(Debug, Clone, Default)]
pub struct ClaimFilter {
    /// Only addresses starting with this prefix are eligible
    pub origin_prefix: Option<String>,
}

impl ClaimFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            origin_prefix: Some(prefix.into()),
        }
    }
}

/// A crawl run (one process invocation)
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Final status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
