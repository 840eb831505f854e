//! Frontier store trait and error types

use crate::frontier::{ClaimFilter, RunRecord, RunStatus, UrlRecord, UrlState};
use serde_json::Map;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during frontier store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("URL not found: {0}")]
    UrlNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid state transition for url {id}: {from} -> {to}")]
    InvalidTransition {
        id: i64,
        from: UrlState,
        to: UrlState,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Counts produced by one link-folding pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldStats {
    /// Addresses seen for the first time (new Unclaimed records)
    pub inserted: usize,
    /// Already-known addresses whose priority was boosted
    pub boosted: usize,
}

/// Trait for frontier store backends
///
/// Every mutation is one atomic unit against the underlying database; the
/// claim operation in particular must never hand the same record to two
/// concurrent callers.
pub trait FrontierStore {
    // ===== URL records =====

    /// Inserts a new Unclaimed URL, or returns the existing record's id
    ///
    /// Re-inserting a known address never lowers its priority and never
    /// creates a duplicate row.
    fn insert_url(
        &mut self,
        address: &str,
        priority: f64,
        discovered_from: Option<i64>,
    ) -> StoreResult<i64>;

    /// Gets a URL record by id
    fn get_url(&self, id: i64) -> StoreResult<UrlRecord>;

    /// Gets a URL record by address
    fn get_url_by_address(&self, address: &str) -> StoreResult<Option<UrlRecord>>;

    /// Atomically claims up to `n` Unclaimed records
    ///
    /// Selection order is (priority DESC, id ASC). Each selected record is
    /// transitioned to Claimed and stamped with a `last_attempt` timestamp
    /// inside the same transaction. Returns an empty vector, not an error,
    /// when nothing is eligible.
    fn claim(&mut self, n: usize, filter: &ClaimFilter) -> StoreResult<Vec<UrlRecord>>;

    /// Updates a URL's state and failure reason
    fn update_status(
        &mut self,
        id: i64,
        state: UrlState,
        reason: Option<&str>,
    ) -> StoreResult<()>;

    // ===== Artifacts =====

    /// Creates or overwrites the artifact for a URL, never duplicating
    fn upsert_artifact(
        &mut self,
        url_id: i64,
        fields: &Map<String, serde_json::Value>,
    ) -> StoreResult<()>;

    /// Checks whether an artifact exists for a URL
    fn artifact_exists(&self, url_id: i64) -> StoreResult<bool>;

    // ===== Link folding =====

    /// Folds one discovered address into the frontier
    ///
    /// Unseen address: inserts a new Unclaimed record at `baseline` priority
    /// with `discovered_from` set to `parent_id`. Known address: adds
    /// `increment` to its priority. Returns true if a new record was created.
    fn bump_or_insert_link(
        &mut self,
        address: &str,
        parent_id: i64,
        baseline: f64,
        increment: f64,
    ) -> StoreResult<bool>;

    /// Applies a Success outcome as one atomic unit
    ///
    /// Artifact upsert, state transition to Success, and folding of every
    /// discovered link happen in a single transaction: a crash partway never
    /// leaves a Success state without its artifact or vice versa. Calling
    /// this again for an already-Success record re-applies the artifact
    /// rather than erroring, so retries stay idempotent.
    fn record_success(
        &mut self,
        url_id: i64,
        fields: &Map<String, serde_json::Value>,
        links: &[String],
        baseline: f64,
        increment: f64,
    ) -> StoreResult<FoldStats>;

    // ===== Operator passes =====

    /// Resets all Failed records to Unclaimed, clearing failure reasons
    fn reset_failed(&mut self) -> StoreResult<usize>;

    /// Resets Claimed records whose last attempt is older than the cutoff
    ///
    /// This is the stuck-claim reclamation pass for tasks abandoned by a
    /// store outage or a killed process.
    fn reclaim_stale(&mut self, older_than: Duration) -> StoreResult<usize>;

    // ===== Run management =====

    /// Creates a new run row and returns its id
    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64>;

    /// Marks a run finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StoreResult<()>;

    /// Gets a run by id
    fn get_run(&self, run_id: i64) -> StoreResult<RunRecord>;

    // ===== Statistics =====

    /// Counts URL records grouped by state
    fn count_by_state(&self) -> StoreResult<HashMap<UrlState, u64>>;

    /// Total number of URL records
    fn count_urls(&self) -> StoreResult<u64>;

    /// Total number of artifacts
    fn count_artifacts(&self) -> StoreResult<u64>;
}
