//! Task outcomes and the outcome recorder
//!
//! Every task ends in a tagged outcome; control flow never branches on
//! error types thrown further down. The recorder is the only component
//! that terminates a URL record, and a Success outcome lands as one
//! atomic unit: artifact, state, and folded links together.

use crate::frontier::{FoldStats, FrontierStore, StoreResult, UrlState};
use serde_json::Map;
use std::sync::{Arc, Mutex};

/// The artifact produced by successfully extracting a page
#[derive(Debug, Clone)]
pub struct PageArtifact {
    pub fields: Map<String, serde_json::Value>,
    pub links: Vec<String>,
}

/// Which stage produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Fetch,
    Extract,
}

impl FailureKind {
    fn tag(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
        }
    }
}

/// Terminal outcome of one task
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Success(PageArtifact),
    Failed { kind: FailureKind, reason: String },
    NotTarget,
}

/// What the recorder did, for logging and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Success(FoldStats),
    Failed,
    NotTarget,
}

/// Idempotently persists task outcomes and folds discovered links
pub struct Recorder<S: FrontierStore> {
    store: Arc<Mutex<S>>,
    baseline_priority: f64,
    priority_increment: f64,
}

impl<S: FrontierStore> Recorder<S> {
    pub fn new(store: Arc<Mutex<S>>, baseline_priority: f64, priority_increment: f64) -> Self {
        Self {
            store,
            baseline_priority,
            priority_increment,
        }
    }

    /// Applies an outcome to the URL record
    ///
    /// A store error here is the one case a worker may not resolve: neither
    /// Success nor Failed can be trusted to have been written, so the caller
    /// leaves the record Claimed for the stuck-claim reclamation pass.
    pub fn record(&self, url_id: i64, outcome: TaskOutcome) -> StoreResult<Recorded> {
        let mut store = self.store.lock().unwrap();

        match outcome {
            TaskOutcome::Success(artifact) => {
                let stats = store.record_success(
                    url_id,
                    &artifact.fields,
                    &artifact.links,
                    self.baseline_priority,
                    self.priority_increment,
                )?;
                Ok(Recorded::Success(stats))
            }
            TaskOutcome::Failed { kind, reason } => {
                let tagged = format!("{}: {}", kind.tag(), reason);
                // The bare fetch timeout keeps its canonical wording
                let tagged = if kind == FailureKind::Fetch && reason == "timeout" {
                    reason
                } else {
                    tagged
                };
                store.update_status(url_id, UrlState::Failed, Some(&tagged))?;
                Ok(Recorded::Failed)
            }
            TaskOutcome::NotTarget => {
                store.update_status(url_id, UrlState::NotTarget, None)?;
                Ok(Recorded::NotTarget)
            }
        }
    }
}
