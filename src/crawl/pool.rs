//! Worker pool lifecycle
//!
//! The pool spawns one task per worker, shares a single shutdown
//! coordinator and counter set across them, and drains the tasks under a
//! deadline once shutdown triggers. Workers that outlive the deadline are
//! aborted rather than allowed to hold claims forever.

use crate::crawl::shutdown::{EndReason, ShutdownCoordinator};
use crate::crawl::worker::{CrawlCounters, Worker};
use crate::frontier::FrontierStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

/// Final accounting for one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlReport {
    pub end_reason: EndReason,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub not_target: u64,
    pub stuck: u64,
    pub discovered: u64,
}

impl CrawlReport {
    fn from_counters(end_reason: EndReason, counters: &CrawlCounters) -> Self {
        Self {
            end_reason,
            processed: counters.processed.load(Ordering::SeqCst),
            succeeded: counters.succeeded.load(Ordering::SeqCst),
            failed: counters.failed.load(Ordering::SeqCst),
            not_target: counters.not_target.load(Ordering::SeqCst),
            stuck: counters.stuck.load(Ordering::SeqCst),
            discovered: counters.discovered.load(Ordering::SeqCst),
        }
    }
}

/// A set of spawned crawl workers awaiting collection
pub struct CrawlPool {
    shutdown: ShutdownCoordinator,
    counters: Arc<CrawlCounters>,
    handles: Vec<JoinHandle<()>>,
    join_timeout: Duration,
}

impl CrawlPool {
    pub fn new(shutdown: ShutdownCoordinator, join_timeout: Duration) -> Self {
        Self {
            shutdown,
            counters: Arc::new(CrawlCounters::default()),
            handles: Vec::new(),
            join_timeout,
        }
    }

    /// Counters shared with every worker spawned into this pool
    pub fn counters(&self) -> Arc<CrawlCounters> {
        Arc::clone(&self.counters)
    }

    pub fn spawn_worker<S>(&mut self, worker: Worker<S>)
    where
        S: FrontierStore + Send + 'static,
    {
        self.handles.push(tokio::spawn(worker.run()));
    }

    /// Waits for every worker and builds the run report
    ///
    /// Workers finish on their own schedule until shutdown triggers; from
    /// that moment each gets at most the remaining share of the join
    /// timeout before it is aborted.
    pub async fn join(self) -> CrawlReport {
        let mut deadline: Option<Instant> = None;

        for (index, mut handle) in self.handles.into_iter().enumerate() {
            loop {
                match deadline {
                    None => {
                        tokio::select! {
                            result = &mut handle => {
                                if let Err(e) = result {
                                    warn!(worker = index, error = %e, "Worker task ended abnormally");
                                }
                                break;
                            }
                            _ = self.shutdown.triggered() => {
                                deadline = Some(Instant::now() + self.join_timeout);
                            }
                        }
                    }
                    Some(at) => {
                        let remaining = at.saturating_duration_since(Instant::now());
                        match tokio::time::timeout(remaining, &mut handle).await {
                            Ok(Err(e)) => {
                                warn!(worker = index, error = %e, "Worker task ended abnormally");
                                break;
                            }
                            Ok(Ok(())) => break,
                            Err(_) => {
                                warn!(worker = index, "Worker missed the join deadline, aborting");
                                handle.abort();
                                break;
                            }
                        }
                    }
                }
            }
        }

        let end_reason = match self.shutdown.reason() {
            Some(reason) => reason,
            None => {
                // Every worker stopped without triggering shutdown, which
                // only happens when the store refused further claims
                warn!("Pool drained without a shutdown trigger");
                EndReason::FrontierDrained
            }
        };

        CrawlReport::from_counters(end_reason, &self.counters)
    }
}
