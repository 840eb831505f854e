//! Worker task loop
//!
//! Each worker runs the same cycle: claim one URL, fetch it, extract it,
//! record the outcome, then sleep a jittered delay. Workers never touch a
//! record another worker holds; the store's claim operation is the only
//! arbiter. Failures end the task with a recorded reason, never the loop.

use crate::crawl::jitter::JitterDelay;
use crate::crawl::outcome::{FailureKind, PageArtifact, Recorded, Recorder, TaskOutcome};
use crate::crawl::shutdown::{EndReason, ShutdownCoordinator};
use crate::extract::PageExtractor;
use crate::fetch::Fetcher;
use crate::frontier::{ClaimFilter, FrontierStore, UrlRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Consecutive empty claims before a worker declares the frontier drained
const DRAIN_THRESHOLD: u32 = 3;

/// Shared crawl counters, updated by every worker
#[derive(Debug, Default)]
pub struct CrawlCounters {
    /// Tasks that reached a terminal state
    pub processed: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub not_target: AtomicU64,
    /// Tasks left Claimed because the store could not record their outcome
    pub stuck: AtomicU64,
    /// New frontier records created by link folding
    pub discovered: AtomicU64,
    /// Claims currently held by running tasks
    pub in_flight: AtomicU64,
    /// Budget slots reserved ahead of each claim
    pub budget_taken: AtomicU64,
}

/// Per-worker knobs taken from the crawl configuration
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub fetch_timeout: Duration,
    pub idle_backoff: Duration,
    /// Terminal outcomes across the whole pool before shutdown; 0 is unlimited
    pub url_budget: u64,
    pub baseline_priority: f64,
    pub priority_increment: f64,
}

/// One crawl worker
pub struct Worker<S: FrontierStore> {
    id: usize,
    store: Arc<Mutex<S>>,
    recorder: Recorder<S>,
    fetcher: Box<dyn Fetcher>,
    extractor: Arc<dyn PageExtractor>,
    shutdown: ShutdownCoordinator,
    jitter: JitterDelay,
    filter: ClaimFilter,
    counters: Arc<CrawlCounters>,
    settings: WorkerSettings,
}

impl<S: FrontierStore> Worker<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        store: Arc<Mutex<S>>,
        fetcher: Box<dyn Fetcher>,
        extractor: Arc<dyn PageExtractor>,
        shutdown: ShutdownCoordinator,
        jitter: JitterDelay,
        filter: ClaimFilter,
        counters: Arc<CrawlCounters>,
        settings: WorkerSettings,
    ) -> Self {
        let recorder = Recorder::new(
            Arc::clone(&store),
            settings.baseline_priority,
            settings.priority_increment,
        );
        Self {
            id,
            store,
            recorder,
            fetcher,
            extractor,
            shutdown,
            jitter,
            filter,
            counters,
            settings,
        }
    }

    /// Runs the claim/fetch/extract/record cycle until shutdown or drain
    pub async fn run(mut self) {
        debug!(worker = self.id, "Worker started");
        let mut empty_claims = 0u32;

        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            // A budget slot is reserved before the claim so the pool as a
            // whole can never start more than url_budget tasks, even while
            // other workers are still folding links mid-record
            if self.settings.url_budget > 0 {
                let taken = self.counters.budget_taken.fetch_add(1, Ordering::SeqCst) + 1;
                if taken > self.settings.url_budget {
                    info!(worker = self.id, "URL budget reached");
                    self.shutdown.trigger(EndReason::BudgetExhausted);
                    break;
                }
            }

            // Snapshot taken before the claim: a producer active at this
            // point either still shows in the counter, or has already
            // committed its folded links where the claim below will find
            // them. Either way an empty claim with a zero snapshot means
            // the frontier is genuinely drained.
            let idle_snapshot = self.counters.in_flight.load(Ordering::SeqCst);

            // The in-flight increment happens inside the claim's critical
            // section so an empty claim elsewhere always sees this worker's
            // held record before judging the frontier drained
            let claimed = {
                let mut store = self.store.lock().unwrap();
                let claimed = store.claim(1, &self.filter);
                if matches!(claimed, Ok(ref records) if !records.is_empty()) {
                    self.counters.in_flight.fetch_add(1, Ordering::SeqCst);
                }
                claimed
            };

            let record = match claimed {
                Ok(mut records) => records.pop(),
                Err(e) => {
                    error!(worker = self.id, error = %e, "Claim failed, stopping worker");
                    break;
                }
            };

            let Some(record) = record else {
                // Refund the unused budget slot
                if self.settings.url_budget > 0 {
                    self.counters.budget_taken.fetch_sub(1, Ordering::SeqCst);
                }
                empty_claims += 1;
                if empty_claims >= DRAIN_THRESHOLD && idle_snapshot == 0 {
                    info!(worker = self.id, "No eligible work remains");
                    self.shutdown.trigger(EndReason::FrontierDrained);
                    break;
                }
                tokio::select! {
                    _ = self.shutdown.triggered() => break,
                    _ = tokio::time::sleep(self.settings.idle_backoff) => {}
                }
                continue;
            };
            empty_claims = 0;

            let outcome = self.process(&record).await;
            let recorded = self.record_outcome(&record, outcome);
            self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
            if !recorded {
                continue;
            }

            let processed = self.counters.processed.fetch_add(1, Ordering::SeqCst) + 1;
            if self.settings.url_budget > 0 && processed >= self.settings.url_budget {
                info!(worker = self.id, processed, "URL budget reached");
                self.shutdown.trigger(EndReason::BudgetExhausted);
                break;
            }

            tokio::select! {
                _ = self.shutdown.triggered() => break,
                _ = tokio::time::sleep(self.jitter.sample()) => {}
            }
        }

        debug!(worker = self.id, "Worker stopped");
    }

    /// Fetches and extracts one claimed URL, reducing every error to an outcome
    async fn process(&mut self, record: &UrlRecord) -> TaskOutcome {
        debug!(worker = self.id, url = %record.address, "Fetching");

        let page = match self
            .fetcher
            .fetch(&record.address, self.settings.fetch_timeout)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                return TaskOutcome::Failed {
                    kind: FailureKind::Fetch,
                    reason: e.to_string(),
                }
            }
        };

        match self.extractor.extract(&page) {
            Ok(extraction) if !extraction.is_target => TaskOutcome::NotTarget,
            Ok(extraction) => TaskOutcome::Success(PageArtifact {
                fields: extraction.fields,
                links: extraction.links,
            }),
            Err(e) => TaskOutcome::Failed {
                kind: FailureKind::Extract,
                reason: e.to_string(),
            },
        }
    }

    /// Persists an outcome; returns false if the record was left Claimed
    fn record_outcome(&self, record: &UrlRecord, outcome: TaskOutcome) -> bool {
        match self.recorder.record(record.id, outcome) {
            Ok(Recorded::Success(folds)) => {
                self.counters.succeeded.fetch_add(1, Ordering::SeqCst);
                self.counters
                    .discovered
                    .fetch_add(folds.inserted as u64, Ordering::SeqCst);
                info!(
                    worker = self.id,
                    url = %record.address,
                    new_links = folds.inserted,
                    boosted = folds.boosted,
                    "Saved page"
                );
                true
            }
            Ok(Recorded::Failed) => {
                self.counters.failed.fetch_add(1, Ordering::SeqCst);
                warn!(worker = self.id, url = %record.address, "Task failed");
                true
            }
            Ok(Recorded::NotTarget) => {
                self.counters.not_target.fetch_add(1, Ordering::SeqCst);
                debug!(worker = self.id, url = %record.address, "Not a target page");
                true
            }
            Err(e) => {
                // The record stays Claimed; only the stale-claim pass frees it
                self.counters.stuck.fetch_add(1, Ordering::SeqCst);
                error!(
                    worker = self.id,
                    url = %record.address,
                    error = %e,
                    "Could not record outcome, leaving record claimed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractError, Extraction};
    use crate::fetch::{FetchError, PageHandle};
    use crate::frontier::{SqliteFrontier, UrlState};
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::collections::HashMap;

    enum Script {
        Body(&'static str),
        Timeout,
    }

    struct ScriptedFetcher {
        pages: HashMap<String, Script>,
    }

    impl ScriptedFetcher {
        fn new(pages: Vec<(&str, Script)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(addr, script)| (addr.to_string(), script))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(
            &mut self,
            address: &str,
            _timeout: Duration,
        ) -> Result<PageHandle, FetchError> {
            match self.pages.get(address) {
                Some(Script::Body(body)) => Ok(PageHandle {
                    address: address.to_string(),
                    final_url: address.to_string(),
                    status: 200,
                    body: body.to_string(),
                }),
                Some(Script::Timeout) => Err(FetchError::Timeout),
                None => Err(FetchError::Network("no route".to_string())),
            }
        }
    }

    /// Reads simple body markers instead of real HTML
    struct MarkerExtractor;

    impl PageExtractor for MarkerExtractor {
        fn extract(&self, page: &PageHandle) -> Result<Extraction, ExtractError> {
            if page.body.contains("index page") {
                return Ok(Extraction::not_target());
            }
            if page.body.contains("garbled") {
                return Err(ExtractError::Malformed("unreadable document".to_string()));
            }
            let links = page
                .body
                .lines()
                .filter_map(|line| line.strip_prefix("link "))
                .map(String::from)
                .collect();
            let mut fields = Map::new();
            fields.insert("title".to_string(), json!("A Story"));
            Ok(Extraction {
                fields,
                links,
                is_target: true,
            })
        }
    }

    fn settings(budget: u64) -> WorkerSettings {
        WorkerSettings {
            fetch_timeout: Duration::from_secs(5),
            idle_backoff: Duration::from_millis(5),
            url_budget: budget,
            baseline_priority: 1.0,
            priority_increment: 0.5,
        }
    }

    fn build_worker(
        store: Arc<Mutex<SqliteFrontier>>,
        fetcher: ScriptedFetcher,
        shutdown: ShutdownCoordinator,
        counters: Arc<CrawlCounters>,
        budget: u64,
    ) -> Worker<SqliteFrontier> {
        Worker::new(
            0,
            store,
            Box::new(fetcher),
            Arc::new(MarkerExtractor),
            shutdown,
            JitterDelay::new(0.0, 0.0),
            ClaimFilter::any(),
            counters,
            settings(budget),
        )
    }

    fn seeded_store(addresses: &[&str]) -> Arc<Mutex<SqliteFrontier>> {
        let mut store = SqliteFrontier::new_in_memory().unwrap();
        for address in addresses {
            store.insert_url(address, 1.0, None).unwrap();
        }
        Arc::new(Mutex::new(store))
    }

    #[tokio::test]
    async fn test_success_saves_artifact_and_folds_links() {
        let store = seeded_store(&["https://example.com/story"]);
        let fetcher = ScriptedFetcher::new(vec![(
            "https://example.com/story",
            Script::Body("a story\nlink https://example.com/second"),
        )]);
        let counters = Arc::new(CrawlCounters::default());

        build_worker(
            Arc::clone(&store),
            fetcher,
            ShutdownCoordinator::new(),
            Arc::clone(&counters),
            1,
        )
        .run()
        .await;

        let guard = store.lock().unwrap();
        let record = guard
            .get_url_by_address("https://example.com/story")
            .unwrap()
            .unwrap();
        assert_eq!(record.state, UrlState::Success);
        assert!(guard.artifact_exists(record.id).unwrap());
        let folded = guard
            .get_url_by_address("https://example.com/second")
            .unwrap()
            .unwrap();
        assert_eq!(folded.state, UrlState::Unclaimed);
        assert_eq!(counters.succeeded.load(Ordering::SeqCst), 1);
        assert_eq!(counters.discovered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_records_failure_without_artifact() {
        let store = seeded_store(&["https://example.com/slow"]);
        let fetcher = ScriptedFetcher::new(vec![("https://example.com/slow", Script::Timeout)]);
        let counters = Arc::new(CrawlCounters::default());

        build_worker(
            Arc::clone(&store),
            fetcher,
            ShutdownCoordinator::new(),
            Arc::clone(&counters),
            1,
        )
        .run()
        .await;

        let guard = store.lock().unwrap();
        let record = guard
            .get_url_by_address("https://example.com/slow")
            .unwrap()
            .unwrap();
        assert_eq!(record.state, UrlState::Failed);
        assert_eq!(record.failure_reason.as_deref(), Some("timeout"));
        assert!(!guard.artifact_exists(record.id).unwrap());
        assert_eq!(counters.failed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_target_page_records_no_artifact() {
        let store = seeded_store(&["https://example.com/about"]);
        let fetcher = ScriptedFetcher::new(vec![(
            "https://example.com/about",
            Script::Body("index page"),
        )]);
        let counters = Arc::new(CrawlCounters::default());

        build_worker(
            Arc::clone(&store),
            fetcher,
            ShutdownCoordinator::new(),
            Arc::clone(&counters),
            1,
        )
        .run()
        .await;

        let guard = store.lock().unwrap();
        let record = guard
            .get_url_by_address("https://example.com/about")
            .unwrap()
            .unwrap();
        assert_eq!(record.state, UrlState::NotTarget);
        assert!(!guard.artifact_exists(record.id).unwrap());
        assert_eq!(guard.count_urls().unwrap(), 1);
        assert_eq!(counters.not_target.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extract_failure_records_tagged_reason() {
        let store = seeded_store(&["https://example.com/odd"]);
        let fetcher =
            ScriptedFetcher::new(vec![("https://example.com/odd", Script::Body("garbled"))]);
        let counters = Arc::new(CrawlCounters::default());

        build_worker(
            Arc::clone(&store),
            fetcher,
            ShutdownCoordinator::new(),
            Arc::clone(&counters),
            1,
        )
        .run()
        .await;

        let guard = store.lock().unwrap();
        let record = guard
            .get_url_by_address("https://example.com/odd")
            .unwrap()
            .unwrap();
        assert_eq!(record.state, UrlState::Failed);
        assert_eq!(
            record.failure_reason.as_deref(),
            Some("extract: malformed document: unreadable document")
        );
    }

    #[tokio::test]
    async fn test_budget_stops_worker_with_work_remaining() {
        let store = seeded_store(&["https://example.com/a", "https://example.com/b"]);
        let fetcher = ScriptedFetcher::new(vec![
            ("https://example.com/a", Script::Body("a story")),
            ("https://example.com/b", Script::Body("b story")),
        ]);
        let counters = Arc::new(CrawlCounters::default());
        let shutdown = ShutdownCoordinator::new();

        build_worker(
            Arc::clone(&store),
            fetcher,
            shutdown.clone(),
            Arc::clone(&counters),
            1,
        )
        .run()
        .await;

        assert_eq!(shutdown.reason(), Some(EndReason::BudgetExhausted));
        assert_eq!(counters.processed.load(Ordering::SeqCst), 1);

        // One seed was never claimed
        let guard = store.lock().unwrap();
        let by_state = guard.count_by_state().unwrap();
        assert_eq!(by_state.get(&UrlState::Unclaimed), Some(&1));
    }

    #[tokio::test]
    async fn test_empty_frontier_triggers_drained() {
        let store = seeded_store(&[]);
        let fetcher = ScriptedFetcher::new(vec![]);
        let shutdown = ShutdownCoordinator::new();

        build_worker(
            store,
            fetcher,
            shutdown.clone(),
            Arc::new(CrawlCounters::default()),
            0,
        )
        .run()
        .await;

        assert_eq!(shutdown.reason(), Some(EndReason::FrontierDrained));
    }

    #[tokio::test]
    async fn test_no_claims_after_shutdown() {
        let store = seeded_store(&["https://example.com/a"]);
        let fetcher =
            ScriptedFetcher::new(vec![("https://example.com/a", Script::Body("a story"))]);
        let shutdown = ShutdownCoordinator::new();
        shutdown.trigger(EndReason::Cancelled);

        build_worker(
            Arc::clone(&store),
            fetcher,
            shutdown,
            Arc::new(CrawlCounters::default()),
            0,
        )
        .run()
        .await;

        let guard = store.lock().unwrap();
        let record = guard
            .get_url_by_address("https://example.com/a")
            .unwrap()
            .unwrap();
        assert_eq!(record.state, UrlState::Unclaimed);
    }

    #[tokio::test]
    async fn test_store_error_leaves_record_claimed() {
        let store = seeded_store(&["https://example.com/a"]);
        let (id, recorder) = {
            let mut guard = store.lock().unwrap();
            let id = guard.claim(1, &ClaimFilter::any()).unwrap()[0].id;
            (id, Recorder::new(Arc::clone(&store), 1.0, 0.5))
        };
        // Terminate it out from under the recorder so a second terminal
        // transition is rejected by the store
        store
            .lock()
            .unwrap()
            .update_status(id, UrlState::Success, None)
            .unwrap();

        let result = recorder.record(
            id,
            TaskOutcome::Failed {
                kind: FailureKind::Fetch,
                reason: "timeout".to_string(),
            },
        );
        assert!(result.is_err());

        let guard = store.lock().unwrap();
        assert_eq!(guard.get_url(id).unwrap().state, UrlState::Success);
    }
}
