//! Crawl orchestration
//!
//! Wires the frontier, fetchers, extractor, and shutdown coordinator into
//! a worker pool and runs one crawl to completion.

mod jitter;
mod outcome;
mod pool;
mod shutdown;
mod worker;

pub use jitter::JitterDelay;
pub use outcome::{FailureKind, PageArtifact, Recorded, Recorder, TaskOutcome};
pub use pool::{CrawlPool, CrawlReport};
pub use shutdown::{EndReason, ShutdownCoordinator};
pub use worker::{CrawlCounters, Worker, WorkerSettings};

use crate::config::Config;
use crate::extract::{ArticleExtractor, PageExtractor};
use crate::fetch::HttpFetcher;
use crate::frontier::{ClaimFilter, FrontierStore, RunStatus, SqliteFrontier};
use crate::{ConfigError, HarvestError, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use url::Url;

/// Runs one crawl with the given configuration
///
/// Opens the frontier database, records a run row, seeds the configured
/// URLs, spawns the worker pool, and waits for it to finish. Errors here
/// are fatal setup problems; once workers are running, individual task
/// failures are recorded in the frontier instead of surfacing.
pub async fn run_crawl(config: Config, config_hash: &str) -> Result<CrawlReport> {
    // The extractor restricts folded links to one host; take it from the
    // origin filter when set, otherwise from the first seed
    let origin_source = config
        .crawler
        .origin_filter
        .as_deref()
        .or_else(|| config.seed_urls.first().map(String::as_str))
        .ok_or_else(|| {
            HarvestError::Config(ConfigError::Validation(
                "no seed URLs and no origin filter configured".to_string(),
            ))
        })?;
    let origin = Url::parse(origin_source)?;
    let extractor: Arc<dyn PageExtractor> = Arc::new(ArticleExtractor::new(&origin));

    let filter = match &config.crawler.origin_filter {
        Some(prefix) => ClaimFilter::with_prefix(prefix.clone()),
        None => ClaimFilter::any(),
    };

    let mut fetchers = Vec::with_capacity(config.crawler.worker_count as usize);
    for _ in 0..config.crawler.worker_count {
        fetchers.push(HttpFetcher::new(&config.user_agent)?);
    }

    let frontier = SqliteFrontier::new(Path::new(&config.frontier.database_path))?;
    let store = Arc::new(Mutex::new(frontier));

    let run_id = {
        let mut guard = store.lock().unwrap();
        let run_id = guard.create_run(config_hash)?;
        for seed in &config.seed_urls {
            if let Err(e) = guard.insert_url(seed, config.frontier.baseline_priority, None) {
                guard.finish_run(run_id, RunStatus::Failed)?;
                return Err(e.into());
            }
        }
        run_id
    };

    let shutdown = ShutdownCoordinator::new();
    shutdown.listen_for_interrupt();

    let jitter = JitterDelay::new(
        config.crawler.avg_delay_seconds,
        config.crawler.min_delay_seconds,
    );
    let settings = WorkerSettings {
        fetch_timeout: Duration::from_secs(config.crawler.fetch_timeout_seconds),
        idle_backoff: Duration::from_secs(config.crawler.idle_backoff_seconds),
        url_budget: config.crawler.url_budget,
        baseline_priority: config.frontier.baseline_priority,
        priority_increment: config.frontier.priority_increment,
    };

    let mut pool = CrawlPool::new(
        shutdown.clone(),
        Duration::from_secs(config.crawler.join_timeout_seconds),
    );
    for (id, fetcher) in fetchers.into_iter().enumerate() {
        let worker = Worker::new(
            id,
            Arc::clone(&store),
            Box::new(fetcher),
            Arc::clone(&extractor),
            shutdown.clone(),
            jitter,
            filter.clone(),
            pool.counters(),
            settings,
        );
        pool.spawn_worker(worker);
    }

    info!(
        run_id,
        workers = config.crawler.worker_count,
        seeds = config.seed_urls.len(),
        "Crawl started"
    );

    let report = pool.join().await;

    let status = match report.end_reason {
        EndReason::Cancelled => RunStatus::Cancelled,
        EndReason::BudgetExhausted | EndReason::FrontierDrained => RunStatus::Completed,
    };
    {
        let mut guard = store.lock().unwrap();
        guard.finish_run(run_id, status)?;
    }

    info!(
        run_id,
        reason = ?report.end_reason,
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failed,
        not_target = report.not_target,
        discovered = report.discovered,
        "Crawl finished"
    );

    Ok(report)
}
