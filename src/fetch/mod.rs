//! Fetcher collaborator interface
//!
//! A Fetcher loads one address and hands back a page handle, or a classified
//! fetch error. Each worker owns its fetcher exclusively; the trait takes
//! `&mut self` so implementations may keep per-worker session state.

mod http;

pub use http::HttpFetcher;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// A fetched page, ready for extraction
#[derive(Debug, Clone)]
pub struct PageHandle {
    /// The address that was requested
    pub address: String,

    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status: u16,

    /// Page body
    pub body: String,
}

/// Classified fetch failures
///
/// The Display form of each variant is recorded verbatim as the URL's
/// failure reason, so the wording is part of the store's contract.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timeout")]
    Timeout,

    #[error("network: {0}")]
    Network(String),

    #[error("blocked: HTTP {0}")]
    Blocked(u16),
}

#[async_trait]
pub trait Fetcher: Send {
    /// Loads the given address within the timeout
    async fn fetch(&mut self, address: &str, timeout: Duration)
        -> Result<PageHandle, FetchError>;
}
