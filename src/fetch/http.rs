//! HTTP fetcher implementation
//!
//! Wraps a reqwest client. The per-fetch timeout is enforced here rather
//! than on the client so a single fetcher can serve differently configured
//! calls, and so an elapsed budget always classifies as `FetchError::Timeout`.

use crate::config::UserAgentConfig;
use crate::fetch::{FetchError, Fetcher, PageHandle};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// HTTP status codes treated as the target site refusing us
const BLOCKED_STATUSES: &[u16] = &[403, 429];

/// Reqwest-backed fetcher; one instance per worker
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher with its own connection pool
    pub fn new(user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &mut self,
        address: &str,
        timeout: Duration,
    ) -> Result<PageHandle, FetchError> {
        let request = self.client.get(address).send();

        let response = match tokio::time::timeout(timeout, request).await {
            Err(_) => return Err(FetchError::Timeout),
            Ok(Err(e)) if e.is_timeout() => return Err(FetchError::Timeout),
            Ok(Err(e)) => return Err(FetchError::Network(e.to_string())),
            Ok(Ok(response)) => response,
        };

        let status = response.status().as_u16();
        if BLOCKED_STATUSES.contains(&status) {
            return Err(FetchError::Blocked(status));
        }
        if !response.status().is_success() {
            return Err(FetchError::Network(format!("HTTP {}", status)));
        }

        let final_url = response.url().to_string();
        let body = match tokio::time::timeout(timeout, response.text()).await {
            Err(_) => return Err(FetchError::Timeout),
            Ok(Err(e)) if e.is_timeout() => return Err(FetchError::Timeout),
            Ok(Err(e)) => return Err(FetchError::Network(e.to_string())),
            Ok(Ok(body)) => body,
        };

        Ok(PageHandle {
            address: address.to_string(),
            final_url,
            status,
            body,
        })
    }
}
