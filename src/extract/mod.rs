//! PageExtractor collaborator interface
//!
//! An extractor turns a fetched page into structured fields plus the
//! outbound links discovered on it. All site-specific markup knowledge
//! lives behind this trait; the crawl core only sees the typed result.

mod article;

pub use article::ArticleExtractor;

use crate::fetch::PageHandle;
use serde_json::Map;
use thiserror::Error;

/// Structured result of extracting one page
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Extracted field values, keyed by field name
    pub fields: Map<String, serde_json::Value>,

    /// Outbound addresses discovered on the page, already normalized
    pub links: Vec<String>,

    /// False when the page is verified not to be a content page
    pub is_target: bool,
}

impl Extraction {
    /// An empty non-target result
    pub fn not_target() -> Self {
        Self {
            fields: Map::new(),
            links: Vec::new(),
            is_target: false,
        }
    }
}

/// Errors raised when a page has an unexpected shape
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("metadata block unreadable: {0}")]
    Metadata(String),
}

/// Trait for page extractors
///
/// Extraction is pure CPU work on an already-fetched body, so the trait is
/// synchronous and implementations must be shareable across workers.
pub trait PageExtractor: Send + Sync {
    fn extract(&self, page: &PageHandle) -> Result<Extraction, ExtractError>;
}
