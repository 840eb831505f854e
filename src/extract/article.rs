//! Default article extractor
//!
//! Pulls article metadata from the page's JSON-LD block with element-level
//! fallbacks, collects body text and tags, and extracts in-origin links for
//! folding. Pages without an article shape are reported as non-targets.

use crate::extract::{ExtractError, Extraction, PageExtractor};
use crate::fetch::PageHandle;
use scraper::{Html, Selector};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use url::Url;

/// Query parameters stripped during link normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "source",
];

/// Extractor for a single publishing site
///
/// Only links on the configured origin host are reported, so off-site
/// addresses never reach the frontier.
pub struct ArticleExtractor {
    origin_host: String,
}

impl ArticleExtractor {
    pub fn new(origin: &Url) -> Self {
        Self {
            origin_host: origin.host_str().unwrap_or_default().to_string(),
        }
    }

    /// Reads the first JSON-LD script block, if it parses
    fn json_ld(document: &Html) -> Option<Value> {
        let selector = sel("script[type='application/ld+json']")?;
        let script = document.select(&selector).next()?;
        serde_json::from_str(&script.text().collect::<String>()).ok()
    }

    fn metadata_fields(document: &Html, fields: &mut Map<String, Value>) -> bool {
        let mut saw_article_type = false;

        if let Some(ld) = Self::json_ld(document) {
            if let Some(kind) = ld.get("@type").and_then(Value::as_str) {
                saw_article_type = kind.contains("Article") || kind.contains("Posting");
            }
            if let Some(headline) = ld.get("headline").and_then(Value::as_str) {
                fields.insert("title".to_string(), json!(headline));
            }
            if let Some(author) = ld
                .get("author")
                .and_then(|a| a.get("name"))
                .and_then(Value::as_str)
            {
                fields.insert("author".to_string(), json!(author));
            }
            if let Some(published) = ld.get("datePublished").and_then(Value::as_str) {
                fields.insert("published".to_string(), json!(published));
            }
            if let Some(modified) = ld.get("dateModified").and_then(Value::as_str) {
                fields.insert("modified".to_string(), json!(modified));
            }
            if let Some(description) = ld.get("description").and_then(Value::as_str) {
                fields.insert("description".to_string(), json!(description));
            }
            if let Some(publisher) = ld
                .get("publisher")
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
            {
                fields.insert("publisher".to_string(), json!(publisher));
            }

            let access = match ld.get("isAccessibleForFree").and_then(Value::as_bool) {
                Some(true) => "public",
                Some(false) => "member-only",
                None => "public",
            };
            fields.insert("access".to_string(), json!(access));
        }

        // Paywall markers override the JSON-LD access hint
        if element_exists(document, "div[aria-label='Post Preview']") {
            fields.insert("access".to_string(), json!("member-only"));
        }
        if element_exists(document, "div.paywall-upsell-container") {
            fields.insert("access".to_string(), json!("paid"));
        }

        if let Some(selector) = sel("div.pw-multi-vote-count p") {
            if let Some(claps) = document.select(&selector).next() {
                let text = claps.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    fields.insert("claps".to_string(), json!(text));
                }
            }
        }

        if let Some(selector) = sel("a[href*='/tag/']") {
            let tags: Vec<String> = document
                .select(&selector)
                .map(|tag| tag.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if !tags.is_empty() {
                fields.insert("tags".to_string(), json!(tags));
            }
        }

        saw_article_type
    }

    /// Collects article body text, preferring marked paragraphs
    fn body_text(document: &Html) -> String {
        let marked = sel("article p[data-selectable-paragraph]");
        let generic = sel("article p");

        let mut parts: Vec<String> = Vec::new();
        if let Some(selector) = marked {
            parts = document
                .select(&selector)
                .map(|p| p.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if parts.is_empty() {
            if let Some(selector) = generic {
                parts = document
                    .select(&selector)
                    .map(|p| p.text().collect::<String>().trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
        }

        parts.join("\n")
    }

    /// Extracts, resolves, and normalizes in-origin links
    fn links(&self, document: &Html, base: &Url) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        let selector = match sel("a[href]") {
            Some(s) => s,
            None => return links,
        };

        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            let href = match element.value().attr("href") {
                Some(h) => h,
                None => continue,
            };
            if let Some(address) = self.resolve_link(href, base) {
                if seen.insert(address.clone()) {
                    links.push(address);
                }
            }
        }

        links
    }

    /// Resolves one href against the base URL
    ///
    /// Returns None for non-http(s) schemes, off-origin hosts, and anything
    /// that fails to parse. Fragments and tracking parameters are dropped so
    /// folded addresses dedup on URL identity.
    fn resolve_link(&self, href: &str, base: &Url) -> Option<String> {
        let trimmed = href.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        let mut url = base.join(trimmed).ok()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return None;
        }
        if url.host_str() != Some(self.origin_host.as_str()) {
            return None;
        }

        url.set_fragment(None);
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            let query = kept
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }

        Some(url.to_string())
    }
}

impl PageExtractor for ArticleExtractor {
    fn extract(&self, page: &PageHandle) -> Result<Extraction, ExtractError> {
        let base = Url::parse(&page.final_url)
            .map_err(|e| ExtractError::Malformed(format!("bad final url: {}", e)))?;

        let document = Html::parse_document(&page.body);

        let mut fields = Map::new();
        let saw_article_type = Self::metadata_fields(&document, &mut fields);
        let body = Self::body_text(&document);

        let is_target = saw_article_type || !body.is_empty();
        if !is_target {
            return Ok(Extraction::not_target());
        }

        if !body.is_empty() {
            fields.insert("body_text".to_string(), json!(body));
        }
        if !fields.contains_key("title") {
            return Err(ExtractError::Metadata(
                "article page without a headline".to_string(),
            ));
        }

        let links = self.links(&document, &base);

        Ok(Extraction {
            fields,
            links,
            is_target: true,
        })
    }
}

fn sel(selector: &str) -> Option<Selector> {
    Selector::parse(selector).ok()
}

fn element_exists(document: &Html, selector: &str) -> bool {
    sel(selector)
        .map(|s| document.select(&s).next().is_some())
        .unwrap_or(false)
}
