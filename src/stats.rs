//! Statistics generation from the frontier database
//!
//! This module provides functionality for extracting and displaying
//! frontier statistics from the store.

use crate::frontier::{FrontierStore, UrlState};
use crate::Result;
use std::collections::HashMap;

/// Frontier statistics summary
#[derive(Debug, Clone)]
pub struct FrontierStatistics {
    /// Total number of URL records
    pub total_urls: u64,

    /// Count of URLs by state
    pub urls_by_state: HashMap<UrlState, u64>,

    /// Total number of saved artifacts
    pub total_artifacts: u64,
}

/// Loads statistics from the frontier store
///
/// # Arguments
///
/// * `store` - The frontier store to query
///
/// # Returns
///
/// * `Ok(FrontierStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(store: &dyn FrontierStore) -> Result<FrontierStatistics> {
    let total_urls = store.count_urls()?;
    let urls_by_state = store.count_by_state()?;
    let total_artifacts = store.count_artifacts()?;

    Ok(FrontierStatistics {
        total_urls,
        urls_by_state,
        total_artifacts,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &FrontierStatistics) {
    println!("=== Frontier Statistics ===\n");

    println!("Overview:");
    println!("  Total URLs known: {}", stats.total_urls);
    println!("  Artifacts saved: {}", stats.total_artifacts);
    println!();

    println!("URLs by State:");
    for state in UrlState::all_states() {
        let count = stats.urls_by_state.get(&state).copied().unwrap_or(0);
        let percentage = if stats.total_urls > 0 {
            (count as f64 / stats.total_urls as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
}
