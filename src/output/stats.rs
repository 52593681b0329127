//! Statistics generation from the book database
//!
//! This module provides functionality for extracting and displaying
//! statistics about a stored collection.

use crate::storage::{CollectionInfo, CollectionStats, Storage};
use crate::HarvestError;

/// Statistics about one stored collection
#[derive(Debug, Clone)]
pub struct CollectionStatistics {
    /// Collection name
    pub collection: String,

    /// Metadata from the last replacement; `None` if never written
    pub info: Option<CollectionInfo>,

    /// Aggregate counts over the stored books
    pub stats: CollectionStats,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `collection` - Collection to summarize
///
/// # Returns
///
/// * `Ok(CollectionStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn Storage,
    collection: &str,
) -> Result<CollectionStatistics, HarvestError> {
    Ok(CollectionStatistics {
        collection: collection.to_string(),
        info: storage.collection_info(collection)?,
        stats: storage.collection_stats(collection)?,
    })
}

/// Formats collection statistics as plain text
pub fn format_statistics(statistics: &CollectionStatistics) -> String {
    let stats = &statistics.stats;
    let mut out = String::new();

    out.push_str(&format!("=== Collection '{}' ===\n\n", statistics.collection));

    match &statistics.info {
        Some(info) => {
            out.push_str(&format!("Last replaced: {}\n", info.replaced_at.to_rfc3339()));
            if let Some(hash) = &info.config_hash {
                out.push_str(&format!("Config hash: {}\n", hash));
            }
        }
        None => {
            out.push_str("Never written by a crawl\n");
        }
    }
    out.push('\n');

    out.push_str("Overview:\n");
    out.push_str(&format!("  Total books: {}\n", stats.total));
    let in_stock_pct = if stats.total > 0 {
        (stats.in_stock as f64 / stats.total as f64) * 100.0
    } else {
        0.0
    };
    out.push_str(&format!("  In stock: {} ({:.1}%)\n", stats.in_stock, in_stock_pct));
    out.push('\n');

    if !stats.by_rating.is_empty() {
        out.push_str("Books by Rating:\n");
        for (rating, count) in &stats.by_rating {
            out.push_str(&format!("  {}: {}\n", rating, count));
        }
        out.push('\n');
    }

    if !stats.by_category.is_empty() {
        out.push_str(&format!("Books by Category ({}):\n", stats.by_category.len()));
        for (category, count) in &stats.by_category {
            out.push_str(&format!("  {}: {}\n", category, count));
        }
    }

    out
}

/// Prints collection statistics to stdout
///
/// # Arguments
///
/// * `statistics` - The statistics to display
pub fn print_statistics(statistics: &CollectionStatistics) {
    print!("{}", format_statistics(statistics));
}
