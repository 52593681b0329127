//! Storage module for persisting book collections
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Atomic full replacement of a named collection
//! - The per-collection crawl lock
//! - The read-side queries the book API depends on

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::book::{Rating, StoredBook};
use chrono::{DateTime, Utc};

/// Default page size for `query_books`
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Outcome of a committed collection replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Rows the collection held before the replacement
    pub previous_count: u64,

    /// Rows it holds now
    pub inserted: u64,
}

/// Metadata recorded for each collection on every replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub record_count: u64,
    pub replaced_at: DateTime<Utc>,
    pub config_hash: Option<String>,
}

/// Filters and pagination for `query_books`
///
/// Every filter is optional; an empty query returns the first page of the
/// whole collection in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct BookQuery {
    /// Case-insensitive substring of the title
    pub search: Option<String>,

    /// Case-insensitive exact category
    pub category: Option<String>,

    pub rating: Option<Rating>,

    /// Inclusive lower price bound
    pub min_price: Option<f64>,

    /// Inclusive upper price bound
    pub max_price: Option<f64>,

    pub in_stock: Option<bool>,

    /// 1-based page number
    pub page: u32,

    /// Page size
    pub limit: u32,
}

impl Default for BookQuery {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            rating: None,
            min_price: None,
            max_price: None,
            in_stock: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of query results plus the total match count
#[derive(Debug, Clone, PartialEq)]
pub struct BookPage {
    pub books: Vec<StoredBook>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u64,
}

impl BookPage {
    pub(crate) fn new(books: Vec<StoredBook>, total: u64, page: u32, limit: u32) -> Self {
        let limit = u64::from(limit.max(1));
        Self {
            books,
            total,
            page,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

/// Aggregate counts over one collection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionStats {
    pub total: u64,
    pub in_stock: u64,
    /// (category, count), largest first
    pub by_category: Vec<(String, u64)>,
    /// (rating, count) in lexicon order
    pub by_rating: Vec<(Rating, u64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query() {
        let query = BookQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_PAGE_SIZE);
        assert!(query.search.is_none());
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(BookPage::new(vec![], 25, 1, 12).total_pages, 3);
        assert_eq!(BookPage::new(vec![], 24, 1, 12).total_pages, 2);
        assert_eq!(BookPage::new(vec![], 0, 1, 12).total_pages, 0);
    }
}
