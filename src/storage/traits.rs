//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::book::{Book, StoredBook};
use crate::storage::{BookPage, BookQuery, CollectionInfo, CollectionStats, ReplaceSummary};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt row {id}: {message}")]
    CorruptRow { id: i64, message: String },

    #[error("Lock on collection '{collection}' is not held by {holder}")]
    LockNotHeld { collection: String, holder: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The crawl core only relies on `replace_collection` and the crawl lock.
/// The read methods exist for the query API and operator tooling.
pub trait Storage {
    // ===== Collection Replacement =====

    /// Replaces the entire content of `collection` with `books`
    ///
    /// Readers observe either the complete old collection or the complete new
    /// one. On error the old collection is left intact.
    ///
    /// # Arguments
    ///
    /// * `collection` - Name of the collection to replace
    /// * `books` - New content, in source order
    /// * `config_hash` - Fingerprint of the configuration that produced `books`
    fn replace_collection(
        &mut self,
        collection: &str,
        books: &[Book],
        config_hash: Option<&str>,
    ) -> StorageResult<ReplaceSummary>;

    // ===== Crawl Lock =====

    /// Tries to take the crawl lock on `collection` for `holder`
    ///
    /// Returns `false` if another holder took it less than `stale_after` ago.
    /// Older locks are considered abandoned and taken over.
    fn acquire_crawl_lock(
        &mut self,
        collection: &str,
        holder: &str,
        stale_after: Duration,
    ) -> StorageResult<bool>;

    /// Releases a lock taken by `holder`
    fn release_crawl_lock(&mut self, collection: &str, holder: &str) -> StorageResult<()>;

    // ===== Reads =====

    /// Loads a whole collection in source order
    fn load_collection(&self, collection: &str) -> StorageResult<Vec<StoredBook>>;

    /// Counts the books in a collection
    fn count_books(&self, collection: &str) -> StorageResult<u64>;

    /// Gets one book by its identifier
    fn get_book(&self, id: i64) -> StorageResult<Option<StoredBook>>;

    /// Filtered, paginated listing of a collection
    fn query_books(&self, collection: &str, query: &BookQuery) -> StorageResult<BookPage>;

    /// Metadata from the last replacement, if the collection was ever written
    fn collection_info(&self, collection: &str) -> StorageResult<Option<CollectionInfo>>;

    // ===== Statistics =====

    /// Aggregate counts for operator output
    fn collection_stats(&self, collection: &str) -> StorageResult<CollectionStats>;
}
