//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::book::{Book, Rating, StoredBook};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{BookPage, BookQuery, CollectionInfo, CollectionStats, ReplaceSummary};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use url::Url;

const BOOK_COLUMNS: &str =
    "id, title, price, availability, rating, detail_url, thumbnail_url, category";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Closes the connection, reporting any error SQLite raises on close
    pub fn close(self) -> StorageResult<()> {
        self.conn.close().map_err(|(_, e)| StorageError::Sqlite(e))
    }

    #[cfg(test)]
    fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Raw column values of one `books` row
struct BookRow {
    id: i64,
    title: String,
    price: f64,
    availability: String,
    rating: String,
    detail_url: String,
    thumbnail_url: String,
    category: String,
}

impl BookRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            price: row.get(2)?,
            availability: row.get(3)?,
            rating: row.get(4)?,
            detail_url: row.get(5)?,
            thumbnail_url: row.get(6)?,
            category: row.get(7)?,
        })
    }

    /// Rebuilds the domain value; `in_stock` is derived again from availability
    fn into_stored(self) -> StorageResult<StoredBook> {
        let id = self.id;
        let corrupt = |message: String| StorageError::CorruptRow { id, message };

        let rating = Rating::from_db_string(&self.rating)
            .ok_or_else(|| corrupt(format!("unknown rating '{}'", self.rating)))?;
        let detail_url = Url::parse(&self.detail_url)
            .map_err(|e| corrupt(format!("detail url: {}", e)))?;
        let thumbnail_url = Url::parse(&self.thumbnail_url)
            .map_err(|e| corrupt(format!("thumbnail url: {}", e)))?;

        let book = Book::new(
            self.title,
            self.price,
            self.availability,
            rating,
            detail_url,
            thumbnail_url,
            self.category,
        )
        .map_err(|e| corrupt(e.to_string()))?;

        Ok(StoredBook { id, book })
    }
}

fn collect_books(rows: Vec<BookRow>) -> StorageResult<Vec<StoredBook>> {
    rows.into_iter().map(BookRow::into_stored).collect()
}

/// WHERE clause and bind values for a `BookQuery`
fn query_filter(collection: &str, query: &BookQuery) -> (String, Vec<Value>) {
    let mut clauses = vec!["collection = ?".to_string()];
    let mut values = vec![Value::Text(collection.to_string())];

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        clauses.push("LOWER(title) LIKE ?".to_string());
        values.push(Value::Text(format!("%{}%", search.trim().to_lowercase())));
    }
    if let Some(category) = query.category.as_deref().filter(|s| !s.trim().is_empty()) {
        clauses.push("LOWER(category) = LOWER(?)".to_string());
        values.push(Value::Text(category.trim().to_string()));
    }
    if let Some(rating) = query.rating {
        clauses.push("rating = ?".to_string());
        values.push(Value::Text(rating.to_db_string().to_string()));
    }
    if let Some(min) = query.min_price {
        clauses.push("price >= ?".to_string());
        values.push(Value::Real(min));
    }
    if let Some(max) = query.max_price {
        clauses.push("price <= ?".to_string());
        values.push(Value::Real(max));
    }
    if let Some(in_stock) = query.in_stock {
        clauses.push("in_stock = ?".to_string());
        values.push(Value::Integer(i64::from(in_stock)));
    }

    (clauses.join(" AND "), values)
}

impl Storage for SqliteStorage {
    // ===== Collection Replacement =====

    fn replace_collection(
        &mut self,
        collection: &str,
        books: &[Book],
        config_hash: Option<&str>,
    ) -> StorageResult<ReplaceSummary> {
        // Dropping `tx` without commit rolls everything back
        let tx = self.conn.transaction()?;

        let previous_count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM books WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;

        tx.execute("DELETE FROM books WHERE collection = ?1", params![collection])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO books (collection, position, title, price, availability, in_stock,
                 rating, detail_url, thumbnail_url, category)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (position, book) in books.iter().enumerate() {
                stmt.execute(params![
                    collection,
                    position as i64,
                    book.title(),
                    book.price(),
                    book.availability(),
                    book.in_stock(),
                    book.rating().to_db_string(),
                    book.detail_url().as_str(),
                    book.thumbnail_url().as_str(),
                    book.category(),
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO collections (name, record_count, replaced_at, config_hash)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                record_count = excluded.record_count,
                replaced_at = excluded.replaced_at,
                config_hash = excluded.config_hash",
            params![
                collection,
                books.len() as i64,
                Utc::now().to_rfc3339(),
                config_hash
            ],
        )?;

        tx.commit()?;

        Ok(ReplaceSummary {
            previous_count: previous_count as u64,
            inserted: books.len() as u64,
        })
    }

    // ===== Crawl Lock =====

    fn acquire_crawl_lock(
        &mut self,
        collection: &str,
        holder: &str,
        stale_after: Duration,
    ) -> StorageResult<bool> {
        let tx = self.conn.transaction()?;
        let now = Utc::now();

        let existing: Option<(String, String)> = tx
            .query_row(
                "SELECT holder, acquired_at FROM crawl_locks WHERE collection = ?1",
                params![collection],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((current, acquired_at)) = existing {
            let stale = match DateTime::parse_from_rfc3339(&acquired_at) {
                Ok(at) => (now - at.with_timezone(&Utc))
                    .to_std()
                    .map(|age| age >= stale_after)
                    .unwrap_or(false),
                // An unreadable timestamp cannot prove the lock is alive
                Err(_) => true,
            };

            if current != holder && !stale {
                return Ok(false);
            }
            if current != holder {
                tracing::warn!(
                    "Taking over stale crawl lock on '{}' from {} (acquired {})",
                    collection,
                    current,
                    acquired_at
                );
            }
        }

        tx.execute(
            "INSERT INTO crawl_locks (collection, holder, acquired_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(collection) DO UPDATE SET
                holder = excluded.holder,
                acquired_at = excluded.acquired_at",
            params![collection, holder, now.to_rfc3339()],
        )?;
        tx.commit()?;

        Ok(true)
    }

    fn release_crawl_lock(&mut self, collection: &str, holder: &str) -> StorageResult<()> {
        let deleted = self.conn.execute(
            "DELETE FROM crawl_locks WHERE collection = ?1 AND holder = ?2",
            params![collection, holder],
        )?;
        if deleted == 0 {
            return Err(StorageError::LockNotHeld {
                collection: collection.to_string(),
                holder: holder.to_string(),
            });
        }
        Ok(())
    }

    // ===== Reads =====

    fn load_collection(&self, collection: &str) -> StorageResult<Vec<StoredBook>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM books WHERE collection = ?1 ORDER BY position",
            BOOK_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![collection], BookRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        collect_books(rows)
    }

    fn count_books(&self, collection: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM books WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn get_book(&self, id: i64) -> StorageResult<Option<StoredBook>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM books WHERE id = ?1", BOOK_COLUMNS),
                params![id],
                BookRow::from_row,
            )
            .optional()?;
        row.map(BookRow::into_stored).transpose()
    }

    fn query_books(&self, collection: &str, query: &BookQuery) -> StorageResult<BookPage> {
        let (filter, mut values) = query_filter(collection, query);

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM books WHERE {}", filter),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let page = query.page.max(1);
        let limit = query.limit.max(1);
        let offset = u64::from(page - 1) * u64::from(limit);
        values.push(Value::Integer(i64::from(limit)));
        values.push(Value::Integer(offset as i64));

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM books WHERE {} ORDER BY position LIMIT ? OFFSET ?",
            BOOK_COLUMNS, filter
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), BookRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BookPage::new(collect_books(rows)?, total as u64, page, limit))
    }

    fn collection_info(&self, collection: &str) -> StorageResult<Option<CollectionInfo>> {
        let row: Option<(String, i64, String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT name, record_count, replaced_at, config_hash FROM collections WHERE name = ?1",
                params![collection],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        row.map(|(name, record_count, replaced_at, config_hash)| -> StorageResult<CollectionInfo> {
            let replaced_at = DateTime::parse_from_rfc3339(&replaced_at)
                .map_err(|e| StorageError::Database(format!("bad replaced_at for '{}': {}", name, e)))?
                .with_timezone(&Utc);
            Ok(CollectionInfo {
                name,
                record_count: record_count as u64,
                replaced_at,
                config_hash,
            })
        })
        .transpose()
    }

    // ===== Statistics =====

    fn collection_stats(&self, collection: &str) -> StorageResult<CollectionStats> {
        let (total, in_stock): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(in_stock), 0) FROM books WHERE collection = ?1",
            params![collection],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) FROM books WHERE collection = ?1
             GROUP BY category ORDER BY COUNT(*) DESC, category ASC",
        )?;
        let by_category = stmt
            .query_map(params![collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT rating, COUNT(*) FROM books WHERE collection = ?1 GROUP BY rating",
        )?;
        let rating_counts = stmt
            .query_map(params![collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let by_rating = Rating::all()
            .into_iter()
            .filter_map(|rating| {
                rating_counts
                    .iter()
                    .find(|(name, _)| name == rating.to_db_string())
                    .map(|(_, count)| (rating, *count))
            })
            .collect();

        Ok(CollectionStats {
            total: total as u64,
            in_stock: in_stock as u64,
            by_category,
            by_rating,
        })
    }
}
