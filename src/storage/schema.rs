//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Book-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Books of every collection; `position` is the source order
CREATE TABLE IF NOT EXISTS books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    position INTEGER NOT NULL,
    title TEXT NOT NULL CHECK (length(title) > 0),
    price REAL NOT NULL CHECK (price >= 0),
    availability TEXT NOT NULL,
    in_stock INTEGER NOT NULL,
    rating TEXT NOT NULL,
    detail_url TEXT NOT NULL,
    thumbnail_url TEXT NOT NULL,
    category TEXT NOT NULL,
    UNIQUE(collection, position)
);

CREATE INDEX IF NOT EXISTS idx_books_collection ON books(collection);
CREATE INDEX IF NOT EXISTS idx_books_title ON books(title);
CREATE INDEX IF NOT EXISTS idx_books_price ON books(price);
CREATE INDEX IF NOT EXISTS idx_books_category ON books(category);

-- One row per collection, rewritten by every replacement
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    record_count INTEGER NOT NULL,
    replaced_at TEXT NOT NULL,
    config_hash TEXT
);

-- At most one in-flight crawl per collection
CREATE TABLE IF NOT EXISTS crawl_locks (
    collection TEXT PRIMARY KEY,
    holder TEXT NOT NULL,
    acquired_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
