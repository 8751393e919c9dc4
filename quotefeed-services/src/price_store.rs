//! Persisted price fallback store
//!
//! SQLite-backed last-known-good quote payloads, keyed by the serialized
//! query. Read when the cache is stale and the live fetch fails; written by
//! the broadcast path after every fresh fetch.

use std::path::Path;
use std::sync::Mutex;

use quotefeed_core::PriceQuery;
use rusqlite::{params, Connection, OptionalExtension};

/// Fallback store using SQLite, last-write-wins per query
pub struct PriceStore {
    conn: Mutex<Connection>,
}

impl PriceStore {
    /// Create a new PriceStore instance
    ///
    /// Creates the database file and tables if they don't exist.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, PriceStoreError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PriceStoreError::Io(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path).map_err(PriceStoreError::Database)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Create an in-memory PriceStore (useful for testing)
    pub fn new_in_memory() -> Result<Self, PriceStoreError> {
        let conn = Connection::open_in_memory().map_err(PriceStoreError::Database)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<(), PriceStoreError> {
        let conn = self.conn.lock().map_err(|_| PriceStoreError::LockError)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS prices (
                fsyms TEXT NOT NULL,
                tsyms TEXT NOT NULL,
                data BLOB NOT NULL,
                updated_at INTEGER DEFAULT (strftime('%s', 'now')),
                PRIMARY KEY (fsyms, tsyms)
            );
            "#,
        )
        .map_err(PriceStoreError::Database)?;

        Ok(())
    }

    /// Last stored payload for this query, if any
    pub fn find_by_query(&self, query: &PriceQuery) -> Result<Option<Vec<u8>>, PriceStoreError> {
        let conn = self.conn.lock().map_err(|_| PriceStoreError::LockError)?;

        let (fsyms, tsyms) = query.store_key();

        let data = conn
            .query_row(
                "SELECT data FROM prices WHERE fsyms = ?1 AND tsyms = ?2",
                params![fsyms, tsyms],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
            .map_err(PriceStoreError::Database)?;

        Ok(data)
    }

    /// Store the latest payload for this query, last write wins
    pub fn upsert(&self, query: &PriceQuery, payload: &[u8]) -> Result<(), PriceStoreError> {
        let conn = self.conn.lock().map_err(|_| PriceStoreError::LockError)?;

        let (fsyms, tsyms) = query.store_key();

        conn.execute(
            r#"
            INSERT INTO prices (fsyms, tsyms, data, updated_at)
            VALUES (?1, ?2, ?3, strftime('%s', 'now'))
            ON CONFLICT (fsyms, tsyms) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
            params![fsyms, tsyms, payload],
        )
        .map_err(PriceStoreError::Database)?;

        Ok(())
    }
}

/// Errors that can occur during fallback store operations
#[derive(Debug, thiserror::Error)]
pub enum PriceStoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to acquire lock")]
    LockError,
}
