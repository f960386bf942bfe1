use log::info;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use lotfolio_core::errors::{DatabaseError, Result};

const SCHEMA: &str = include_str!("schema.sql");

/// Shared handle to one SQLite database.
///
/// SQLite serializes writers anyway, so a single mutex-guarded connection
/// keeps transactional code simple. Repositories clone the `Arc` and take
/// the lock per call.
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Opens (creating if needed) the database at `path` and applies the
    /// schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        info!("Opened database at {}", path.as_ref().display());
        Self::init(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Arc<Self>> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Arc<Self>> {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        Ok(Arc::new(SqliteDb {
            conn: Mutex::new(conn),
        }))
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()).into())
    }
}
