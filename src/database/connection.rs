/*!
 * Database connection management.
 *
 * This module handles SQLite connection creation and optional bootstrap of
 * the catalog tables, and hands the shared connection to one operation at a
 * time.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value, ValueRef};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::schema::{self, SchemaVersion};
use crate::app_config::DatabaseConfig;
use crate::file_utils::FileManager;

/// SQL function folding text to lower case with full Unicode rules.
///
/// SQLite's built-in `LOWER()` only folds ASCII letters.
pub const UNICODE_LOWER: &str = "unicode_lower";

/// Database connection wrapper with thread-safe access
#[derive(Clone)]
pub struct DatabaseConnection {
    /// Path to the database file
    db_path: PathBuf,
    /// Thread-safe connection wrapped in Arc<Mutex>
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the database described by the configuration
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::open(
            &config.path,
            config.create_missing_tables,
            Duration::from_millis(config.busy_timeout_ms),
        )
    }

    /// Open a database at the specified path, creating missing catalog tables
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::from_config(&DatabaseConfig {
            path: db_path.as_ref().to_path_buf(),
            ..DatabaseConfig::default()
        })
    }

    fn open(db_path: &Path, create_missing_tables: bool, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            FileManager::ensure_dir(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening catalog database at: {:?}", db_path);

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        conn.busy_timeout(busy_timeout)
            .context("Failed to set busy timeout")?;

        if create_missing_tables {
            schema::initialize_schema(&conn, SchemaVersion::LATEST)?;
        }

        Self::from_connection(conn, db_path.to_path_buf())
    }

    /// Create an in-memory database with the latest layout (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Self::new_in_memory_with(SchemaVersion::LATEST)
    }

    /// Create an in-memory database with the given layout
    pub fn new_in_memory_with(version: SchemaVersion) -> Result<Self> {
        debug!("Creating in-memory catalog database ({} layout)", version);

        let conn =
            Connection::open_in_memory().context("Failed to create in-memory database")?;
        schema::initialize_schema(&conn, version)?;

        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    /// Wrap an already opened connection, leaving its tables untouched
    pub fn from_connection(conn: Connection, db_path: PathBuf) -> Result<Self> {
        register_functions(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Execute a database operation with the connection
    ///
    /// The lock is held for the closure's duration and released on every exit
    /// path, including errors.
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .connection
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))?;

        f(&conn)
    }

    /// Run operations inside a transaction
    ///
    /// Commits when the closure returns `Ok`; an `Err` drops the transaction,
    /// which rolls it back.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T>,
    {
        let mut conn = self
            .connection
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }
}

/// Install the store's SQL helper functions on a connection
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Text(text) => Value::Text(String::from_utf8_lossy(text).to_lowercase()),
                other => Value::from(other),
            })
        },
    )
    .with_context(|| format!("Failed to register SQL function {}", UNICODE_LOWER))
}

impl std::fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("db_path", &self.db_path)
            .finish()
    }
}
