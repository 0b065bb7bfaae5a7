//! Dead-letter store for permanently failed objects.
//!
//! When a storage operation exhausts its retries, the failure is recorded
//! here so an operator can re-drive the affected objects later. Reports
//! are kept in a `SQLite` database keyed by `blob:<hex>`; re-reporting an
//! object replaces its previous entry.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use objreplay_store::ObjectId;

use crate::error::{Error, Result};

/// SQL statement to create the dead-letter table.
const CREATE_DEAD_LETTER_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS dead_letter (
    key TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    recorded_at TEXT NOT NULL
)
";

/// A report describing a permanently failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Hex id of the affected object.
    pub obj_id: String,
    /// Storage operation that failed (`get`, `add`, or `contains`).
    pub operation: String,
    /// Rendering of the final error.
    pub error: String,
    /// Number of attempts made.
    pub retries: usize,
}

impl FailureReport {
    /// The dead-letter key for this report.
    #[must_use]
    pub fn key(&self) -> String {
        format!("blob:{}", self.obj_id)
    }
}

/// A `SQLite`-backed store of failure reports.
#[derive(Debug)]
pub struct DeadLetterStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection, locked for use from concurrent copy tasks.
    conn: Mutex<Connection>,
}

impl DeadLetterStore {
    /// Open or create a dead-letter database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("opening dead-letter database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::ReporterOpen {
            path: path.clone(),
            source,
        })?;

        // WAL keeps readers usable while the replayer writes reports
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute(CREATE_DEAD_LETTER_TABLE, [])?;

        info!("dead-letter database ready at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::ReporterOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        conn.execute(CREATE_DEAD_LETTER_TABLE, [])?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a failure report, replacing any previous one for the object.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized or written.
    pub fn report(&self, report: &FailureReport) -> Result<()> {
        let payload = serde_json::to_string(report)?;
        let recorded_at = Utc::now().to_rfc3339();

        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::internal("dead-letter connection poisoned"))?;
        conn.execute(
            "INSERT OR REPLACE INTO dead_letter (key, payload, recorded_at) VALUES (?1, ?2, ?3)",
            params![report.key(), payload, recorded_at],
        )?;
        Ok(())
    }

    /// Fetch the report for an object, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: &ObjectId) -> Result<Option<FailureReport>> {
        let key = format!("blob:{id}");
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::internal("dead-letter connection poisoned"))?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM dead_letter WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Count the recorded reports.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::internal("dead-letter connection poisoned"))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM dead_letter", [], |row| row.get(0))?;
        Ok(count)
    }

    /// List all dead-letter keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::internal("dead-letter connection poisoned"))?;
        let mut stmt = conn.prepare("SELECT key FROM dead_letter ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}
