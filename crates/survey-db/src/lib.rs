pub mod document;
pub mod migrations;
pub mod models;
pub mod payments;
pub mod queries;
pub mod reports;
pub mod surveys;
pub mod users;
pub mod votes;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub use document::{Collection, DocumentStore, Filter, FindOptions, Sort, Update};
pub use payments::PaymentLedger;
pub use reports::ReportLog;
pub use surveys::SurveyStore;
pub use users::{UpsertOutcome, UserStore};
pub use votes::{CastOutcome, VoteLedger};

/// SQLite-backed document store.
///
/// A single connection sits behind a mutex, so every `DocumentStore` call is
/// serialized. Single-document read-modify-write operations rely on this.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers from other processes (backups, sqlite3 shell)
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fresh private database, used by tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}
