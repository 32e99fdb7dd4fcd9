//! Store handle: opening, pragmas, transactions, safe JSON decoding.

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::migrations;

/// Shared handle to the embedded state database.
///
/// The connection lives behind a mutex; every public operation locks it
/// exactly once for its own duration, so operations are atomic with
/// respect to each other and never nest.
pub struct StateStore {
    pub(crate) conn: Mutex<Connection>,
}

impl StateStore {
    /// Open (or create) the store at `path` and bring the schema up to
    /// date. Fails hard on integrity or migration errors; boot must not
    /// continue on a bad store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }

        let mut conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Self::check_integrity(&conn)?;
        conn.execute_batch(migrations::BASE_TABLES)?;
        migrations::apply_migrations(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests. Same schema, no file.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(migrations::BASE_TABLES)?;
        migrations::apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &Connection) -> Result<(), StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "wal_autocheckpoint", 1000)?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        Ok(())
    }

    fn check_integrity(conn: &Connection) -> Result<(), StoreError> {
        let result: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if result == "ok" {
            Ok(())
        } else {
            Err(StoreError::Integrity(result))
        }
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// The closure receives the raw transaction and must not call back
    /// into the store (the connection lock is held).
    pub fn run_transaction<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().expect("state store lock poisoned");
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Force a WAL checkpoint, truncating the log.
    pub fn checkpoint(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("state store lock poisoned");
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")?;
        Ok(())
    }

    /// Recorded schema version.
    pub fn schema_version(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock().expect("state store lock poisoned");
        migrations::current_version(&conn)
    }

    /// Lock the connection for a single read or write.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock().expect("state store lock poisoned");
        Ok(f(&conn)?)
    }
}

/// Decode a JSON blob column, falling back to `default` on any parse
/// failure. Corrupt rows degrade; they never abort the caller.
pub fn safe_parse<T: DeserializeOwned>(raw: &str, default: T, context: &str) -> T {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(context, error = %e, "corrupt JSON column, using default");
            default
        }
    }
}
