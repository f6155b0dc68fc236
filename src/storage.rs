//! SQLite storage for crash recovery.
//!
//! Holds the queued asks and the recent answer history in `askq.db` under
//! the data directory. WAL mode; every write is one transaction. The engine
//! never reads back what it wrote except on startup.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, params};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::Result;
use crate::model::{AnswerRecord, WorkItem};

const DB_FILE: &str = "askq.db";

/// Storage backend. Owns the SQLite connection.
pub struct Storage {
    path: Option<PathBuf>,
    conn: Mutex<Writer>,
}

struct Writer {
    conn: Connection,
    /// Revision of the last pending snapshot written.
    pending_revision: u64,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("path", &self.path).finish()
    }
}

impl Storage {
    /// Open (creating if needed) the database in a data directory.
    ///
    /// A file that is not a usable database is moved aside to
    /// `askq.db.corrupt` and a fresh one is created in its place.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(DB_FILE);

        let conn = match open_db(&path) {
            Ok(conn) => conn,
            Err(e) => {
                let aside = dir.join(format!("{DB_FILE}.corrupt"));
                warn!(path = %path.display(), "unreadable database set aside: {e}");
                std::fs::rename(&path, &aside)?;
                for suffix in ["-wal", "-shm"] {
                    let _ = std::fs::remove_file(dir.join(format!("{DB_FILE}{suffix}")));
                }
                open_db(&path)?
            }
        };

        Ok(Self::with_conn(Some(path), conn))
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init(&conn)?;
        Ok(Self::with_conn(None, conn))
    }

    fn with_conn(path: Option<PathBuf>, conn: Connection) -> Self {
        Self {
            path,
            conn: Mutex::new(Writer {
                conn,
                pending_revision: 0,
            }),
        }
    }

    /// Database file, if on disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // -----------------------------------------------------------------------
    // Pending queue
    // -----------------------------------------------------------------------

    /// Replace the stored queue with `items`. Snapshots older than the last
    /// one written are skipped, so concurrent writers cannot regress it.
    pub fn save_pending(&self, revision: u64, items: &[WorkItem]) -> Result<()> {
        let mut writer = self.lock();
        if revision <= writer.pending_revision {
            return Ok(());
        }

        let tx = writer.conn.transaction()?;
        tx.execute("DELETE FROM pending", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO pending (id, body) VALUES (?1, ?2)")?;
            for item in items {
                stmt.execute(params![item.id.to_string(), serde_json::to_string(item)?])?;
            }
        }
        tx.commit()?;

        writer.pending_revision = revision;
        Ok(())
    }

    /// Queued items from the last run. Rows that no longer decode are skipped.
    pub fn load_pending(&self) -> Result<Vec<WorkItem>> {
        self.load_bodies("SELECT body FROM pending")
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Append an answer, keeping only the newest `limit` records.
    pub fn append_history(&self, record: &AnswerRecord, limit: usize) -> Result<()> {
        let mut writer = self.lock();
        let tx = writer.conn.transaction()?;
        tx.execute(
            "INSERT INTO history (id, body) VALUES (?1, ?2)",
            params![record.id.to_string(), serde_json::to_string(record)?],
        )?;
        tx.execute(
            "DELETE FROM history WHERE seq NOT IN
                (SELECT seq FROM history ORDER BY seq DESC LIMIT ?1)",
            params![limit as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Answer history, oldest first.
    pub fn load_history(&self) -> Result<Vec<AnswerRecord>> {
        self.load_bodies("SELECT body FROM history ORDER BY seq ASC")
    }

    fn load_bodies<T: DeserializeOwned>(&self, sql: &str) -> Result<Vec<T>> {
        let writer = self.lock();
        let mut stmt = writer.conn.prepare(sql)?;
        let bodies = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut result = Vec::with_capacity(bodies.len());
        for body in bodies {
            match serde_json::from_str(&body) {
                Ok(value) => result.push(value),
                Err(e) => warn!("skipping unreadable stored row: {e}"),
            }
        }
        Ok(result)
    }

    fn lock(&self) -> MutexGuard<'_, Writer> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn open_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init(&conn)?;
    Ok(conn)
}

fn init(conn: &Connection) -> Result<()> {
    // WAL mode for crash safety without blocking readers
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA synchronous=FULL;")?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pending (
            id      TEXT PRIMARY KEY,
            body    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS history (
            seq     INTEGER PRIMARY KEY AUTOINCREMENT,
            id      TEXT NOT NULL,
            body    TEXT NOT NULL
        );
        ",
    )?;

    // Reading the schema forces SQLite to validate the file header.
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })?;
    Ok(())
}
