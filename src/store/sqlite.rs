// src/store/sqlite.rs

//! SQLite-backed baseline and audit trail.
//!
//! One pooled database file holds two tables: `files` (the baseline) and
//! `audit_log` (the change record). Schema creation is idempotent, so
//! opening an existing database is the same call as creating a fresh one.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::audit::{AuditEntry, AuditLog, ChangeKind};
use crate::errors::{Result, WatchsumError};
use crate::hash::Digest;
use crate::store::IntegrityStore;

/// Counter for generating unique in-memory database names.
static MEMORY_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY,
    hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    at TEXT NOT NULL,
    kind TEXT NOT NULL,
    path TEXT NOT NULL,
    new_path TEXT
);
";

/// Pool sizing and acquisition timeout.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: u32,
    pub min_idle: Option<u32>,
    pub connection_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            min_idle: Some(1),
            connection_timeout: Duration::from_secs(30),
        }
    }
}

/// Sets up pragmas for file-based databases.
#[derive(Debug)]
struct FileConnectionInitializer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for FileConnectionInitializer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=5000;
             PRAGMA foreign_keys=ON;",
        )
    }
}

/// Pragmas for in-memory databases. WAL mode is not compatible with
/// shared-cache mode, so it is left out.
#[derive(Debug)]
struct MemoryConnectionInitializer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for MemoryConnectionInitializer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            "PRAGMA busy_timeout=5000;
             PRAGMA foreign_keys=ON;",
        )
    }
}

/// Pooled SQLite database implementing both [`IntegrityStore`] and
/// [`AuditLog`].
///
/// Cloning is cheap; clones share the same pool.
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase").finish()
    }
}

impl SqliteDatabase {
    /// Open (or create) the database at `path` and initialize the schema.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, PoolConfig::default())
    }

    pub fn open_with(path: &Path, config: PoolConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let manager = SqliteConnectionManager::file(path);
        let db = Self::build(manager, config, Box::new(FileConnectionInitializer))?;
        db.initialize_schema()?;
        debug!(path = ?path, "opened sqlite baseline");
        Ok(db)
    }

    /// Create an in-memory database.
    ///
    /// Each connection in a pool would normally get its own private
    /// in-memory database; a shared-cache URI with a unique name makes all
    /// connections of this pool see the same one, while keeping different
    /// pools isolated. The pool keeps at least one idle connection so the
    /// database outlives individual checkouts.
    pub fn in_memory() -> Result<Self> {
        let db_id = MEMORY_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let uri = format!("file:watchsum-memdb{}?mode=memory&cache=shared", db_id);
        let manager = SqliteConnectionManager::file(&uri);
        let db = Self::build(
            manager,
            PoolConfig::default(),
            Box::new(MemoryConnectionInitializer),
        )?;
        db.initialize_schema()?;
        Ok(db)
    }

    fn build<I>(
        manager: SqliteConnectionManager,
        config: PoolConfig,
        initializer: Box<I>,
    ) -> Result<Self>
    where
        I: r2d2::CustomizeConnection<Connection, rusqlite::Error> + 'static,
    {
        let mut builder = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .connection_customizer(initializer);

        if let Some(min_idle) = config.min_idle {
            builder = builder.min_idle(Some(min_idle));
        }

        let pool = builder.build(manager)?;
        Ok(Self { pool })
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }
}

impl IntegrityStore for SqliteDatabase {
    fn lookup(&self, path: &str) -> Result<Option<Digest>> {
        let conn = self.pool.get()?;
        let hash: Option<String> = conn
            .query_row(
                "SELECT hash FROM files WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash.map(Digest::from))
    }

    fn put(&self, path: &str, digest: &Digest) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO files (path, hash) VALUES (?1, ?2)
             ON CONFLICT(path) DO UPDATE SET hash = excluded.hash",
            params![path, digest.as_str()],
        )?;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM files WHERE path = ?1", params![path])?;
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Ok(());
        }
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        // Any record already at the destination is replaced.
        tx.execute("DELETE FROM files WHERE path = ?1", params![to])?;
        tx.execute(
            "UPDATE files SET path = ?2 WHERE path = ?1",
            params![from, to],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl AuditLog for SqliteDatabase {
    fn append(&self, entry: &AuditEntry) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO audit_log (at, kind, path, new_path) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.at.to_rfc3339(),
                entry.kind.as_str(),
                entry.path,
                entry.new_path
            ],
        )?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<AuditEntry>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT at, kind, path, new_path FROM audit_log ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (at, kind, path, new_path) = row?;
            let at = DateTime::parse_from_rfc3339(&at)
                .map_err(|e| WatchsumError::StoreError(format!("bad audit timestamp: {e}")))?
                .with_timezone(&Utc);
            let kind = kind.parse::<ChangeKind>().map_err(WatchsumError::StoreError)?;
            entries.push(AuditEntry {
                at,
                kind,
                path,
                new_path,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(s: &str) -> Digest {
        Digest::from(s.to_string())
    }

    #[test]
    fn put_then_lookup_round_trips() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.put("/data/a.txt", &digest("aa")).unwrap();

        assert_eq!(db.lookup("/data/a.txt").unwrap(), Some(digest("aa")));
        assert_eq!(db.lookup("/data/missing").unwrap(), None);
    }

    #[test]
    fn put_overwrites_existing_digest() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.put("/data/a.txt", &digest("old")).unwrap();
        db.put("/data/a.txt", &digest("new")).unwrap();

        assert_eq!(db.lookup("/data/a.txt").unwrap(), Some(digest("new")));
        assert_eq!(db.len().unwrap(), 1);
    }

    #[test]
    fn delete_is_idempotent() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.put("/data/a.txt", &digest("aa")).unwrap();

        db.delete("/data/a.txt").unwrap();
        db.delete("/data/a.txt").unwrap();
        assert_eq!(db.lookup("/data/a.txt").unwrap(), None);
    }

    #[test]
    fn rename_moves_digest_without_rehash() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.put("/data/old.txt", &digest("aa")).unwrap();

        db.rename("/data/old.txt", "/data/new.txt").unwrap();
        assert_eq!(db.lookup("/data/old.txt").unwrap(), None);
        assert_eq!(db.lookup("/data/new.txt").unwrap(), Some(digest("aa")));
    }

    #[test]
    fn rename_of_untracked_path_is_noop() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.rename("/data/ghost", "/data/new").unwrap();
        assert_eq!(db.len().unwrap(), 0);
    }

    #[test]
    fn rename_replaces_existing_destination() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.put("/data/old.txt", &digest("aa")).unwrap();
        db.put("/data/new.txt", &digest("bb")).unwrap();

        db.rename("/data/old.txt", "/data/new.txt").unwrap();
        assert_eq!(db.lookup("/data/new.txt").unwrap(), Some(digest("aa")));
        assert_eq!(db.len().unwrap(), 1);
    }

    #[test]
    fn rename_onto_itself_keeps_the_record() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.put("/data/a.txt", &digest("aa")).unwrap();

        db.rename("/data/a.txt", "/data/a.txt").unwrap();
        assert_eq!(db.lookup("/data/a.txt").unwrap(), Some(digest("aa")));
    }

    #[test]
    fn audit_entries_come_back_oldest_first() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.append(&AuditEntry::new(ChangeKind::Added, "/a")).unwrap();
        db.append(&AuditEntry::new(ChangeKind::Modified, "/a"))
            .unwrap();
        db.append(&AuditEntry::renamed("/a", Some("/b".to_string())))
            .unwrap();

        let entries = db.entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].kind, ChangeKind::Added);
        assert_eq!(entries[1].kind, ChangeKind::Modified);
        assert_eq!(entries[2].kind, ChangeKind::Renamed);
        assert_eq!(entries[2].new_path.as_deref(), Some("/b"));
    }

    #[test]
    fn reopening_a_database_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("baseline.db");

        {
            let db = SqliteDatabase::open(&db_path).unwrap();
            db.put("/data/a.txt", &digest("aa")).unwrap();
            db.append(&AuditEntry::new(ChangeKind::Added, "/data/a.txt"))
                .unwrap();
        }

        let db = SqliteDatabase::open(&db_path).unwrap();
        assert_eq!(db.lookup("/data/a.txt").unwrap(), Some(digest("aa")));
        assert_eq!(db.entries().unwrap().len(), 1);
    }

    #[test]
    fn open_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join(".watchsum").join("baseline.db");

        let db = SqliteDatabase::open(&db_path).unwrap();
        assert_eq!(db.len().unwrap(), 0);
        assert!(db_path.exists());
    }

    #[test]
    fn in_memory_databases_are_isolated() {
        let a = SqliteDatabase::in_memory().unwrap();
        let b = SqliteDatabase::in_memory().unwrap();
        a.put("/data/a.txt", &digest("aa")).unwrap();

        assert_eq!(a.len().unwrap(), 1);
        assert_eq!(b.len().unwrap(), 0);
    }
}
