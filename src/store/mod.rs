// src/store/mod.rs

//! Baseline storage: path -> content digest.
//!
//! Two implementations:
//! - [`SqliteDatabase`]: pooled SQLite database that survives restarts and
//!   also hosts the audit trail.
//! - [`MemoryStore`] / [`MemoryAuditLog`]: process-local maps for throwaway
//!   sessions and tests.

pub mod memory;
pub mod sqlite;

use crate::errors::Result;
use crate::hash::Digest;

pub use memory::{MemoryAuditLog, MemoryStore};
pub use sqlite::{PoolConfig, SqliteDatabase};

/// Abstract storage for the integrity baseline.
///
/// Keys are absolute path strings as delivered by the watcher. All methods
/// may be called from multiple threads.
pub trait IntegrityStore: Send + Sync {
    /// Digest recorded for `path`, if tracked.
    fn lookup(&self, path: &str) -> Result<Option<Digest>>;

    /// Insert or overwrite the digest for `path`.
    fn put(&self, path: &str, digest: &Digest) -> Result<()>;

    /// Remove `path` from the baseline. Removing an untracked path is a
    /// no-op.
    fn delete(&self, path: &str) -> Result<()>;

    /// Move the record at `from` to `to`, keeping its digest. Renaming an
    /// untracked path is a no-op; an existing record at `to` is replaced.
    fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Number of tracked paths.
    fn len(&self) -> Result<usize>;
}
