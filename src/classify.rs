// src/classify.rs

//! Turns change events into baseline mutations and audit entries.
//!
//! One event in, at most one store mutation and at most one audit entry out.
//! The table:
//!
//! | event                | baseline state      | mutation        | audit entry        |
//! |----------------------|---------------------|-----------------|--------------------|
//! | Created              | -                   | put             | Added              |
//! | Modified             | untracked           | put (self-heal) | Added              |
//! | Modified             | digest unchanged    | none            | none               |
//! | Modified             | digest changed      | put             | Modified           |
//! | Deleted              | tracked             | delete          | Deleted            |
//! | Deleted              | untracked           | none            | DeletedUntracked   |
//! | Renamed              | old path tracked    | rename          | Renamed            |
//! | Renamed              | old path untracked  | none            | Renamed            |
//! | Renamed, no dest     | -                   | none            | Renamed (no dest)  |
//!
//! A file that stays unreadable after the hasher's retries produces neither
//! a mutation nor an entry; the hasher has already logged the failure.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::audit::{AuditEntry, AuditLog, ChangeKind};
use crate::errors::Result;
use crate::hash::FileHasher;
use crate::store::IntegrityStore;
use crate::watch::ChangeEvent;

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub struct Classifier {
    hasher: FileHasher,
    store: Arc<dyn IntegrityStore>,
    audit: Arc<dyn AuditLog>,
}

impl Classifier {
    pub fn new(
        hasher: FileHasher,
        store: Arc<dyn IntegrityStore>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            hasher,
            store,
            audit,
        }
    }

    /// Number of files currently tracked in the baseline.
    pub fn tracked_files(&self) -> Result<usize> {
        self.store.len()
    }

    /// Process one change event end to end.
    ///
    /// Returns the audit entry that was recorded, if any.
    pub fn process(&self, event: &ChangeEvent) -> Result<Option<AuditEntry>> {
        let entry = match event {
            ChangeEvent::Created(path) => self.on_created(path)?,
            ChangeEvent::Modified(path) => self.on_modified(path)?,
            ChangeEvent::Deleted(path) => self.on_deleted(path)?,
            ChangeEvent::Renamed { from, to } => self.on_renamed(from, to.as_deref())?,
        };

        if let Some(entry) = &entry {
            self.audit.append(entry)?;
        }
        Ok(entry)
    }

    fn on_created(&self, path: &Path) -> Result<Option<AuditEntry>> {
        let key = path_key(path);
        let digest = match self.hasher.compute(path) {
            Ok(digest) => digest,
            Err(err) => {
                debug!(path = %key, error = %err, "skipping unreadable created file");
                return Ok(None);
            }
        };

        self.store.put(&key, &digest)?;
        info!(path = %key, digest = %digest, "file added to baseline");
        Ok(Some(AuditEntry::new(ChangeKind::Added, key)))
    }

    fn on_modified(&self, path: &Path) -> Result<Option<AuditEntry>> {
        let key = path_key(path);
        let digest = match self.hasher.compute(path) {
            Ok(digest) => digest,
            Err(err) => {
                debug!(path = %key, error = %err, "skipping unreadable modified file");
                return Ok(None);
            }
        };

        match self.store.lookup(&key)? {
            None => {
                // Modified without a baseline entry: treat as an add so the
                // baseline heals itself.
                self.store.put(&key, &digest)?;
                info!(path = %key, digest = %digest, self_heal = true, "file added to baseline");
                Ok(Some(AuditEntry::new(ChangeKind::Added, key)))
            }
            Some(previous) if previous == digest => {
                debug!(path = %key, "content unchanged");
                Ok(None)
            }
            Some(_) => {
                self.store.put(&key, &digest)?;
                warn!(path = %key, digest = %digest, "file content changed");
                Ok(Some(AuditEntry::new(ChangeKind::Modified, key)))
            }
        }
    }

    fn on_deleted(&self, path: &Path) -> Result<Option<AuditEntry>> {
        let key = path_key(path);
        match self.store.lookup(&key)? {
            Some(_) => {
                self.store.delete(&key)?;
                error!(path = %key, "tracked file deleted");
                Ok(Some(AuditEntry::new(ChangeKind::Deleted, key)))
            }
            None => {
                warn!(path = %key, "untracked path deleted");
                Ok(Some(AuditEntry::new(ChangeKind::DeletedUntracked, key)))
            }
        }
    }

    fn on_renamed(&self, from: &Path, to: Option<&Path>) -> Result<Option<AuditEntry>> {
        let from_key = path_key(from);
        let Some(to) = to else {
            warn!(path = %from_key, "rename with unknown destination");
            return Ok(Some(AuditEntry::renamed(from_key, None)));
        };

        let to_key = path_key(to);
        // The digest moves with the record; content did not change, so no
        // re-hash. A write after the rename arrives as its own Modified.
        if self.store.lookup(&from_key)?.is_some() {
            self.store.rename(&from_key, &to_key)?;
        }
        info!(from = %from_key, to = %to_key, "file renamed");
        Ok(Some(AuditEntry::renamed(from_key, Some(to_key))))
    }
}
