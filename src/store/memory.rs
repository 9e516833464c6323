// src/store/memory.rs

//! In-memory baseline and audit trail. Lost on restart.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::audit::{AuditEntry, AuditLog};
use crate::errors::{Result, WatchsumError};
use crate::hash::Digest;
use crate::store::IntegrityStore;

fn poisoned() -> WatchsumError {
    WatchsumError::StoreError("store lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RwLock<HashMap<String, Digest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntegrityStore for MemoryStore {
    fn lookup(&self, path: &str) -> Result<Option<Digest>> {
        let map = self.map.read().map_err(|_| poisoned())?;
        Ok(map.get(path).cloned())
    }

    fn put(&self, path: &str, digest: &Digest) -> Result<()> {
        let mut map = self.map.write().map_err(|_| poisoned())?;
        map.insert(path.to_string(), digest.clone());
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let mut map = self.map.write().map_err(|_| poisoned())?;
        map.remove(path);
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut map = self.map.write().map_err(|_| poisoned())?;
        if let Some(digest) = map.remove(from) {
            map.insert(to.to_string(), digest);
        }
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let map = self.map.read().map_err(|_| poisoned())?;
        Ok(map.len())
    }
}

#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, entry: &AuditEntry) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.push(entry.clone());
        Ok(())
    }

    fn entries(&self) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.clone())
    }
}
