// src/audit.rs

//! Audit trail of observed file changes.
//!
//! Every change the classifier acts on (and some it deliberately does not,
//! like deletions of untracked paths) produces exactly one [`AuditEntry`].
//! The trail is append-only and ordered by insertion.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::Result;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A new file entered the baseline.
    Added,
    /// Content of a tracked file changed.
    Modified,
    /// A tracked file disappeared and was dropped from the baseline.
    Deleted,
    /// An untracked path disappeared; recorded, baseline untouched.
    DeletedUntracked,
    /// A path moved. `new_path` carries the destination when known.
    Renamed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
            ChangeKind::DeletedUntracked => "deleted_untracked",
            ChangeKind::Renamed => "renamed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "added" => Ok(ChangeKind::Added),
            "modified" => Ok(ChangeKind::Modified),
            "deleted" => Ok(ChangeKind::Deleted),
            "deleted_untracked" => Ok(ChangeKind::DeletedUntracked),
            "renamed" => Ok(ChangeKind::Renamed),
            other => Err(format!("unknown change kind: {other}")),
        }
    }
}

/// One recorded change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub kind: ChangeKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
}

impl AuditEntry {
    pub fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            kind,
            path: path.into(),
            new_path: None,
        }
    }

    pub fn renamed(path: impl Into<String>, new_path: Option<String>) -> Self {
        Self {
            at: Utc::now(),
            kind: ChangeKind::Renamed,
            path: path.into(),
            new_path,
        }
    }
}

/// Append-only record of observed changes.
pub trait AuditLog: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> Result<()>;

    /// All entries so far, oldest first.
    ///
    /// Re-reading from the beginning is just calling this again.
    fn entries(&self) -> Result<Vec<AuditEntry>>;
}
