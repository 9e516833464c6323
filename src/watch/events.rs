// src/watch/events.rs

//! Mapping from raw `notify` events to the engine's change events.
//!
//! The watcher backend reports platform-specific event kinds with anywhere
//! from zero to two paths attached. This module flattens them into the
//! closed [`ChangeEvent`] union the classifier understands, and applies two
//! filters on the way:
//! - directory events are dropped (only file content is tracked),
//! - paths matching the configured exclude globs are dropped.

use std::path::{Path, PathBuf};

use globset::GlobSet;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use tracing::{debug, trace};

use crate::fs::FileSystem;

/// A change the engine acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    /// `to` is `None` when the backend reported a rename without telling us
    /// the destination.
    Renamed {
        from: PathBuf,
        to: Option<PathBuf>,
    },
}

/// Root-relative exclude filter for raw events.
#[derive(Debug, Clone)]
pub struct EventFilter {
    root: PathBuf,
    exclude: Option<GlobSet>,
}

impl EventFilter {
    pub fn new(root: PathBuf, exclude: Option<GlobSet>) -> Self {
        Self { root, exclude }
    }

    /// Whether events for `path` should be processed.
    pub fn allows(&self, path: &Path) -> bool {
        let Some(exclude) = &self.exclude else {
            return true;
        };
        let rel = match path.strip_prefix(&self.root) {
            Ok(rel) => rel,
            // Outside the watched root; nothing to match against.
            Err(_) => return true,
        };
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        !exclude.is_match(rel_str.as_str())
    }
}

/// Flatten one raw notification into zero or more change events.
pub fn changes_from_notify(
    event: &Event,
    filter: &EventFilter,
    fs: &dyn FileSystem,
) -> Vec<ChangeEvent> {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => file_events(event, filter, fs, ChangeEvent::Created),

        EventKind::Modify(ModifyKind::Name(mode)) => rename_events(event, mode, filter, fs),
        EventKind::Modify(_) => file_events(event, filter, fs, ChangeEvent::Modified),

        EventKind::Remove(RemoveKind::Folder) => Vec::new(),
        // A removed path cannot be stat-ed anymore, so untracked-directory
        // removals slip through here; the classifier records them as
        // untracked deletions without touching the baseline.
        EventKind::Remove(_) => event
            .paths
            .iter()
            .filter(|path| filter.allows(path))
            .map(|path| ChangeEvent::Deleted(path.clone()))
            .collect(),

        EventKind::Access(_) => Vec::new(),
        EventKind::Any | EventKind::Other => {
            trace!(?event, "ignoring unclassified event");
            Vec::new()
        }
    }
}

fn file_events(
    event: &Event,
    filter: &EventFilter,
    fs: &dyn FileSystem,
    make: fn(PathBuf) -> ChangeEvent,
) -> Vec<ChangeEvent> {
    event
        .paths
        .iter()
        .filter(|path| filter.allows(path))
        .filter(|path| !fs.is_dir(path))
        .map(|path| make(path.clone()))
        .collect()
}

fn rename_events(
    event: &Event,
    mode: RenameMode,
    filter: &EventFilter,
    fs: &dyn FileSystem,
) -> Vec<ChangeEvent> {
    let paths = &event.paths;
    match mode {
        RenameMode::Both if paths.len() >= 2 => {
            let from = paths[0].clone();
            let to = paths[1].clone();
            match (filter.allows(&from), filter.allows(&to)) {
                (true, true) => vec![ChangeEvent::Renamed {
                    from,
                    to: Some(to),
                }],
                // Only one side visible: the engine sees a file appearing or
                // disappearing, not a move.
                (false, true) => vec![ChangeEvent::Created(to)],
                (true, false) => vec![ChangeEvent::Deleted(from)],
                (false, false) => Vec::new(),
            }
        }
        RenameMode::Both => {
            debug!(?paths, "rename event missing destination path");
            paths
                .first()
                .filter(|path| filter.allows(path))
                .map(|path| {
                    vec![ChangeEvent::Renamed {
                        from: path.clone(),
                        to: None,
                    }]
                })
                .unwrap_or_default()
        }
        RenameMode::From => paths
            .first()
            .filter(|path| filter.allows(path))
            .map(|path| {
                vec![ChangeEvent::Renamed {
                    from: path.clone(),
                    to: None,
                }]
            })
            .unwrap_or_default(),
        RenameMode::To => paths
            .first()
            .filter(|path| filter.allows(path))
            .filter(|path| !fs.is_dir(path))
            .map(|path| vec![ChangeEvent::Created(path.clone())])
            .unwrap_or_default(),
        // Unpaired rename halves on backends that never pair them: decide by
        // whether the path still exists.
        RenameMode::Any | RenameMode::Other => paths
            .iter()
            .filter(|path| filter.allows(path))
            .filter_map(|path| {
                if fs.exists(path) {
                    if fs.is_dir(path) {
                        None
                    } else {
                        Some(ChangeEvent::Created(path.clone()))
                    }
                } else {
                    Some(ChangeEvent::Deleted(path.clone()))
                }
            })
            .collect(),
    }
}
