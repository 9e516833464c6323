// src/watch/controller.rs

//! Lifecycle control for a monitoring session.
//!
//! A [`WatchController`] owns at most one active session. `start` wires the
//! platform watcher to a worker thread that classifies changes; `stop` tears
//! both down and reports which directory was being monitored. Starting while
//! a session is active and stopping while idle are non-fatal no-ops.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Instant;

use globset::GlobSet;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use crate::classify::Classifier;
use crate::errors::{Result, WatchsumError};
use crate::fs::FileSystem;
use crate::watch::events::{changes_from_notify, EventFilter};

/// Outcome of a lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Started { directory: PathBuf },
    AlreadyRunning { directory: PathBuf },
    Stopped { directory: PathBuf },
    NotRunning,
}

enum Session {
    Idle,
    Running {
        directory: PathBuf,
        started_at: Instant,
        // Kept alive for the duration of the session; dropping it stops the
        // platform watcher and closes the event channel.
        watcher: RecommendedWatcher,
        worker: JoinHandle<()>,
    },
}

pub struct WatchController {
    fs: Arc<dyn FileSystem>,
    classifier: Arc<Classifier>,
    exclude: Option<GlobSet>,
    session: Mutex<Session>,
}

impl std::fmt::Debug for WatchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.lock_session() {
            Session::Idle => "idle",
            Session::Running { .. } => "running",
        };
        f.debug_struct("WatchController").field("session", &state).finish()
    }
}

impl WatchController {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        classifier: Arc<Classifier>,
        exclude: Option<GlobSet>,
    ) -> Self {
        Self {
            fs,
            classifier,
            exclude,
            session: Mutex::new(Session::Idle),
        }
    }

    /// Begin monitoring `directory` recursively.
    ///
    /// Fails if the directory does not exist. If a session is already
    /// active the call logs and returns [`SessionStatus::AlreadyRunning`]
    /// without touching it.
    pub fn start(&self, directory: &Path) -> Result<SessionStatus> {
        if !self.fs.is_dir(directory) {
            return Err(WatchsumError::DirectoryNotFound(
                directory.display().to_string(),
            ));
        }
        // Canonicalize once so baseline keys and event paths share a stable base.
        let root = self
            .fs
            .canonicalize(directory)
            .unwrap_or_else(|_| directory.to_path_buf());

        let mut session = self.lock_session();
        if let Session::Running { directory, .. } = &*session {
            warn!(directory = %directory.display(), "monitoring already running");
            return Ok(SessionStatus::AlreadyRunning {
                directory: directory.clone(),
            });
        }

        let (event_tx, event_rx) = mpsc::channel::<Event>();

        // Closure called synchronously by notify whenever an event arrives.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        // We can't log via tracing here easily, so fallback to stderr.
                        eprintln!("watchsum: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("watchsum: file watch error: {err}");
                }
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let filter = EventFilter::new(root.clone(), self.exclude.clone());
        let classifier = Arc::clone(&self.classifier);
        let fs = Arc::clone(&self.fs);
        let worker = std::thread::spawn(move || {
            while let Ok(event) = event_rx.recv() {
                debug!(?event, "received notify event");
                for change in changes_from_notify(&event, &filter, fs.as_ref()) {
                    if let Err(err) = classifier.process(&change) {
                        error!(error = %err, ?change, "failed to process change");
                    }
                }
            }
            debug!("classification loop finished");
        });

        match self.classifier.tracked_files() {
            Ok(count) => {
                info!(directory = %root.display(), tracked = count, "monitoring started");
            }
            Err(err) => {
                warn!(error = %err, "could not read baseline size");
                info!(directory = %root.display(), "monitoring started");
            }
        }

        *session = Session::Running {
            directory: root.clone(),
            started_at: Instant::now(),
            watcher,
            worker,
        };
        Ok(SessionStatus::Started { directory: root })
    }

    /// End the active session, draining events already in flight.
    pub fn stop(&self) -> SessionStatus {
        let previous = {
            let mut session = self.lock_session();
            std::mem::replace(&mut *session, Session::Idle)
        };
        match previous {
            Session::Idle => {
                info!("monitoring is not running");
                SessionStatus::NotRunning
            }
            Session::Running {
                directory,
                started_at,
                watcher,
                worker,
            } => {
                // Dropping the watcher drops its callback, which closes the
                // channel and lets the worker drain what is already queued.
                drop(watcher);
                if worker.join().is_err() {
                    warn!("classification worker panicked");
                }
                info!(
                    directory = %directory.display(),
                    uptime_ms = started_at.elapsed().as_millis() as u64,
                    "monitoring stopped"
                );
                SessionStatus::Stopped { directory }
            }
        }
    }

    /// Directory of the active session, if any.
    pub fn status(&self) -> Option<PathBuf> {
        match &*self.lock_session() {
            Session::Idle => None,
            Session::Running { directory, .. } => Some(directory.clone()),
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("session mutex poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::RealFileSystem;
    use crate::hash::{FileHasher, RetryPolicy};
    use crate::store::{MemoryAuditLog, MemoryStore};
    use crate::types::DigestAlgorithm;
    use tempfile::TempDir;

    fn controller(fs: Arc<dyn FileSystem>) -> WatchController {
        let hasher = FileHasher::new(
            Arc::clone(&fs),
            DigestAlgorithm::Blake3,
            RetryPolicy::new(3, std::time::Duration::from_millis(1)),
        );
        let classifier = Arc::new(Classifier::new(
            hasher,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryAuditLog::new()),
        ));
        WatchController::new(fs, classifier, None)
    }

    #[test]
    fn start_on_missing_directory_errors() {
        let ctl = controller(Arc::new(MockFileSystem::new()));
        let err = ctl.start(Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, WatchsumError::DirectoryNotFound(_)));
    }

    #[test]
    fn stop_when_idle_reports_not_running() {
        let ctl = controller(Arc::new(MockFileSystem::new()));
        assert_eq!(ctl.stop(), SessionStatus::NotRunning);
    }

    #[test]
    fn second_start_reports_already_running() {
        let dir = TempDir::new().unwrap();
        let ctl = controller(Arc::new(RealFileSystem));

        let first = ctl.start(dir.path()).unwrap();
        assert!(matches!(first, SessionStatus::Started { .. }));

        let second = ctl.start(dir.path()).unwrap();
        assert!(matches!(second, SessionStatus::AlreadyRunning { .. }));

        assert!(matches!(ctl.stop(), SessionStatus::Stopped { .. }));
    }

    #[test]
    fn status_reflects_session_lifecycle() {
        let dir = TempDir::new().unwrap();
        let ctl = controller(Arc::new(RealFileSystem));

        assert!(ctl.status().is_none());
        ctl.start(dir.path()).unwrap();
        let active = ctl.status().expect("session should be active");
        assert_eq!(active, dir.path().canonicalize().unwrap());
        ctl.stop();
        assert!(ctl.status().is_none());
    }

    #[test]
    fn stop_reports_monitored_directory() {
        let dir = TempDir::new().unwrap();
        let ctl = controller(Arc::new(RealFileSystem));

        ctl.start(dir.path()).unwrap();
        match ctl.stop() {
            SessionStatus::Stopped { directory } => {
                assert_eq!(directory, dir.path().canonicalize().unwrap());
            }
            other => panic!("expected Stopped, got {other:?}"),
        }
    }
}
