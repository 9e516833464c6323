use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Temporary directory tree for integration tests.
///
/// Wraps a [`TempDir`] with panicking mutation helpers so tests read as a
/// sequence of filesystem actions. The directory is removed on drop.
pub struct TempTree {
    dir: TempDir,
}

impl TempTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Canonical form of the tree root.
    ///
    /// The engine canonicalizes the watched directory at session start, so
    /// baseline keys are derived from this path, not from `path()` (they can
    /// differ through symlinks, e.g. `/tmp` on macOS).
    pub fn canonical_path(&self) -> PathBuf {
        self.dir
            .path()
            .canonicalize()
            .expect("failed to canonicalize temp dir")
    }

    pub fn abs(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Create or overwrite a file, creating parent directories as needed.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.abs(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        fs::write(&path, contents).expect("failed to write file");
        path
    }

    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.abs(rel);
        fs::create_dir_all(&path).expect("failed to create dir");
        path
    }

    pub fn rename(&self, from: &str, to: &str) -> PathBuf {
        let to_path = self.abs(to);
        fs::rename(self.abs(from), &to_path).expect("failed to rename");
        to_path
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.abs(rel)).expect("failed to remove file");
    }
}

impl Default for TempTree {
    fn default() -> Self {
        Self::new()
    }
}
