// src/fs/mock.rs

use super::FileSystem;
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem for tests.
///
/// Besides plain file content, it can inject read failures: `fail_reads`
/// makes the next N `open_read` calls for a path fail with a given
/// `io::ErrorKind`, and `read_attempts` reports how often a path was opened.
/// That is what the hasher retry tests are built on.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    faults: Arc<Mutex<HashMap<PathBuf, (u32, io::ErrorKind)>>>,
    attempts: Arc<Mutex<HashMap<PathBuf, u32>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Ensure root exists
        entries.insert(PathBuf::from("."), MockEntry::Dir);

        Self {
            entries: Arc::new(Mutex::new(entries)),
            faults: Arc::new(Mutex::new(HashMap::new())),
            attempts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries.lock().unwrap();
        self.ensure_parents(&mut entries, &path);
        entries.insert(path, MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries.lock().unwrap();
        self.ensure_parents(&mut entries, &path);
        entries.insert(path, MockEntry::Dir);
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(path.as_ref());
    }

    /// Make the next `count` `open_read` calls for `path` fail with `kind`.
    pub fn fail_reads(&self, path: impl AsRef<Path>, count: u32, kind: io::ErrorKind) {
        let mut faults = self.faults.lock().unwrap();
        faults.insert(path.as_ref().to_path_buf(), (count, kind));
    }

    /// Number of `open_read` calls observed for `path`.
    pub fn read_attempts(&self, path: impl AsRef<Path>) -> u32 {
        let attempts = self.attempts.lock().unwrap();
        attempts.get(path.as_ref()).copied().unwrap_or(0)
    }

    fn ensure_parents(&self, entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let mut current = path.parent();
        while let Some(parent) = current {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            if entries.contains_key(parent) {
                break;
            }
            entries.insert(parent.to_path_buf(), MockEntry::Dir);
            if parent == Path::new(".") || parent.parent() == Some(parent) {
                break;
            }
            current = parent.parent();
        }
    }
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts.entry(path.to_path_buf()).or_insert(0) += 1;
        }

        {
            let mut faults = self.faults.lock().unwrap();
            if let Some((remaining, kind)) = faults.get_mut(path) {
                if *remaining > 0 {
                    *remaining -= 1;
                    let kind = *kind;
                    if *remaining == 0 {
                        faults.remove(path);
                    }
                    return Err(io::Error::new(kind, "injected read fault"));
                }
            }
        }

        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(MockEntry::Dir) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {:?}", path),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        let entries = self.entries.lock().unwrap();
        entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let entries = self.entries.lock().unwrap();
        matches!(entries.get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let entries = self.entries.lock().unwrap();
        matches!(entries.get(path), Some(MockEntry::Dir))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        // Mock paths are used verbatim; there are no links to resolve.
        Ok(path.to_path_buf())
    }
}
