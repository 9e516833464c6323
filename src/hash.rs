// src/hash.rs

//! Streaming file content hashing with bounded retries.
//!
//! - Files are read in fixed 8 KiB chunks so large files never have to fit
//!   in memory.
//! - Both supported algorithms produce a 256-bit digest rendered as 64
//!   lowercase hex characters.
//! - Transient read failures (permission denied, advisory locks) are retried
//!   a bounded number of times with a fixed delay, inside an explicit total
//!   time budget. A missing file is not transient and fails immediately.

use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sha2::{Digest as _, Sha256};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::fs::FileSystem;
use crate::types::DigestAlgorithm;

/// A file content digest: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(String);

impl Digest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Digest {
    fn from(s: String) -> Self {
        Digest(s)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Retry behaviour for transient read failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total read attempts, including the first one.
    pub max_attempts: u32,
    /// Sleep between attempts.
    pub delay: Duration,
    /// Upper bound on how long a single file may keep us busy, sleeps
    /// included. When waiting again would exceed this, we give up even if
    /// attempts remain.
    pub total_budget: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            total_budget: delay.saturating_mul(max_attempts),
        }
    }

    pub fn with_total_budget(mut self, budget: Duration) -> Self {
        self.total_budget = budget;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("gave up hashing {path:?} after {attempts} attempts")]
    RetriesExhausted { path: PathBuf, attempts: u32 },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Computes file content digests through a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct FileHasher {
    fs: Arc<dyn FileSystem>,
    algorithm: DigestAlgorithm,
    retry: RetryPolicy,
}

impl FileHasher {
    pub fn new(fs: Arc<dyn FileSystem>, algorithm: DigestAlgorithm, retry: RetryPolicy) -> Self {
        Self {
            fs,
            algorithm,
            retry,
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Compute the digest of a single file, retrying transient failures.
    pub fn compute(&self, path: &Path) -> Result<Digest, HashError> {
        let started = Instant::now();
        let mut attempt: u32 = 1;

        loop {
            match self.hash_once(path) {
                Ok(digest) => {
                    debug!(path = ?path, digest = %digest, "hashed file");
                    return Ok(digest);
                }
                Err(err) if is_transient(err.kind()) => {
                    let out_of_attempts = attempt >= self.retry.max_attempts;
                    let out_of_budget =
                        started.elapsed() + self.retry.delay > self.retry.total_budget;
                    if out_of_attempts || out_of_budget {
                        error!(
                            path = ?path,
                            attempts = attempt,
                            error = %err,
                            "giving up on unreadable file"
                        );
                        return Err(HashError::RetriesExhausted {
                            path: path.to_path_buf(),
                            attempts: attempt,
                        });
                    }
                    warn!(
                        path = ?path,
                        attempt,
                        delay_ms = self.retry.delay.as_millis() as u64,
                        error = %err,
                        "file read failed, retrying"
                    );
                    thread::sleep(self.retry.delay);
                    attempt += 1;
                }
                Err(err) => {
                    return Err(HashError::Io {
                        path: path.to_path_buf(),
                        source: err,
                    });
                }
            }
        }
    }

    fn hash_once(&self, path: &Path) -> io::Result<Digest> {
        let mut reader = self.fs.open_read(path)?;
        let mut buf = [0u8; 8192];

        match self.algorithm {
            DigestAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                loop {
                    let n = reader.read(&mut buf)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                Ok(Digest(hasher.finalize().to_hex().to_string()))
            }
            DigestAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                loop {
                    let n = reader.read(&mut buf)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                Ok(Digest(hex::encode(hasher.finalize())))
            }
        }
    }
}

fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::PermissionDenied | io::ErrorKind::WouldBlock
    )
}
