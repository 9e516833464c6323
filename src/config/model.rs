// src/config/model.rs

use std::path::PathBuf;

use globset::GlobSet;
use serde::Deserialize;

use crate::hash::RetryPolicy;
use crate::types::{DigestAlgorithm, StoreMode};

/// Exclude pattern applied when the config does not override it. Keeps the
/// engine's own store directory from feeding events back into the watcher.
pub const DEFAULT_EXCLUDE: &str = ".watchsum/**";

/// Relative store path used when `[store].path` is absent.
pub const DEFAULT_STORE_PATH: &str = ".watchsum/baseline.db";

/// Top-level configuration as read from a TOML file.
///
/// This is a direct mapping of:
///
/// ```toml
/// [watch]
/// directory = "/srv/shared"
/// exclude = [".watchsum/**", "*.swp"]
///
/// [store]
/// mode = "sqlite"
/// path = ".watchsum/baseline.db"
///
/// [hasher]
/// algorithm = "blake3"
/// max_retries = 3
/// retry_delay_ms = 1000
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfig {
    /// `[watch]` section.
    #[serde(default)]
    pub watch: RawWatchSection,

    /// `[store]` section.
    #[serde(default)]
    pub store: RawStoreSection,

    /// `[hasher]` section.
    #[serde(default)]
    pub hasher: RawHasherSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWatchSection {
    /// Directory to monitor. A CLI positional argument takes precedence.
    #[serde(default)]
    pub directory: Option<String>,

    /// Root-relative glob patterns whose events are ignored.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_exclude() -> Vec<String> {
    vec![DEFAULT_EXCLUDE.to_string()]
}

impl Default for RawWatchSection {
    fn default() -> Self {
        Self {
            directory: None,
            exclude: default_exclude(),
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStoreSection {
    /// `"sqlite"` (default) or `"memory"`.
    #[serde(default)]
    pub mode: StoreMode,

    /// Database file location, resolved against the watched directory when
    /// relative. Ignored in memory mode.
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_string()
}

impl Default for RawStoreSection {
    fn default() -> Self {
        Self {
            mode: StoreMode::default(),
            path: default_store_path(),
        }
    }
}

/// `[hasher]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHasherSection {
    /// `"blake3"` (default) or `"sha256"`.
    #[serde(default)]
    pub algorithm: DigestAlgorithm,

    /// Attempts per file before a read is given up on.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Optional cap on the total time spent retrying one file. Defaults to
    /// `max_retries * retry_delay_ms` when absent.
    #[serde(default)]
    pub total_budget_ms: Option<u64>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for RawHasherSection {
    fn default() -> Self {
        Self {
            algorithm: DigestAlgorithm::default(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            total_budget_ms: None,
        }
    }
}

/// Validated configuration, produced by `TryFrom<RawConfig>`.
#[derive(Debug, Clone)]
pub struct Config {
    pub watch: WatchConfig,
    pub store: StoreConfig,
    pub hasher: HasherConfig,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub directory: Option<PathBuf>,
    /// Source patterns, kept for display and logging.
    pub exclude_patterns: Vec<String>,
    /// Compiled form of `exclude_patterns`; `None` when the list is empty.
    pub exclude: Option<GlobSet>,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub mode: StoreMode,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct HasherConfig {
    pub algorithm: DigestAlgorithm,
    pub retry: RetryPolicy,
}
