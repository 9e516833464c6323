// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::{
    Config, HasherConfig, RawConfig, RawHasherSection, RawStoreSection, StoreConfig, WatchConfig,
};
use crate::errors::{Result, WatchsumError};
use crate::hash::RetryPolicy;
use crate::types::StoreMode;

impl TryFrom<RawConfig> for Config {
    type Error = crate::errors::WatchsumError;

    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        validate_hasher(&raw.hasher)?;
        validate_store(&raw.store)?;
        let exclude = compile_excludes(&raw.watch.exclude)?;

        Ok(Config {
            watch: WatchConfig {
                directory: raw.watch.directory.map(PathBuf::from),
                exclude_patterns: raw.watch.exclude,
                exclude,
            },
            store: StoreConfig {
                mode: raw.store.mode,
                path: PathBuf::from(raw.store.path),
            },
            hasher: HasherConfig {
                algorithm: raw.hasher.algorithm,
                retry: retry_policy(&raw.hasher),
            },
        })
    }
}

fn validate_hasher(section: &RawHasherSection) -> Result<()> {
    if section.max_retries == 0 {
        return Err(WatchsumError::ConfigError(
            "[hasher].max_retries must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_store(section: &RawStoreSection) -> Result<()> {
    if section.mode == StoreMode::Sqlite && section.path.trim().is_empty() {
        return Err(WatchsumError::ConfigError(
            "[store].path must not be empty when mode = \"sqlite\"".to_string(),
        ));
    }
    Ok(())
}

/// Compile exclude patterns into a single matcher.
fn compile_excludes(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| {
            WatchsumError::ConfigError(format!(
                "invalid exclude pattern '{}': {}",
                pattern, err
            ))
        })?;
        builder.add(glob);
    }
    let set = builder.build().map_err(|err| {
        WatchsumError::ConfigError(format!("failed to compile exclude patterns: {}", err))
    })?;
    Ok(Some(set))
}

fn retry_policy(section: &RawHasherSection) -> RetryPolicy {
    let policy = RetryPolicy::new(
        section.max_retries,
        Duration::from_millis(section.retry_delay_ms),
    );
    match section.total_budget_ms {
        Some(ms) => policy.with_total_budget(Duration::from_millis(ms)),
        None => policy,
    }
}
