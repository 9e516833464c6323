// src/lib.rs

pub mod audit;
pub mod classify;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod hash;
pub mod logging;
pub mod store;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::audit::AuditLog;
use crate::classify::Classifier;
use crate::cli::CliArgs;
use crate::config::loader::{default_config, default_config_path, load_and_validate};
use crate::config::model::Config;
use crate::errors::{Result, WatchsumError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::hash::{FileHasher, RetryPolicy};
use crate::store::{IntegrityStore, MemoryAuditLog, MemoryStore, SqliteDatabase};
use crate::types::{DigestAlgorithm, StoreMode};
use crate::watch::WatchController;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading + CLI overrides
/// - baseline store and audit log
/// - hasher and classifier
/// - the watch session
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config = resolve_config(&args)?;

    // Store + audit backends from [store].
    let (store, audit) = build_backends(&config)?;

    if args.dump_audit {
        return dump_audit(audit.as_ref());
    }

    let directory = config.watch.directory.clone().ok_or_else(|| {
        WatchsumError::ConfigError(
            "no directory to monitor; pass one on the command line or set [watch].directory"
                .to_string(),
        )
    })?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let hasher = FileHasher::new(
        Arc::clone(&fs),
        config.hasher.algorithm,
        config.hasher.retry,
    );
    let classifier = Arc::new(Classifier::new(hasher, store, audit));
    let controller = WatchController::new(fs, classifier, config.watch.exclude.clone());

    controller.start(&directory)?;

    // Ctrl-C → graceful shutdown.
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    controller.stop();

    Ok(())
}

/// Load the config file (if any) and fold CLI overrides into it.
///
/// A missing file at the default location is fine; a missing file the user
/// named explicitly is an error.
fn resolve_config(args: &CliArgs) -> Result<Config> {
    let config_path = PathBuf::from(&args.config);
    let mut config = if config_path.exists() {
        load_and_validate(&config_path)?
    } else if config_path == default_config_path() {
        debug!("no config file found; using defaults");
        default_config()?
    } else {
        return Err(WatchsumError::ConfigError(format!(
            "config file not found: {}",
            config_path.display()
        )));
    };

    if let Some(directory) = &args.directory {
        config.watch.directory = Some(PathBuf::from(directory));
    }
    if let Some(db) = &args.db {
        config.store.path = PathBuf::from(db);
    }
    if args.memory {
        config.store.mode = StoreMode::Memory;
    }
    if let Some(algorithm) = &args.algorithm {
        config.hasher.algorithm = algorithm
            .parse::<DigestAlgorithm>()
            .map_err(WatchsumError::ConfigError)?;
    }
    if args.max_retries.is_some() || args.retry_delay_ms.is_some() {
        let max_attempts = args.max_retries.unwrap_or(config.hasher.retry.max_attempts);
        if max_attempts == 0 {
            return Err(WatchsumError::ConfigError(
                "--max-retries must be >= 1 (got 0)".to_string(),
            ));
        }
        let delay = args
            .retry_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(config.hasher.retry.delay);
        // Rebuilding also re-derives the total budget from the new values.
        config.hasher.retry = RetryPolicy::new(max_attempts, delay);
    }

    Ok(config)
}

fn build_backends(config: &Config) -> Result<(Arc<dyn IntegrityStore>, Arc<dyn AuditLog>)> {
    match config.store.mode {
        StoreMode::Sqlite => {
            let path = resolve_store_path(config);
            let db = SqliteDatabase::open(&path)?;
            info!(path = %path.display(), "opened baseline database");
            Ok((Arc::new(db.clone()), Arc::new(db)))
        }
        StoreMode::Memory => {
            debug!("using in-memory baseline; nothing survives the process");
            Ok((
                Arc::new(MemoryStore::new()),
                Arc::new(MemoryAuditLog::new()),
            ))
        }
    }
}

/// Resolve a relative `[store].path` against the monitored directory, falling
/// back to the working directory when none is configured (e.g. `--dump-audit`
/// without a directory).
fn resolve_store_path(config: &Config) -> PathBuf {
    let path = &config.store.path;
    if path.is_absolute() {
        return path.clone();
    }
    match &config.watch.directory {
        Some(dir) => dir.join(path),
        None => path.clone(),
    }
}

/// Print the audit trail to stdout, one JSON object per line.
fn dump_audit(audit: &dyn AuditLog) -> Result<()> {
    for entry in audit.entries()? {
        println!("{}", serde_json::to_string(&entry)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(directory: Option<&str>) -> CliArgs {
        CliArgs {
            directory: directory.map(String::from),
            config: "Watchsum.toml".to_string(),
            db: None,
            memory: false,
            algorithm: None,
            max_retries: None,
            retry_delay_ms: None,
            log_level: None,
            dump_audit: false,
        }
    }

    #[test]
    fn cli_directory_overrides_defaults() {
        let config = resolve_config(&args(Some("/srv/shared"))).unwrap();
        assert_eq!(
            config.watch.directory.as_deref(),
            Some(std::path::Path::new("/srv/shared"))
        );
    }

    #[test]
    fn memory_flag_switches_store_mode() {
        let mut cli = args(None);
        cli.memory = true;
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.store.mode, StoreMode::Memory);
    }

    #[test]
    fn bad_algorithm_override_is_a_config_error() {
        let mut cli = args(None);
        cli.algorithm = Some("md5".to_string());
        let err = resolve_config(&cli).unwrap_err();
        assert!(matches!(err, WatchsumError::ConfigError(_)));
    }

    #[test]
    fn retry_flags_rebuild_the_policy() {
        let mut cli = args(None);
        cli.max_retries = Some(5);
        cli.retry_delay_ms = Some(200);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.hasher.retry.max_attempts, 5);
        assert_eq!(config.hasher.retry.delay, Duration::from_millis(200));
        assert_eq!(
            config.hasher.retry.total_budget,
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn zero_max_retries_on_the_cli_is_rejected() {
        let mut cli = args(None);
        cli.max_retries = Some(0);
        let err = resolve_config(&cli).unwrap_err();
        assert!(matches!(err, WatchsumError::ConfigError(_)));
    }

    #[test]
    fn explicitly_named_missing_config_is_an_error() {
        let mut cli = args(None);
        cli.config = "/no/such/dir/Other.toml".to_string();
        let err = resolve_config(&cli).unwrap_err();
        assert!(matches!(err, WatchsumError::ConfigError(_)));
    }

    #[test]
    fn relative_store_path_resolves_against_directory() {
        let config = resolve_config(&args(Some("/srv/shared"))).unwrap();
        assert_eq!(
            resolve_store_path(&config),
            PathBuf::from("/srv/shared/.watchsum/baseline.db")
        );
    }
}
