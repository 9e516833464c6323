// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! NOTE: this expects `clap` to be built with the `derive` feature, e.g.:
//! `clap = { version = "4.5.53", features = ["derive"] }` in `Cargo.toml`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `watchsum`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchsum",
    version,
    about = "Monitor a directory tree and record file integrity changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to monitor.
    ///
    /// Takes precedence over `[watch].directory` in the config file.
    #[arg(value_name = "DIR")]
    pub directory: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Watchsum.toml` in the current working directory. Running
    /// without one is fine; every setting has a default.
    #[arg(long, value_name = "PATH", default_value = "Watchsum.toml")]
    pub config: String,

    /// Baseline database location.
    ///
    /// Overrides `[store].path`. Relative paths resolve against the
    /// monitored directory.
    #[arg(long, value_name = "PATH")]
    pub db: Option<String>,

    /// Keep the baseline in memory instead of on disk.
    ///
    /// Nothing survives the process; useful for ad-hoc sessions.
    #[arg(long)]
    pub memory: bool,

    /// Digest algorithm (blake3, sha256).
    ///
    /// Overrides `[hasher].algorithm`.
    #[arg(long, value_name = "ALGO")]
    pub algorithm: Option<String>,

    /// Read attempts per file before giving up.
    ///
    /// Overrides `[hasher].max_retries`.
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Pause between read attempts, in milliseconds.
    ///
    /// Overrides `[hasher].retry_delay_ms`.
    #[arg(long, value_name = "MS")]
    pub retry_delay_ms: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHSUM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the recorded audit trail as JSON lines and exit.
    #[arg(long)]
    pub dump_audit: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
