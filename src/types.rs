use std::str::FromStr;
use serde::Deserialize;

/// Digest algorithm used for file content hashing.
///
/// Both algorithms produce a 256-bit digest rendered as 64 lowercase hex
/// characters, so stored baselines are shape-compatible regardless of the
/// configured algorithm. Comparing digests from different algorithms is
/// still meaningless; pick one per baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Blake3,
    Sha256,
}

impl Default for DigestAlgorithm {
    fn default() -> Self {
        DigestAlgorithm::Blake3
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blake3" => Ok(DigestAlgorithm::Blake3),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            other => Err(format!(
                "invalid digest algorithm: {other} (expected \"blake3\" or \"sha256\")"
            )),
        }
    }
}

/// Mode for storing the integrity baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// Store the baseline in a SQLite database (`.watchsum/baseline.db`).
    Sqlite,
    /// Store the baseline in memory only (lost on restart).
    Memory,
}

impl Default for StoreMode {
    fn default() -> Self {
        StoreMode::Sqlite
    }
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreMode::Sqlite),
            "memory" => Ok(StoreMode::Memory),
            other => Err(format!(
                "invalid store mode: {other} (expected \"sqlite\" or \"memory\")"
            )),
        }
    }
}
