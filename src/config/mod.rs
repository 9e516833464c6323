// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model`: raw TOML-facing structs and the validated [`Config`]
//! - `loader`: file reading and the recommended entry points
//! - `validate`: `TryFrom<RawConfig>` plus the individual checks

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config, default_config_path, load_and_validate, load_from_path};
pub use model::{Config, HasherConfig, RawConfig, StoreConfig, WatchConfig};
pub use model::{DEFAULT_EXCLUDE, DEFAULT_STORE_PATH};
