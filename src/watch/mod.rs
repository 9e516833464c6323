// src/watch/mod.rs

//! File watching and session control.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Translating raw watcher notifications into [`ChangeEvent`]s, dropping
//!   directory noise and excluded paths on the way.
//! - Running the session lifecycle (start, stop, status) around a worker
//!   thread that feeds the classifier.
//!
//! It does **not** decide what a change means for the baseline; that is the
//! classifier's job.

pub mod controller;
pub mod events;

pub use controller::{SessionStatus, WatchController};
pub use events::{changes_from_notify, ChangeEvent, EventFilter};
