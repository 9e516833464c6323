pub mod tree;

use std::sync::Once;
use std::time::{Duration, Instant};

use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use watchsum::hash::Digest;
use watchsum::store::IntegrityStore;

pub use tree::TempTree;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Interval between polls in the wait helpers.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Poll `pred` until it returns true or `timeout` passes.
///
/// Watcher backends deliver events with unpredictable latency, so
/// integration tests assert on outcomes by polling rather than sleeping a
/// fixed amount.
pub fn wait_until(timeout: Duration, pred: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if pred() {
            return true;
        }
        if Instant::now() >= deadline {
            debug!(?timeout, "wait_until gave up");
            return false;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Wait until the store reports a digest for `path`, returning it.
pub fn wait_for_digest(
    store: &dyn IntegrityStore,
    path: &str,
    timeout: Duration,
) -> Option<Digest> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(digest) = store.lookup(path).expect("store lookup failed") {
            return Some(digest);
        }
        if Instant::now() >= deadline {
            debug!(path, ?timeout, "wait_for_digest gave up");
            return None;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Wait until the store no longer has a digest for `path`.
pub fn wait_for_removal(store: &dyn IntegrityStore, path: &str, timeout: Duration) -> bool {
    wait_until(timeout, || {
        store.lookup(path).expect("store lookup failed").is_none()
    })
}
