use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use watchsum::audit::{AuditLog, ChangeKind};
use watchsum::classify::Classifier;
use watchsum::config::default_config;
use watchsum::fs::{FileSystem, RealFileSystem};
use watchsum::hash::{FileHasher, RetryPolicy};
use watchsum::store::{IntegrityStore, SqliteDatabase};
use watchsum::types::DigestAlgorithm;
use watchsum::watch::WatchController;

use watchsum_test_utils::{init_tracing, wait_for_digest, wait_until, TempTree};

type TestResult = Result<(), Box<dyn Error>>;

const WAIT: Duration = Duration::from_secs(10);

fn key_for(root: &Path, rel: &str) -> String {
    root.join(rel).to_string_lossy().into_owned()
}

fn controller(db: SqliteDatabase) -> WatchController {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let hasher = FileHasher::new(
        Arc::clone(&fs),
        DigestAlgorithm::Blake3,
        RetryPolicy::new(3, Duration::from_millis(10)),
    );
    let store: Arc<dyn IntegrityStore> = Arc::new(db.clone());
    let audit: Arc<dyn AuditLog> = Arc::new(db);
    WatchController::new(fs, Arc::new(Classifier::new(hasher, store, audit)), None)
}

/// The point of the sqlite store: a second session over the same database
/// starts from the baseline the first one built, so a rewrite shows up as a
/// modification rather than a fresh add.
#[test]
fn baseline_and_audit_survive_restart() -> TestResult {
    init_tracing();

    let tree = TempTree::new();
    let db_home = TempTree::new(); // keep the store outside the watched tree
    let db_path = db_home.abs("baseline.db");
    let root = tree.canonical_path();
    let key = key_for(&root, "keep.txt");

    {
        let db = SqliteDatabase::open(&db_path)?;
        let ctl = controller(db.clone());
        ctl.start(tree.path())?;
        tree.write("keep.txt", "v1");
        wait_for_digest(&db, &key, WAIT).expect("file tracked in the first session");
        ctl.stop();
    }

    let db = SqliteDatabase::open(&db_path)?;
    let v1 = db.lookup(&key)?.expect("baseline persisted across restart");

    let ctl = controller(db.clone());
    ctl.start(tree.path())?;
    tree.write("keep.txt", "v2");
    assert!(
        wait_until(WAIT, || db
            .lookup(&key)
            .unwrap()
            .is_some_and(|d| d != v1)),
        "second session should record the rewrite against the old baseline"
    );
    ctl.stop();

    let entries = db.entries()?;
    assert!(
        entries
            .iter()
            .any(|e| e.kind == ChangeKind::Added && e.path == key),
        "first session recorded the add"
    );
    assert!(
        entries
            .iter()
            .any(|e| e.kind == ChangeKind::Modified && e.path == key),
        "second session recorded the change"
    );

    Ok(())
}

/// With the default excludes, a database living under the watched tree must
/// not feed its own writes back into the baseline.
#[test]
fn store_inside_the_watched_tree_is_not_tracked() -> TestResult {
    init_tracing();

    let tree = TempTree::new();
    let config = default_config()?;

    let db = SqliteDatabase::open(&tree.abs(".watchsum/baseline.db"))?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let hasher = FileHasher::new(
        Arc::clone(&fs),
        DigestAlgorithm::Blake3,
        RetryPolicy::new(3, Duration::from_millis(10)),
    );
    let store: Arc<dyn IntegrityStore> = Arc::new(db.clone());
    let audit: Arc<dyn AuditLog> = Arc::new(db.clone());
    let ctl = WatchController::new(
        fs,
        Arc::new(Classifier::new(hasher, store, audit)),
        config.watch.exclude.clone(),
    );

    ctl.start(tree.path())?;
    let root = tree.canonical_path();

    tree.write("real.txt", "content");
    wait_for_digest(&db, &key_for(&root, "real.txt"), WAIT)
        .expect("a normal file is tracked as usual");
    // Each classification writes to the database, which itself fires watcher
    // events; give any leakage time to show up before draining.
    std::thread::sleep(Duration::from_millis(400));
    ctl.stop();

    assert_eq!(db.len()?, 1, "only the real file may be tracked");
    assert!(
        db.entries()?.iter().all(|e| !e.path.contains(".watchsum")),
        "the store's own files must never appear in the audit trail"
    );

    Ok(())
}
