use std::collections::HashMap;

use proptest::prelude::*;

use watchsum::hash::Digest;
use watchsum::store::{IntegrityStore, MemoryStore, SqliteDatabase};

/// One baseline mutation. Keys come from a small space so generated
/// sequences hit overwrites, renames onto live destinations and self-renames
/// often.
#[derive(Debug, Clone)]
enum Op {
    Put(u8, u8),
    Delete(u8),
    Rename(u8, u8),
}

const KEY_SPACE: u8 = 8;

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..KEY_SPACE, any::<u8>()).prop_map(|(k, v)| Op::Put(k, v)),
        (0..KEY_SPACE).prop_map(Op::Delete),
        (0..KEY_SPACE, 0..KEY_SPACE).prop_map(|(a, b)| Op::Rename(a, b)),
    ]
}

fn key(k: u8) -> String {
    format!("/data/file-{k}.txt")
}

fn digest(v: u8) -> Digest {
    Digest::from(format!("{v:064x}"))
}

/// Apply the same ops to the store under test and to a plain map, then
/// require they agree on every key and on the total count.
fn check_against_model(store: &dyn IntegrityStore, ops: &[Op]) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, Digest> = HashMap::new();

    for op in ops {
        match op {
            Op::Put(k, v) => {
                store.put(&key(*k), &digest(*v)).unwrap();
                model.insert(key(*k), digest(*v));
            }
            Op::Delete(k) => {
                store.delete(&key(*k)).unwrap();
                model.remove(&key(*k));
            }
            Op::Rename(a, b) => {
                store.rename(&key(*a), &key(*b)).unwrap();
                if let Some(d) = model.remove(&key(*a)) {
                    model.insert(key(*b), d);
                }
            }
        }
    }

    prop_assert_eq!(store.len().unwrap(), model.len());
    for k in 0..KEY_SPACE {
        prop_assert_eq!(
            store.lookup(&key(k)).unwrap(),
            model.get(&key(k)).cloned(),
            "stores disagree on {}",
            key(k)
        );
    }
    Ok(())
}

proptest! {
    #[test]
    fn sqlite_store_agrees_with_a_plain_map(
        ops in proptest::collection::vec(op_strategy(), 1..64)
    ) {
        let db = SqliteDatabase::in_memory().unwrap();
        check_against_model(&db, &ops)?;
    }

    #[test]
    fn memory_store_agrees_with_a_plain_map(
        ops in proptest::collection::vec(op_strategy(), 1..64)
    ) {
        let store = MemoryStore::new();
        check_against_model(&store, &ops)?;
    }
}
