//! Multi-entry indexes: element expansion, membership matching, uniqueness.

#![allow(clippy::unwrap_used)]

use cairn::{
    CursorPolicy, Direction, EngineError, IndexOptions, Key, KeyPath, KeyRange, ObjectStore,
    StoreOptions, TransactionMode,
};
use cairn_store::backends::MemoryStore;
use serde_json::json;

const MULTI: IndexOptions = IndexOptions { unique: false, multi_entry: true };

fn store() -> ObjectStore {
    let store = ObjectStore::create(
        MemoryStore::new(),
        "people",
        StoreOptions { auto_increment: true },
    )
    .unwrap();
    store.begin(TransactionMode::VersionChange).unwrap();
    store
}

#[test]
fn duplicate_elements_collapse_within_one_record() {
    let store = store();
    store.put(&json!({"nums": [1, 2, 2, 3]}), None).unwrap();
    let idx = store
        .create_index("nums", KeyPath::single("nums"), MULTI)
        .unwrap();

    // Three distinct entries, not four.
    assert_eq!(idx.count(None).unwrap(), 3);

    // A range pinned to the duplicated element matches the record once.
    let pinned = KeyRange::only(Key::Number(2.0));
    assert_eq!(idx.count(Some(pinned.clone())).unwrap(), 1);
    assert_eq!(idx.get_all(Some(pinned), None).unwrap().len(), 1);
}

#[test]
fn cursor_yields_one_position_per_element() {
    let store = store();
    store
        .put(&json!({"id": 1, "name": "Ann", "tags": ["x", "y"]}), None)
        .unwrap();
    let tag_idx = store
        .create_index("tagIdx", KeyPath::single("tags"), MULTI)
        .unwrap();

    let positions: Vec<_> = tag_idx
        .open_cursor(None, Direction::Forward, CursorPolicy::Duplicates)
        .unwrap()
        .collect();
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].key, Key::String("x".into()));
    assert_eq!(positions[1].key, Key::String("y".into()));
    for position in &positions {
        assert_eq!(position.primary_key, Key::Number(1.0));
        assert_eq!(position.value.as_ref().unwrap()["name"], json!("Ann"));
    }
}

#[test]
fn get_all_emits_a_record_once_per_matching_element() {
    let store = store();
    store.put(&json!({"tags": ["x", "y"]}), None).unwrap();
    store.put(&json!({"tags": ["y", "z"]}), None).unwrap();
    let idx = store
        .create_index("tagIdx", KeyPath::single("tags"), MULTI)
        .unwrap();

    // Entries in element order: x(1), y(1), y(2), z(2).
    let all = idx.get_all(None, None).unwrap();
    assert_eq!(all.len(), 4);
    let keys = idx.get_all_keys(None, None).unwrap();
    assert_eq!(
        keys,
        vec![
            Key::Number(1.0),
            Key::Number(1.0),
            Key::Number(2.0),
            Key::Number(2.0),
        ]
    );

    // Membership lookup, not equality against the packed array.
    let y_only = idx
        .get_all_keys(Some(KeyRange::only(Key::String("y".into()))), None)
        .unwrap();
    assert_eq!(y_only, vec![Key::Number(1.0), Key::Number(2.0)]);
}

#[test]
fn range_queries_match_by_element_membership() {
    let store = store();
    store.put(&json!({"nums": [1, 5, 9]}), None).unwrap();
    store.put(&json!({"nums": [20]}), None).unwrap();
    let idx = store
        .create_index("nums", KeyPath::single("nums"), MULTI)
        .unwrap();

    let range = KeyRange::bound(Key::Number(4.0), Key::Number(10.0), false, false);
    let keys = idx.get_all_keys(Some(range.clone()), None).unwrap();
    // Elements 5 and 9 both fall in range, both owned by record 1.
    assert_eq!(keys, vec![Key::Number(1.0), Key::Number(1.0)]);
    assert_eq!(idx.count(Some(range)).unwrap(), 2);
}

#[test]
fn non_array_keys_behave_as_single_entries() {
    let store = store();
    store.put(&json!({"tag": "solo"}), None).unwrap();
    let idx = store
        .create_index("tag", KeyPath::single("tag"), MULTI)
        .unwrap();

    assert_eq!(idx.count(None).unwrap(), 1);
    assert_eq!(
        idx.get_key(Key::String("solo".into())).unwrap(),
        Some(Key::Number(1.0))
    );
}

#[test]
fn an_array_key_never_equals_its_packed_elements() {
    let store = store();
    store.put(&json!({"tags": ["x", "y"]}), None).unwrap();
    let idx = store
        .create_index("tagIdx", KeyPath::single("tags"), MULTI)
        .unwrap();

    // Querying for the array itself matches nothing; only elements exist.
    let array_key = Key::Array(vec![Key::String("x".into()), Key::String("y".into())]);
    assert_eq!(idx.count(Some(KeyRange::only(array_key))).unwrap(), 0);
}

#[test]
fn unique_multi_entry_backfill_detects_cross_record_overlap() {
    let store = store();
    store.put(&json!({"tags": ["x"]}), None).unwrap();
    store.put(&json!({"tags": ["x", "z"]}), None).unwrap();

    let err = store
        .create_index(
            "tagIdx",
            KeyPath::single("tags"),
            IndexOptions { unique: true, multi_entry: true },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Constraint(_)));
    assert!(store.index("tagIdx").is_err());
}

#[test]
fn unique_multi_entry_put_detects_shared_elements() {
    let store = store();
    store.put(&json!({"tags": ["x"]}), None).unwrap();
    store
        .create_index(
            "tagIdx",
            KeyPath::single("tags"),
            IndexOptions { unique: true, multi_entry: true },
        )
        .unwrap();

    let err = store.put(&json!({"tags": ["y", "x"]}), None).unwrap_err();
    assert!(matches!(err, EngineError::Constraint(_)));
}

#[test]
fn unique_multi_entry_allows_duplicates_within_one_record() {
    let store = store();
    store.put(&json!({"tags": ["x", "x"]}), None).unwrap();
    let idx = store
        .create_index(
            "tagIdx",
            KeyPath::single("tags"),
            IndexOptions { unique: true, multi_entry: true },
        )
        .unwrap();
    assert_eq!(idx.count(None).unwrap(), 1);
}
