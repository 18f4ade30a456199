//! Integration tests for the storage operations of an active façade.

use serde_json::{Value, json};
use webstore::prelude::*;
use webstore_test::{EventRecorder, test_config, test_config_notify_all, test_host};

fn active() -> WebStorage {
    // No runtime here, so activation completes inline.
    let storage = WebStorage::new(test_config(), test_host());
    assert!(storage.is_active());
    storage
}

#[test]
fn set_then_get_round_trips_values() {
    let storage = active();
    let values = [
        json!("text"),
        json!(42),
        json!(-1.5),
        json!(true),
        json!([1, "two", {"three": 3}]),
        json!({"nested": {"list": [1, 2, 3], "flag": false}}),
    ];

    for (i, value) in values.iter().enumerate() {
        let key = format!("k{i}");
        assert!(storage.set(&key, value));
        assert_eq!(storage.get::<Value>(&key).as_ref(), Some(value));
    }
}

#[test]
fn remove_returns_previous_value_then_default() {
    let storage = active();
    storage.set("key", &json!({"a": 1}));

    assert_eq!(storage.remove::<Value>("key"), Some(json!({"a": 1})));
    assert_eq!(storage.get::<Value>("key"), None);
    assert_eq!(storage.get_or("key", json!("default")), json!("default"));
}

#[test]
fn remove_of_missing_key_returns_none() {
    let storage = active();
    assert_eq!(storage.remove::<String>("absent"), None);
}

#[test]
fn pull_is_get_then_remove() {
    let storage = active();
    storage.set("token", &"abc");
    let recorder = EventRecorder::attach(storage.events());

    assert_eq!(storage.pull::<String>("token").as_deref(), Some("abc"));
    assert!(!storage.has("token"));

    let changes = recorder.changes();
    assert_eq!(changes[0].kind, EventKind::Get);
    assert_eq!(changes[0].new_value, Some(json!("abc")));
    assert_eq!(changes[1].kind, EventKind::Remove);
    assert_eq!(changes[1].old_value, Some(json!("abc")));
    assert_eq!(
        recorder
            .kinds()
            .iter()
            .filter(|k| matches!(k, EventKind::Get | EventKind::Remove))
            .count(),
        3,
        "one get and one remove from pull, one get from has"
    );
}

#[test]
fn pull_or_uses_default_for_missing_key() {
    let storage = active();
    assert_eq!(storage.pull_or("missing", 7u8), 7);
}

#[test]
fn length_tracks_visible_keys() {
    let storage = active();
    assert_eq!(storage.len(), 0);
    assert!(storage.is_empty());

    storage.set("a", &1);
    storage.set("b", &2);
    storage.set("a", &3);
    assert_eq!(storage.len(), 2);

    assert_eq!(storage.remove_all(), 2);
    assert_eq!(storage.len(), 0);
}

#[test]
fn scenario_set_get_remove_with_default_config() {
    let storage = WebStorage::new(
        WebStorageConfig::default()
            .with_prefix("__")
            .with_provider(LOCAL_STORAGE),
        test_host(),
    );

    storage.set("key", &"val");
    assert_eq!(storage.get::<String>("key").as_deref(), Some("val"));
    assert_eq!(storage.remove::<String>("key").as_deref(), Some("val"));
    assert_eq!(storage.len(), 0);
}

#[test]
fn scenario_keys_and_get_all_in_enumeration_order() {
    let storage = active();
    storage.set("a", &1);
    storage.set("b", &2);

    assert_eq!(storage.keys(), vec!["a", "b"]);

    let all = storage.get_all();
    assert_eq!(Value::Object(all), json!({"a": 1, "b": 2}));
}

#[test]
fn remove_all_leaves_foreign_entries_alone() {
    let host = test_host();
    let store = host.store(LOCAL_STORAGE).unwrap();
    store.set_item("theirs", "1").unwrap();

    let storage = WebStorage::new(test_config(), host);
    storage.set("a", &1);
    storage.set("b", &2);

    assert_eq!(storage.remove_all(), 2);
    assert_eq!(store.keys(), vec!["theirs"]);
}

#[test]
fn remove_all_emits_individual_and_aggregate_events() {
    let storage = WebStorage::new(test_config_notify_all(), test_host());
    storage.set("a", &1);
    storage.set("b", &2);
    let recorder = EventRecorder::attach(storage.events());

    assert_eq!(storage.remove_all(), 2);

    let removals: Vec<_> = recorder
        .changes()
        .into_iter()
        .filter(|e| e.kind != EventKind::Get)
        .collect();
    assert_eq!(removals.len(), 3);
    assert_eq!(removals[0].kind, EventKind::Remove);
    assert_eq!(removals[0].key, "a");
    assert_eq!(removals[1].key, "b");
    assert_eq!(removals[2].kind, EventKind::RemoveAll);
    assert_eq!(removals[2].new_value, Some(json!(2)));
}

#[test]
fn for_each_visits_every_entry_with_its_value() {
    let storage = active();
    storage.set("x", &"one");
    storage.set("y", &["two"]);

    let mut visited = Vec::new();
    storage.for_each(|value, key| visited.push((key.to_owned(), value)));

    assert_eq!(
        visited,
        vec![
            ("x".to_owned(), json!("one")),
            ("y".to_owned(), json!(["two"])),
        ]
    );
}

#[test]
fn keys_with_separator_in_logical_name_round_trip() {
    let storage = active();
    storage.set("user:42:name", &"ada");

    assert_eq!(storage.keys(), vec!["user:42:name"]);
    assert_eq!(storage.get::<String>("user:42:name").as_deref(), Some("ada"));
}

#[test]
fn prefixes_partition_one_backing_store() {
    let host = test_host();
    let first = WebStorage::new(test_config().with_prefix("one"), host.clone());
    let second = WebStorage::new(test_config().with_prefix("two"), host);

    first.set("k", &1);
    second.set("k", &2);

    assert_eq!(first.get::<i32>("k"), Some(1));
    assert_eq!(second.get::<i32>("k"), Some(2));
    assert_eq!(first.remove_all(), 1);
    assert_eq!(second.len(), 1);
}
