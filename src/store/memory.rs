//! In-memory key/value record store
//!
//! Entries keep their insertion order: replacing a key keeps its position,
//! deleting and re-inserting moves it to the end.

use super::record::{hand_out, Record};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Read access the search engine needs from a record container
pub trait RecordSource {
    /// Consistent copy of every entry, in iteration order
    fn snapshot(&self) -> Vec<(String, Arc<Record>)>;
}

#[derive(Default)]
struct Entries {
    next_seq: u64,
    slots: HashMap<String, u64>,
    ordered: BTreeMap<u64, (String, Arc<Record>)>,
}

impl Entries {
    fn get(&self, key: &str) -> Option<&Arc<Record>> {
        let seq = self.slots.get(key)?;
        self.ordered.get(seq).map(|(_, record)| record)
    }

    /// Insert or replace, returning true when the key already existed
    fn upsert(&mut self, key: &str, record: Arc<Record>) -> bool {
        if let Some(seq) = self.slots.get(key) {
            self.ordered.insert(*seq, (key.to_string(), record));
            return true;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(key.to_string(), seq);
        self.ordered.insert(seq, (key.to_string(), record));
        false
    }

    fn remove(&mut self, key: &str) {
        if let Some(seq) = self.slots.remove(key) {
            self.ordered.remove(&seq);
        }
    }

    fn iter(&self) -> impl Iterator<Item = &(String, Arc<Record>)> {
        self.ordered.values()
    }
}

/// Thread-safe in-memory record store
///
/// Writers are serialized behind a write lock; readers always receive
/// records handed out per their `RecordKind`.
#[derive(Default)]
pub struct Store {
    entries: RwLock<Entries>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record under `key`, replacing any previous value.
    ///
    /// Returns false (and stores nothing) when the key is empty.
    pub fn set(&self, key: &str, record: Record) -> bool {
        debug!("Storing data for key {}", key);

        if key.is_empty() {
            warn!("Error storing data for key: Required ID missing");
            return false;
        }

        let replaced = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .upsert(key, Arc::new(record));

        if replaced {
            warn!("The key {} already exists - Replacing!", key);
        }

        true
    }

    /// Retrieve a record: a private copy for cacheable records, the shared
    /// instance for pass-through records
    pub fn get(&self, key: &str) -> Option<Arc<Record>> {
        debug!("Retrieving data for key {}", key);

        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).map(hand_out)
    }

    pub fn exists(&self, key: &str) -> bool {
        debug!("Checking if data exists for key {}", key);

        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .contains_key(key)
    }

    /// Remove a record. Succeeds whether or not the key was present.
    pub fn delete(&self, key: &str) -> bool {
        debug!("Deleting data with key {}", key);

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);

        true
    }

    /// All records whose `property` field equals `value`, in store order
    pub fn get_by_property(&self, property: &str, value: &Value) -> Vec<Arc<Record>> {
        debug!("Retrieving data that has property {}={}", property, value);

        self.get_where(property, |field| field == value)
    }

    /// All records holding `property` with a value accepted by `matches`,
    /// in store order
    pub fn get_where<F>(&self, property: &str, matches: F) -> Vec<Arc<Record>>
    where
        F: Fn(&Value) -> bool,
    {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|(_, record)| record.get(property).is_some_and(&matches))
            .map(|(_, record)| hand_out(record))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in store order
    pub fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().map(|(key, _)| key.clone()).collect()
    }
}

impl RecordSource for Store {
    fn snapshot(&self) -> Vec<(String, Arc<Record>)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .map(|(key, record)| (key.clone(), Arc::clone(record)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn test_set_rejects_empty_key() {
        let store = Store::new();
        assert!(!store.set("", record(json!({"id": "x"}))));
        assert!(store.is_empty());
        assert!(!store.exists(""));
    }

    #[test]
    fn test_set_replaces_existing() {
        let store = Store::new();
        assert!(store.set("k", record(json!({"id": "k", "v": 1}))));
        assert!(store.set("k", record(json!({"id": "k", "v": 2}))));

        assert_eq!(store.len(), 1);
        let fetched = store.get("k").unwrap();
        assert_eq!(fetched.get("v"), Some(&json!(2)));
    }

    #[test]
    fn test_replace_keeps_position() {
        let store = Store::new();
        store.set("a", record(json!({"id": "a"})));
        store.set("b", record(json!({"id": "b"})));
        store.set("a", record(json!({"id": "a", "v": 2})));

        assert_eq!(store.keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_reinsert_after_delete_moves_to_end() {
        let store = Store::new();
        store.set("a", record(json!({"id": "a"})));
        store.set("b", record(json!({"id": "b"})));
        store.delete("a");
        store.set("a", record(json!({"id": "a"})));

        assert_eq!(store.keys(), vec!["b", "a"]);
    }

    #[test]
    fn test_get_missing() {
        let store = Store::new();
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn test_get_returns_copy_for_cacheable() {
        let store = Store::new();
        store.set("k", record(json!({"id": "k"})));

        let first = store.get("k").unwrap();
        let second = store.get("k").unwrap();
        assert_eq!(first, second);
        assert!(!Arc::ptr_eq(&first, &second));

        // mutating a handed-out copy leaves the store untouched
        let mut copy = Record::clone(&first);
        copy.insert("id", "changed");
        assert_eq!(store.get("k").unwrap().id(), Some("k"));
    }

    #[test]
    fn test_get_shares_pass_through() {
        let store = Store::new();
        let fields = json!({"id": "session-1", "user": "alice"})
            .as_object()
            .cloned()
            .unwrap();
        store.set("session-1", Record::pass_through(fields));

        let first = store.get("session-1").unwrap();
        let second = store.get("session-1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_exists_and_delete() {
        let store = Store::new();
        store.set("k", record(json!({"id": "k"})));
        assert!(store.exists("k"));

        assert!(store.delete("k"));
        assert!(!store.exists("k"));
        // deleting again still succeeds
        assert!(store.delete("k"));
        assert!(store.delete("never-there"));
    }

    #[test]
    fn test_get_by_property() {
        let store = Store::new();
        store.set("1", record(json!({"id": "1", "type": "X"})));
        store.set("2", record(json!({"id": "2", "type": "Y"})));
        store.set("3", record(json!({"id": "3", "type": "X"})));
        store.set("4", record(json!({"id": "4"})));

        let found = store.get_by_property("type", &json!("X"));
        let ids: Vec<_> = found.iter().filter_map(|r| r.id()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_get_by_property_is_equality_not_pattern() {
        let store = Store::new();
        store.set("1", record(json!({"id": "1", "type": "Xylophone"})));
        store.set("2", record(json!({"id": "2", "count": 3})));

        assert!(store.get_by_property("type", &json!("X")).is_empty());
        assert_eq!(store.get_by_property("count", &json!(3)).len(), 1);
        assert!(store.get_by_property("count", &json!("3")).is_empty());
    }

    #[test]
    fn test_get_where_accepts_either_form() {
        let store = Store::new();
        store.set("1", record(json!({"id": "1", "zip": "12345"})));
        store.set("2", record(json!({"id": "2", "zip": 12345})));
        store.set("3", record(json!({"id": "3"})));

        let raw = json!("12345");
        let parsed = json!(12345);
        let found = store.get_where("zip", |v| *v == raw || *v == parsed);
        let ids: Vec<_> = found.iter().filter_map(|r| r.id()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_snapshot_order() {
        let store = Store::new();
        store.set("c", record(json!({"id": "c"})));
        store.set("a", record(json!({"id": "a"})));
        store.set("b", record(json!({"id": "b"})));

        let keys: Vec<_> = store.snapshot().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(Store::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let key = format!("{}-{}", t, i);
                        store.set(&key, record(json!({"id": key})));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 400);
    }
}
