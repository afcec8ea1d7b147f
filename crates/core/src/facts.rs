//! Flat fact stores.
//!
//! A [`FactStore`] maps path strings (see [`crate::path`]) to value-tree
//! nodes. Stores are built by flattening: every reachable scalar and every
//! composite node below the prefix gets exactly one key, and composites keep
//! their whole subtree under their own key.

use std::collections::BTreeMap;

use crate::path::Path;
use crate::value::Value;

/// Root of the configuration facts.
pub const CONFIG: &str = "CONFIG";
/// Root of the running entity facts.
pub const ENTITY: &str = "ENTITY";
/// Identity of the current running entity.
pub const ENTITY_ID: &str = "ENTITY_ID";
/// Root of the facts describing the request that was sent.
pub const REQUEST: &str = "REQUEST";
/// Root of the facts describing the response that was received.
pub const RESPONSE: &str = "RESPONSE";

/// A flattened path → value map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactStore(BTreeMap<String, Value>);

impl FactStore {
    pub fn new() -> Self {
        FactStore(BTreeMap::new())
    }

    /// Flatten `value` under `prefix`.
    ///
    /// The root composite itself is only keyed when the prefix is non-empty;
    /// an empty prefix has no key of its own.
    pub fn flatten(value: &Value, prefix: &Path) -> FactStore {
        let mut store = FactStore::new();
        store.insert_flattened(value, prefix);
        store
    }

    /// Flatten `value` into this store, overwriting colliding keys.
    pub fn insert_flattened(&mut self, value: &Value, prefix: &Path) {
        if !prefix.is_empty() {
            self.0.insert(prefix.to_string(), value.clone());
        }
        match value {
            Value::Object(fields) => {
                for (key, child) in fields {
                    self.insert_flattened(child, &prefix.field(key.clone()));
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    self.insert_flattened(child, &prefix.index(index));
                }
            }
            Value::Scalar(_) | Value::Null => {}
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_path(&self, path: &Path) -> Option<&Value> {
        self.0.get(&path.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Keys of both stores; `other` wins on conflict.
    pub fn merge(&self, other: &FactStore) -> FactStore {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        FactStore(merged)
    }

    /// `other` alone; the destination is discarded.
    pub fn replace(&self, other: &FactStore) -> FactStore {
        other.clone()
    }

    /// Entries whose key is `root` or lies below it.
    pub fn subset(&self, root: &str) -> FactStore {
        FactStore(
            self.0
                .iter()
                .filter(|(k, _)| is_under(k, root))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Every entry except those at or below `root`.
    pub fn without(&self, root: &str) -> FactStore {
        FactStore(
            self.0
                .iter()
                .filter(|(k, _)| !is_under(k, root))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

fn is_under(key: &str, root: &str) -> bool {
    match key.strip_prefix(root) {
        Some("") => true,
        Some(rest) => rest.starts_with('.') || rest.starts_with('['),
        None => false,
    }
}

impl FromIterator<(String, Value)> for FactStore {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        FactStore(iter.into_iter().collect())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
