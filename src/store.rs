//! Persisted Set Store
//!
//! The durable record of which navigation keys render expanded. The in-memory
//! set is authoritative during a page's lifetime; every mutation is followed by
//! a full overwrite of the stored value so a page unload never loses a
//! completed toggle.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::path::CanonicalPath;
use crate::storage::Storage;

pub struct PersistedSetStore {
    storage: Rc<dyn Storage>,
    key: String,
    entries: BTreeSet<CanonicalPath>,
}

/// Parse a stored value. Anything that is not a JSON array yields an empty set.
///
/// Non-string entries are skipped; string entries are re-normalized.
pub fn parse_persisted(raw: Option<&str>) -> BTreeSet<CanonicalPath> {
    let Some(raw) = raw else {
        return BTreeSet::new();
    };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(CanonicalPath::new)
            .collect(),
        Ok(other) => {
            log::warn!(
                "[ThemeNative] Persisted expansion set is not an array ({}), ignoring",
                json_kind(&other)
            );
            BTreeSet::new()
        }
        Err(e) => {
            log::warn!("[ThemeNative] Persisted expansion set is malformed: {}", e);
            BTreeSet::new()
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl PersistedSetStore {
    /// Read the set once. Never fails.
    pub fn load(storage: Rc<dyn Storage>, key: &str) -> Self {
        let entries = parse_persisted(storage.get_item(key).as_deref());
        Self {
            storage,
            key: key.to_string(),
            entries,
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    pub fn contains(&self, path: &CanonicalPath) -> bool {
        self.entries.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalPath> {
        self.entries.iter()
    }

    /// Sorted snapshot of the members.
    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().map(|p| p.as_str().to_string()).collect()
    }

    /// Full overwrite of the stored value.
    pub fn save(&self) {
        let members: Vec<&str> = self.entries.iter().map(CanonicalPath::as_str).collect();
        let data = match serde_json::to_string(&members) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("[ThemeNative] Could not serialize expansion set: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set_item(&self.key, &data) {
            log::warn!("[ThemeNative] Could not persist expansion set: {}", e);
        }
    }

    /// Insert and flush. Returns whether membership changed.
    pub fn add(&mut self, path: &CanonicalPath) -> bool {
        let changed = self.entries.insert(path.clone());
        self.save();
        changed
    }

    /// Remove and flush. Returns whether membership changed.
    pub fn remove(&mut self, path: &CanonicalPath) -> bool {
        let changed = self.entries.remove(path);
        self.save();
        changed
    }

    /// Remove every given path, then flush once. The stored value is never
    /// observed with only part of the batch applied.
    pub fn remove_all<'a, I>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = &'a CanonicalPath>,
    {
        let removed = paths
            .into_iter()
            .filter(|path| self.entries.remove(*path))
            .count();
        self.save();
        removed
    }

    /// Insert every given path, then flush once.
    pub fn add_all<'a, I>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = &'a CanonicalPath>,
    {
        let added = paths
            .into_iter()
            .filter(|path| self.entries.insert((*path).clone()))
            .count();
        self.save();
        added
    }
}
