//! Change-tracked JSON mappings.
//!
//! Every [`TrackedMap`] inside one document holds a handle to the same
//! [`DirtyFlag`], so a write anywhere in the tree marks the whole document as
//! having unsaved changes. Nested objects are wrapped when they are stored,
//! which means a caller can walk down with [`TrackedMap::get_map_mut`] and
//! mutate in place without losing track of the change.
//!
//! `TrackedMap` intentionally does not implement `Clone`: a copy would either
//! share the flag (and surprise whoever mutates it) or detach from it (and
//! silently stop tracking). Snapshots for comparison are taken with
//! [`TrackedMap::to_json`], which yields a plain, untracked `serde_json::Value`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::{FstkError, Result};

/// Shared "unsaved changes" cell for one document tree.
///
/// Cloning the flag clones the handle, not the cell.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlag(Arc<AtomicBool>);

impl DirtyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn mark_dirty(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn mark_clean(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// True when both handles point at the same cell.
    pub fn shares_cell_with(&self, other: &DirtyFlag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A value stored in a [`TrackedMap`]: either a nested tracked mapping or a
/// plain JSON leaf (string, number, bool, null or array).
#[derive(Debug, PartialEq)]
pub enum TrackedValue {
    Map(TrackedMap),
    Plain(Value),
}

impl TrackedValue {
    fn wrap(value: Value, flag: &DirtyFlag) -> Self {
        match value {
            Value::Object(map) => Self::Map(TrackedMap::from_json(map, flag)),
            other => Self::Plain(other),
        }
    }

    pub fn as_map(&self) -> Option<&TrackedMap> {
        match self {
            Self::Map(map) => Some(map),
            Self::Plain(_) => None,
        }
    }

    pub fn as_plain(&self) -> Option<&Value> {
        match self {
            Self::Map(_) => None,
            Self::Plain(value) => Some(value),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_plain().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_plain().and_then(Value::as_i64)
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_plain().and_then(Value::as_u64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_plain().and_then(Value::as_bool)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Plain(Value::Null))
    }

    /// Untracked deep copy.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Map(map) => map.to_json(),
            Self::Plain(value) => value.clone(),
        }
    }
}

impl Serialize for TrackedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Map(map) => map.serialize(serializer),
            Self::Plain(value) => value.serialize(serializer),
        }
    }
}

/// Insertion-ordered string-keyed mapping that reports every mutation to a
/// shared [`DirtyFlag`].
#[derive(Debug)]
pub struct TrackedMap {
    entries: Vec<(String, TrackedValue)>,
    flag: DirtyFlag,
}

impl TrackedMap {
    /// Empty mapping bound to `flag`. Does not touch the flag.
    pub fn new(flag: DirtyFlag) -> Self {
        Self {
            entries: Vec::new(),
            flag,
        }
    }

    /// Deep-wrap a JSON object so that every nested object shares `flag`.
    /// Does not touch the flag.
    pub fn from_json(map: Map<String, Value>, flag: &DirtyFlag) -> Self {
        let entries = map
            .into_iter()
            .map(|(key, value)| (key, TrackedValue::wrap(value, flag)))
            .collect();
        Self {
            entries,
            flag: flag.clone(),
        }
    }

    pub fn flag(&self) -> &DirtyFlag {
        &self.flag
    }

    pub fn is_dirty(&self) -> bool {
        self.flag.is_dirty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrackedValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Result<&TrackedValue> {
        self.position(key)
            .map(|idx| &self.entries[idx].1)
            .ok_or_else(|| FstkError::KeyNotFound(key.to_string()))
    }

    pub fn get_map(&self, key: &str) -> Result<&TrackedMap> {
        self.get(key)?
            .as_map()
            .ok_or_else(|| FstkError::NotAMapping(key.to_string()))
    }

    /// Mutable access to a nested mapping. Writes through the returned
    /// reference mark the whole document dirty; obtaining it does not.
    pub fn get_map_mut(&mut self, key: &str) -> Result<&mut TrackedMap> {
        let idx = self
            .position(key)
            .ok_or_else(|| FstkError::KeyNotFound(key.to_string()))?;
        match &mut self.entries[idx].1 {
            TrackedValue::Map(map) => Ok(map),
            TrackedValue::Plain(_) => Err(FstkError::NotAMapping(key.to_string())),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.get(key)?
            .as_str()
            .ok_or_else(|| wrong_type(key, "a string"))
    }

    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.get(key)?
            .as_i64()
            .ok_or_else(|| wrong_type(key, "an integer"))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)?
            .as_bool()
            .ok_or_else(|| wrong_type(key, "a boolean"))
    }

    /// Store `value` under `key`, wrapping nested objects. Always marks the
    /// document dirty, even when the new value equals the old one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.insert_wrapped(key.into(), value.into());
        self.flag.mark_dirty();
    }

    /// `set` for every entry of `other`, in its order.
    pub fn update(&mut self, other: Map<String, Value>) {
        for (key, value) in other {
            self.insert_wrapped(key, value);
        }
        self.flag.mark_dirty();
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.position(key)?;
        let (_, value) = self.entries.remove(idx);
        self.flag.mark_dirty();
        Some(value.to_json())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.flag.mark_dirty();
    }

    fn insert_wrapped(&mut self, key: String, value: Value) {
        let wrapped = TrackedValue::wrap(value, &self.flag);
        match self.position(&key) {
            Some(idx) => self.entries[idx].1 = wrapped,
            None => self.entries.push((key, wrapped)),
        }
    }

    /// Look up a value by walking nested mappings.
    pub fn get_path(&self, path: &[&str]) -> Result<&TrackedValue> {
        let Some((last, parents)) = path.split_last() else {
            return Err(FstkError::KeyNotFound(String::new()));
        };
        let mut map = self;
        for key in parents {
            map = map.get_map(key)?;
        }
        map.get(last)
    }

    /// `set` on the mapping addressed by all but the last path segment.
    /// Every intermediate mapping must already exist.
    pub fn set_path(&mut self, path: &[&str], value: impl Into<Value>) -> Result<()> {
        let Some((last, parents)) = path.split_last() else {
            return Err(FstkError::KeyNotFound(String::new()));
        };
        let mut map = self;
        for key in parents {
            map = map.get_map_mut(key)?;
        }
        map.set(*last, value);
        Ok(())
    }

    /// Untracked deep copy of this mapping.
    pub fn to_json(&self) -> Value {
        Value::Object(self.to_json_map())
    }

    pub fn to_json_map(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect()
    }
}

fn wrong_type(key: &str, expected: &str) -> FstkError {
    FstkError::InvalidDocument(format!("'{key}' is not {expected}"))
}

/// Structural equality; the flag is not part of a mapping's value.
impl PartialEq for TrackedMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(key, value)| other.get(key).is_ok_and(|o| o == value))
    }
}

impl Serialize for TrackedMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
