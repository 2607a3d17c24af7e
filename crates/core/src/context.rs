// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key/value scratchpad with explicit presence semantics.
//!
//! An empty string is a *present* value here — "play the whole folder" is
//! expressed as an empty path — so every skip/requirement check goes through
//! [`ContextMap::has`] rather than truthiness on the value.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// String-keyed value map used for session data and the global scratchpad.
///
/// Reads never fail: `get` returns `Option`, `get_or` a caller default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextMap(Map<String, Value>);

impl ContextMap {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Presence predicate: true when the key exists, even with an empty value.
    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Value for `key`, or `default` when the key is absent.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.0.get(key).cloned().unwrap_or(default)
    }

    /// String value for `key`; `None` when absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge every entry of `other` into this map (overwrites on collision).
    pub fn merge(&mut self, other: &Map<String, Value>) {
        for (k, v) in other {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ContextMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Process-wide scratchpad shared across modules.
///
/// Per-session scope lives on the session itself; this is the global scope.
/// Writes are serialized by the inner lock; reads clone out.
#[derive(Default)]
pub struct WorkingContext {
    global: Mutex<ContextMap>,
}

impl WorkingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.global.lock().has(key)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.global.lock().get(key).cloned()
    }

    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.global.lock().get_or(key, default)
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.global.lock().set(key, value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.global.lock().remove(key)
    }

    /// Snapshot of the whole global scope.
    pub fn snapshot(&self) -> ContextMap {
        self.global.lock().clone()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
