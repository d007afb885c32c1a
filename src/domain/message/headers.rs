//! Header store
//!
//! Case-sensitive string map. Entries keep insertion order, so serialized
//! output is stable; overwriting a name keeps its original position.

use indexmap::IndexMap;
use std::ops::ControlFlow;

/// Initial slot count for a fresh store
pub const DEFAULT_NUM_HEADERS: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderStore {
    entries: IndexMap<String, String>,
}

impl HeaderStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_NUM_HEADERS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert or overwrite, returning the previous value
    pub fn set(&mut self, name: &str, value: &str) -> Option<String> {
        if let Some(slot) = self.entries.get_mut(name) {
            return Some(std::mem::replace(slot, value.to_string()));
        }
        self.entries.insert(name.to_string(), value.to_string());
        None
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.shift_remove(name)
    }

    /// Visit every entry until the visitor breaks.
    ///
    /// Returns the number of entries handed to the visitor.
    pub fn for_each<F>(&self, mut visitor: F) -> usize
    where
        F: FnMut(&str, &str) -> ControlFlow<()>,
    {
        let mut visited = 0;
        for (name, value) in self.entries.iter() {
            visited += 1;
            if visitor(name, value).is_break() {
                break;
            }
        }
        visited
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries, keeping the allocation
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
