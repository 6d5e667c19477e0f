//! Per-job, per-run object store.
//!
//! Maps symbolic names to intermediate results produced by pipeline
//! steps. The root host-API handle is not stored here — it is held by
//! the interpreter and addressed by leaving a step's `target` unset —
//! so a freshly reset store is empty.

use std::collections::HashMap;

use serde_json::Value;

/// Named intermediate results for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    entries: HashMap<String, Value>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hard reset to the seeded state. Called at the start of every
    /// tick so intermediate results never leak across runs.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        self.entries.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a dotted path like `container.Id`: the first segment
    /// names a store entry, the rest navigate object fields.
    pub fn lookup_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let root = segments.next()?;
        let mut current = self.entries.get(root)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current)
    }
}
