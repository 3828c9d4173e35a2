//! In-process shared state

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{HostResult, SharedState};

/// Shared key-value state living for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[async_trait]
impl SharedState for MemoryStore {
    async fn get(&self, key: &str) -> HostResult<Option<Value>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> HostResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> HostResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
