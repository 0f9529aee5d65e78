use anyhow::Result;
use state_file::StateFile;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Key under which the last seen transaction count is stored.
pub const TRANSACTION_COUNT_KEY: &str = "transactionCount";

/// String key-value storage that survives restarts.
pub trait CountStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

impl CountStore for StateFile {
    fn get_item(&self, key: &str) -> Option<String> {
        self.load_value(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.save_value(key, value)
    }
}

/// Process-local store, used when nothing should touch the disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl CountStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
