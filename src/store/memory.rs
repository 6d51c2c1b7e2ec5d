use super::{unique_keys, Item, ItemStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process [`ItemStore`] for local runs and tests.
#[derive(Debug)]
pub struct MemoryStore {
    key_attribute: String,
    items: RwLock<HashMap<i64, Item>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(key_attribute: &str) -> Self {
        Self {
            key_attribute: key_attribute.to_string(),
            items: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("Id")
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    fn key_attribute(&self) -> &str {
        &self.key_attribute
    }

    async fn put(&self, key: i64, item: &Item) -> Result<(), StoreError> {
        let mut item = item.clone();
        item.insert(self.key_attribute.clone(), Value::from(key));
        self.items.write().await.insert(key, item);
        Ok(())
    }

    async fn get(&self, key: i64) -> Result<Option<Item>, StoreError> {
        Ok(self.items.read().await.get(&key).cloned())
    }

    async fn delete(&self, key: i64) -> Result<(), StoreError> {
        self.items.write().await.remove(&key);
        Ok(())
    }

    async fn batch_get(&self, keys: &[i64]) -> Result<Vec<Item>, StoreError> {
        let items = self.items.read().await;
        Ok(unique_keys(keys)
            .iter()
            .filter_map(|key| items.get(key).cloned())
            .collect())
    }
}
