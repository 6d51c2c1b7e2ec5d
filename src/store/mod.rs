//! Item store collaborator.
//!
//! Items are JSON objects addressed by an integer key held in one of their
//! own attributes (`Id` by default).

pub mod attribute;
pub mod dynamo;
pub mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

use crate::aws::AwsError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub type Item = Map<String, Value>;

/// Largest number of keys a single `BatchGetItem` call accepts.
pub const BATCH_GET_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the request (bad table, malformed key, ...).
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },
    #[error("item store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
    #[error("cannot convert item: {0}")]
    Marshal(String),
}

impl From<AwsError> for StoreError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::Service {
                status,
                code,
                message,
            } if !status.is_server_error() => Self::Rejected { code, message },
            other => Self::Unavailable(other.into()),
        }
    }
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Name of the attribute holding the item key.
    fn key_attribute(&self) -> &str;

    /// Store `item` under `key`, replacing any previous item.
    async fn put(&self, key: i64, item: &Item) -> Result<(), StoreError>;

    async fn get(&self, key: i64) -> Result<Option<Item>, StoreError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: i64) -> Result<(), StoreError>;

    /// Fetch every existing item among `keys`; missing keys are skipped and
    /// the result order is unspecified.
    async fn batch_get(&self, keys: &[i64]) -> Result<Vec<Item>, StoreError>;
}

/// Read the integer key of `item`.
#[must_use]
pub fn item_key(item: &Item, key_attribute: &str) -> Option<i64> {
    item.get(key_attribute).and_then(Value::as_i64)
}

/// Drop repeated keys, keeping first occurrences in order.
#[must_use]
pub fn unique_keys(keys: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::with_capacity(keys.len());
    keys.iter().copied().filter(|key| seen.insert(*key)).collect()
}
