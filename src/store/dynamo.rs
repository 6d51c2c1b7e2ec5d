//! `DynamoDB` table client.

use super::{
    attribute::{from_item, number_key, to_item},
    unique_keys, Item, ItemStore, StoreError, BATCH_GET_LIMIT,
};
use crate::aws::{AwsJsonClient, AwsSettings, Signing, DYNAMODB};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::{collections::HashMap, time::Duration};
use tracing::{debug, instrument, warn};

/// Total `BatchGetItem` passes per chunk, the first one included.
pub const MAX_BATCH_PASSES: u32 = 3;

const BATCH_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetItemOutput {
    item: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KeysAndAttributes {
    #[serde(default)]
    keys: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchGetItemOutput {
    #[serde(default)]
    responses: HashMap<String, Vec<Map<String, Value>>>,
    #[serde(default)]
    unprocessed_keys: HashMap<String, KeysAndAttributes>,
}

#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: AwsJsonClient,
    table: String,
    key_attribute: String,
}

impl DynamoStore {
    /// # Errors
    /// Returns an error if the endpoint or HTTP client cannot be set up.
    pub fn new(settings: &AwsSettings, endpoint: Option<&str>, table: String) -> Result<Self> {
        Ok(Self {
            client: AwsJsonClient::new(DYNAMODB, settings, endpoint)?,
            table,
            key_attribute: "Id".to_string(),
        })
    }

    #[must_use]
    pub fn with_key_attribute(mut self, key_attribute: String) -> Self {
        self.key_attribute = key_attribute;
        self
    }

    fn key(&self, key: i64) -> Value {
        let mut map = Map::with_capacity(1);
        map.insert(self.key_attribute.clone(), number_key(key));
        Value::Object(map)
    }

    /// Fetch one chunk, resubmitting unprocessed keys until none are left or
    /// the pass budget is spent.
    async fn batch_get_chunk(&self, chunk: &[i64]) -> Result<Vec<Item>, StoreError> {
        let mut pending: Vec<Value> = chunk.iter().map(|key| self.key(*key)).collect();
        let mut items = Vec::with_capacity(chunk.len());

        for pass in 0..MAX_BATCH_PASSES {
            if pass > 0 {
                tokio::time::sleep(BATCH_BACKOFF * 2u32.pow(pass - 1)).await;
            }

            let mut request_items = Map::with_capacity(1);
            request_items.insert(
                self.table.clone(),
                json!({ "Keys": pending, "ConsistentRead": true }),
            );
            let body = json!({ "RequestItems": request_items });
            let mut output: BatchGetItemOutput = self
                .client
                .call("BatchGetItem", &body, Signing::Signed)
                .await?;

            for stored in output.responses.remove(&self.table).unwrap_or_default() {
                items.push(from_item(&stored)?);
            }

            pending = output
                .unprocessed_keys
                .remove(&self.table)
                .map(|unprocessed| unprocessed.keys)
                .unwrap_or_default();

            if pending.is_empty() {
                return Ok(items);
            }
            debug!(pass, unprocessed = pending.len(), "BatchGetItem left keys unprocessed");
        }

        warn!(
            unprocessed = pending.len(),
            "BatchGetItem still throttled after {MAX_BATCH_PASSES} passes"
        );
        Err(StoreError::Unavailable(anyhow!(
            "{} keys still unprocessed after {MAX_BATCH_PASSES} passes",
            pending.len()
        )))
    }
}

#[async_trait]
impl ItemStore for DynamoStore {
    fn key_attribute(&self) -> &str {
        &self.key_attribute
    }

    #[instrument(skip(self, item), fields(table = %self.table))]
    async fn put(&self, key: i64, item: &Item) -> Result<(), StoreError> {
        let mut attributes = to_item(item)?;
        attributes.insert(self.key_attribute.clone(), number_key(key));

        let _: Value = self
            .client
            .call(
                "PutItem",
                &json!({ "TableName": self.table, "Item": attributes }),
                Signing::Signed,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn get(&self, key: i64) -> Result<Option<Item>, StoreError> {
        let output: GetItemOutput = self
            .client
            .call(
                "GetItem",
                &json!({ "TableName": self.table, "Key": self.key(key), "ConsistentRead": true }),
                Signing::Signed,
            )
            .await?;

        match output.item {
            Some(stored) if !stored.is_empty() => from_item(&stored).map(Some),
            _ => Ok(None),
        }
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn delete(&self, key: i64) -> Result<(), StoreError> {
        let _: Value = self
            .client
            .call(
                "DeleteItem",
                &json!({ "TableName": self.table, "Key": self.key(key) }),
                Signing::Signed,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, keys), fields(table = %self.table, keys = keys.len()))]
    async fn batch_get(&self, keys: &[i64]) -> Result<Vec<Item>, StoreError> {
        // Duplicate keys make the whole request fail.
        let keys = unique_keys(keys);
        let mut items = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(BATCH_GET_LIMIT) {
            items.extend(self.batch_get_chunk(chunk).await?);
        }
        Ok(items)
    }
}
