//! Item CRUD over the configured store.

use crate::store::{item_key, Item, ItemStore, StoreError};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct StoredItem {
    pub id: i64,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct BatchGetRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
}

/// Free-form item document, as stored.
#[derive(ToSchema)]
#[schema(value_type = Object)]
pub struct ItemDocument(Item);

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct BatchGetResponse {
    #[schema(value_type = Vec<ItemDocument>)]
    pub items: Vec<Item>,
}

fn store_failure(operation: &str, err: &StoreError) -> (StatusCode, String) {
    match err {
        StoreError::Rejected { code, message } => {
            debug!("{operation} rejected: {code}: {message}");
            (StatusCode::BAD_REQUEST, message.clone())
        }
        StoreError::Unavailable(_) | StoreError::Marshal(_) => {
            error!("{operation} failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error during {operation}"),
            )
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/items",
    request_body(content = ItemDocument, description = "Item carrying its integer key attribute"),
    responses(
        (status = 200, description = "Item stored.", body = StoredItem),
        (status = 400, description = "Not an object or key attribute missing."),
        (status = 500, description = "Store unavailable."),
    ),
    tag = "items"
)]
#[instrument(skip_all)]
pub async fn put_item(
    store: Extension<Arc<dyn ItemStore>>,
    payload: Option<Json<Value>>,
) -> impl IntoResponse {
    let Some(Json(Value::Object(item))) = payload else {
        return (StatusCode::BAD_REQUEST, "Expected a JSON object".to_string()).into_response();
    };

    let key_attribute = store.key_attribute();
    let Some(id) = item_key(&item, key_attribute) else {
        return (
            StatusCode::BAD_REQUEST,
            format!("Missing integer attribute {key_attribute}"),
        )
            .into_response();
    };

    match store.put(id, &item).await {
        Ok(()) => (StatusCode::OK, Json(StoredItem { id })).into_response(),
        Err(err) => store_failure("PutItem", &err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/items/{id}",
    params(("id" = i64, Path, description = "Item key")),
    responses(
        (status = 200, description = "The stored item.", body = ItemDocument),
        (status = 404, description = "No item with that key."),
        (status = 500, description = "Store unavailable."),
    ),
    tag = "items"
)]
#[instrument(skip(store))]
pub async fn get_item(Path(id): Path<i64>, store: Extension<Arc<dyn ItemStore>>) -> impl IntoResponse {
    match store.get(id).await {
        Ok(Some(item)) => (StatusCode::OK, Json(item)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => store_failure("GetItem", &err).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/items/{id}",
    params(("id" = i64, Path, description = "Item key")),
    responses(
        (status = 204, description = "Item deleted (or never existed)."),
        (status = 500, description = "Store unavailable."),
    ),
    tag = "items"
)]
#[instrument(skip(store))]
pub async fn delete_item(
    Path(id): Path<i64>,
    store: Extension<Arc<dyn ItemStore>>,
) -> impl IntoResponse {
    match store.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => store_failure("DeleteItem", &err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/items/batch",
    request_body = BatchGetRequest,
    responses(
        (status = 200, description = "Existing items among the requested keys.", body = BatchGetResponse),
        (status = 400, description = "Malformed request."),
        (status = 500, description = "Store unavailable."),
    ),
    tag = "items"
)]
#[instrument(skip_all)]
pub async fn batch_get_items(
    store: Extension<Arc<dyn ItemStore>>,
    payload: Option<Json<BatchGetRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Expected {\"ids\": [...]}".to_string()).into_response();
    };

    debug!(keys = request.ids.len(), "batch get");

    match store.batch_get(&request.ids).await {
        Ok(items) => (StatusCode::OK, Json(BatchGetResponse { items })).into_response(),
        Err(err) => store_failure("BatchGetItem", &err).into_response(),
    }
}
