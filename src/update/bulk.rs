//! Bulk write operations, in the store's `{ "updateOne": { ... } }` shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One operation of a bulk write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BulkOperation {
    InsertOne { document: Value },
    UpdateOne(UpdateBlock),
    UpdateMany(UpdateBlock),
    ReplaceOne(ReplaceBlock),
    DeleteOne { filter: Value },
    DeleteMany { filter: Value },
}

/// Body of `updateOne` / `updateMany`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlock {
    pub filter: Value,
    pub update: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub array_filters: Vec<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub upsert: bool,
}

impl UpdateBlock {
    pub fn new(filter: Value, update: Value) -> Self {
        Self {
            filter,
            update,
            array_filters: Vec::new(),
            upsert: false,
        }
    }
}

/// Body of `replaceOne`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceBlock {
    pub filter: Value,
    pub replacement: Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub upsert: bool,
}
