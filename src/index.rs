//! Weighted full-text index declaration over tracked fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::schema::Catalog;

/// A text index to register with the store.
///
/// Both the source path and the derived path of each change-tracked field
/// are indexed with the field's weight, so whole words and prefixes match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextIndexSpec {
    pub name: String,
    /// Indexed paths in catalog order, source path first.
    pub keys: Vec<String>,
    pub weights: Map<String, Value>,
}

impl TextIndexSpec {
    /// `None` when the catalog has no change-tracked field.
    pub fn from_catalog(catalog: &Catalog, name: impl Into<String>) -> Option<Self> {
        let mut keys = Vec::new();
        let mut weights = Map::new();
        for field in catalog.tracked() {
            for path in [&field.path, &field.derived_path] {
                keys.push(path.clone());
                weights.insert(path.clone(), json!(field.weight));
            }
        }
        if keys.is_empty() {
            return None;
        }
        Some(Self {
            name: name.into(),
            keys,
            weights,
        })
    }

    /// Key document mapping every path to `"text"`.
    pub fn key_document(&self) -> Value {
        let keys: Map<String, Value> = self
            .keys
            .iter()
            .map(|k| (k.clone(), Value::from("text")))
            .collect();
        Value::Object(keys)
    }

    /// `createIndexes`-style declaration.
    pub fn to_json(&self) -> Value {
        json!({
            "key": self.key_document(),
            "name": self.name,
            "weights": self.weights,
        })
    }
}
