//! Update descriptions: change detection, normalization and rewriting.

pub mod bulk;
pub mod detector;
pub mod normalizer;
pub mod rewriter;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use bulk::{BulkOperation, ReplaceBlock, UpdateBlock};
pub use detector::{OperatorKind, touches_field};
pub use normalizer::{OperatorNormalizer, UpdateNormalizer};
pub use rewriter::{Rewrite, UpdateRewriter};

/// A single filtered update (updateOne, updateMany, findOneAndUpdate,
/// findOneAndReplace).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuery {
    #[serde(default)]
    pub filter: Value,
    /// `None` when the query carries no update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub array_filters: Vec<Value>,
}

impl UpdateQuery {
    pub fn new(filter: Value, update: Value) -> Self {
        Self {
            filter,
            update: Some(update),
            array_filters: Vec::new(),
        }
    }

    pub fn with_array_filters(mut self, array_filters: Vec<Value>) -> Self {
        self.array_filters = array_filters;
        self
    }
}
