//! Update-to-pipeline normalization.
//!
//! Operator-style updates must become pipelines before a recomputation
//! stage can be appended. General update-operator semantics (positional
//! updates, array filters, ...) belong to the store driver, so the engine
//! only defines the [`UpdateNormalizer`] seam. [`OperatorNormalizer`] covers
//! the common plain-path cases.

use serde_json::{Map, Value, json};

use crate::error::{Result, ShadowError};

/// Turns an update description into an equivalent pipeline.
pub trait UpdateNormalizer: Send + Sync {
    /// Translate `update`, applied to documents matching `filter`, into a
    /// pipeline. Failing is allowed and is propagated to the caller.
    fn to_pipeline(&self, filter: &Value, update: &Value, array_filters: &[Value])
    -> Result<Vec<Value>>;
}

impl<F> UpdateNormalizer for F
where
    F: Fn(&Value, &Value, &[Value]) -> Result<Vec<Value>> + Send + Sync,
{
    fn to_pipeline(
        &self,
        filter: &Value,
        update: &Value,
        array_filters: &[Value],
    ) -> Result<Vec<Value>> {
        self(filter, update, array_filters)
    }
}

/// Normalizes replacement documents and `$set` / `$unset` / `$inc` on plain
/// paths. Everything else is reported as unsupported, including
/// operator-free updates whose keys are dotted or positional paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorNormalizer;

impl UpdateNormalizer for OperatorNormalizer {
    fn to_pipeline(
        &self,
        _filter: &Value,
        update: &Value,
        array_filters: &[Value],
    ) -> Result<Vec<Value>> {
        let Some(update) = update.as_object() else {
            return Err(ShadowError::invalid_argument(
                "update must be an object or a pipeline",
            ));
        };
        if !array_filters.is_empty() {
            return Err(ShadowError::unsupported_update(
                "array filters need a positional-aware normalizer",
            ));
        }

        let operators = update.keys().filter(|k| k.starts_with('$')).count();
        if operators == 0 {
            for key in update.keys() {
                check_top_level(key)?;
            }
            return Ok(vec![replacement_stage(update)]);
        }
        if operators != update.len() {
            return Err(ShadowError::unsupported_update(
                "update mixes operators and plain fields",
            ));
        }

        let mut pipeline = Vec::with_capacity(update.len());
        for (operator, body) in update {
            let body = body.as_object().ok_or_else(|| {
                ShadowError::unsupported_update(format!("{operator} expects an object"))
            })?;
            for key in body.keys() {
                check_plain_path(key)?;
            }
            let stage = match operator.as_str() {
                "$set" => {
                    let set: Map<String, Value> = body
                        .iter()
                        .map(|(k, v)| (k.clone(), json!({ "$literal": v })))
                        .collect();
                    json!({ "$set": set })
                }
                "$unset" => json!({ "$unset": body.keys().collect::<Vec<_>>() }),
                "$inc" => {
                    let set: Map<String, Value> = body
                        .iter()
                        .map(|(k, v)| {
                            (
                                k.clone(),
                                json!({ "$add": [{ "$ifNull": [format!("${k}"), 0] }, v] }),
                            )
                        })
                        .collect();
                    json!({ "$set": set })
                }
                other => {
                    return Err(ShadowError::unsupported_update(format!(
                        "operator {other} cannot be expressed as a pipeline stage"
                    )));
                }
            };
            pipeline.push(stage);
        }
        Ok(pipeline)
    }
}

/// A replacement keeps `_id` and swaps everything else.
fn replacement_stage(document: &Map<String, Value>) -> Value {
    json!({
        "$replaceWith": {
            "$mergeObjects": [{ "_id": "$_id" }, { "$literal": document }]
        }
    })
}

fn check_plain_path(key: &str) -> Result<()> {
    if key.is_empty() || key.split('.').any(|segment| segment.is_empty() || segment.starts_with('$')) {
        return Err(ShadowError::unsupported_update(format!(
            "'{key}' is not a plain field path"
        )));
    }
    Ok(())
}

/// Replacement documents hold whole top-level fields only. A dotted or
/// positional key is an operator-free partial update in disguise.
fn check_top_level(key: &str) -> Result<()> {
    check_plain_path(key)?;
    if key.contains('.') {
        return Err(ShadowError::unsupported_update(format!(
            "replacement field '{key}' is a nested path"
        )));
    }
    Ok(())
}
