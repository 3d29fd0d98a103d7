//! Patching a trailing `$merge` stage so merged documents get fresh derived
//! fields.

use serde_json::{Value, json};

use crate::engine::config::ShadowConfig;
use crate::recompute::Recompute;
use crate::schema::Catalog;

/// Collection written by a `$merge` stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTarget {
    pub db: Option<String>,
    pub collection: String,
}

/// The body of the final stage when it is a `$merge`.
pub fn merge_stage(pipeline: &[Value]) -> Option<&Value> {
    pipeline.last()?.as_object()?.get("$merge")
}

fn merge_stage_mut(pipeline: &mut [Value]) -> Option<&mut Value> {
    pipeline.last_mut()?.as_object_mut()?.get_mut("$merge")
}

/// Resolve the target of the trailing `$merge`, given either as a
/// collection name or as `{ db, coll }`.
pub fn merge_target(pipeline: &[Value]) -> Option<MergeTarget> {
    match merge_stage(pipeline)? {
        Value::String(collection) => Some(MergeTarget {
            db: None,
            collection: collection.clone(),
        }),
        Value::Object(body) => match body.get("into")? {
            Value::String(collection) => Some(MergeTarget {
                db: None,
                collection: collection.clone(),
            }),
            Value::Object(into) => Some(MergeTarget {
                db: into.get("db").and_then(Value::as_str).map(str::to_string),
                collection: into.get("coll")?.as_str()?.to_string(),
            }),
            _ => None,
        },
        _ => None,
    }
}

/// Append a recomputation of every tracked field of `catalog` to the
/// `whenMatched` policy of the trailing `$merge`.
///
/// `"merge"` and `"replace"` become explicit stage lists, an explicit list
/// is extended, and every other policy is left alone. Returns whether the
/// pipeline changed.
pub fn patch_merge(pipeline: &mut [Value], catalog: &Catalog, config: &ShadowConfig) -> bool {
    let Some(stage) = Recompute::new(config).set_stage(catalog.fields()) else {
        return false;
    };
    let Some(body) = merge_stage_mut(pipeline).and_then(Value::as_object_mut) else {
        return false;
    };

    let patched = match body.get_mut("whenMatched") {
        Some(Value::String(policy)) if policy == "merge" => Some(vec![
            json!({ "$replaceRoot": { "newRoot": { "$mergeObjects": ["$$ROOT", "$$new"] } } }),
            stage,
        ]),
        Some(Value::String(policy)) if policy == "replace" => {
            Some(vec![json!({ "$replaceRoot": { "newRoot": "$$new" } }), stage])
        }
        Some(Value::Array(stages)) => {
            stages.push(stage);
            log::debug!("extended $merge whenMatched pipeline to {} stage(s)", stages.len());
            return true;
        }
        _ => None,
    };
    match patched {
        Some(stages) => {
            log::debug!("expanded $merge whenMatched policy into a {}-stage pipeline", stages.len());
            body.insert("whenMatched".to_string(), Value::Array(stages));
            true
        }
        None => false,
    }
}
