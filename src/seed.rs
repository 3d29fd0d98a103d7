//! Initial derived values for documents about to be created.
//!
//! Unlike updates, a fresh document is fully known, so derived fields are
//! computed host-side and written into the document before insertion.

use rayon::prelude::*;
use serde_json::Value;

use crate::analysis::TokenizerProgram;
use crate::analysis::tokenizer::evaluate_value;
use crate::schema::Catalog;

/// Batches at least this large are seeded in parallel.
const PARALLEL_THRESHOLD: usize = 64;

/// Write the derived value of every change-tracked field into `document`.
///
/// Arrays along a path are walked element by element. Missing or non-object
/// intermediates mean there is nothing to seed there.
pub fn seed(document: &mut Value, catalog: &Catalog, program: &TokenizerProgram) {
    for field in catalog.tracked() {
        let segments: Vec<&str> = field.path.split('.').collect();
        seed_path(document, &segments, field.derived_name(), program);
    }
}

/// Seed every document of an insert batch.
pub fn seed_many(documents: &mut [Value], catalog: &Catalog, program: &TokenizerProgram) {
    if catalog.is_empty() || documents.is_empty() {
        return;
    }
    if documents.len() >= PARALLEL_THRESHOLD {
        documents
            .par_iter_mut()
            .for_each(|doc| seed(doc, catalog, program));
    } else {
        for doc in documents.iter_mut() {
            seed(doc, catalog, program);
        }
    }
}

fn seed_path(node: &mut Value, segments: &[&str], derived_name: &str, program: &TokenizerProgram) {
    let Some(object) = node.as_object_mut() else {
        return;
    };
    match segments {
        [] => {}
        [leaf] => {
            let tokens = evaluate_value(program, object.get(*leaf));
            object.insert(derived_name.to_string(), Value::String(tokens));
        }
        [head, rest @ ..] => match object.get_mut(*head) {
            Some(Value::Array(items)) => {
                for item in items {
                    seed_path(item, rest, derived_name, program);
                }
            }
            Some(child @ Value::Object(_)) => seed_path(child, rest, derived_name, program),
            _ => {}
        },
    }
}
