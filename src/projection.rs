//! Read projections that keep derived fields out of query results.

use ahash::AHashSet;
use serde_json::{Map, Value};

use crate::schema::Catalog;

/// Marker for a key that force-includes an otherwise hidden field.
const FORCE_INCLUDE: char = '+';

/// Rewrite `projection` so derived fields are only returned on request.
///
/// A `+path` key asks for a hidden field and is consumed here. Exclusion
/// projections (and a missing projection) get every other derived path
/// excluded with `0`. Inclusion projections already omit unlisted fields,
/// so only the forced fields are added to them.
pub fn hide_derived(projection: Option<&Map<String, Value>>, catalog: &Catalog) -> Map<String, Value> {
    let mut out = Map::new();
    let mut forced = AHashSet::new();
    if let Some(projection) = projection {
        for (key, value) in projection {
            match key.strip_prefix(FORCE_INCLUDE) {
                Some(path) => {
                    if is_truthy(value) {
                        forced.insert(path.to_string());
                    }
                }
                None => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
    }

    if is_inclusion(&out) {
        for path in forced {
            out.insert(path, Value::from(1));
        }
        return out;
    }

    for field in catalog.tracked() {
        let derived = field.derived_path.as_str();
        if forced.contains(derived) || out.get(derived).is_some_and(is_truthy) {
            continue;
        }
        out.insert(derived.to_string(), Value::from(0));
    }
    out
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Null => false,
        _ => true,
    }
}

/// `_id` alone never decides the projection style.
fn is_inclusion(projection: &Map<String, Value>) -> bool {
    projection
        .iter()
        .any(|(key, value)| key != "_id" && is_truthy(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            FieldDescriptor::tracked("code"),
            FieldDescriptor::tracked("email").unchanged(),
            FieldDescriptor::tracked("produits.description").in_arrays(["produits"]),
        ])
        .unwrap()
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_no_projection_hides_all() {
        assert_eq!(
            Value::Object(hide_derived(None, &catalog())),
            json!({ "__code": 0, "produits.__description": 0 })
        );
    }

    #[test]
    fn test_exclusion_projection() {
        let projection = obj(json!({ "_id": 0, "email": 0 }));
        assert_eq!(
            Value::Object(hide_derived(Some(&projection), &catalog())),
            json!({ "_id": 0, "email": 0, "__code": 0, "produits.__description": 0 })
        );
    }

    #[test]
    fn test_force_include() {
        let projection = obj(json!({ "+__code": 1, "+produits.__description": false }));
        assert_eq!(
            Value::Object(hide_derived(Some(&projection), &catalog())),
            json!({ "produits.__description": 0 })
        );
    }

    #[test]
    fn test_inclusion_projection_left_alone() {
        let projection = obj(json!({ "code": 1, "__code": 1 }));
        assert_eq!(hide_derived(Some(&projection), &catalog()), projection);

        let projection = obj(json!({ "code": 1, "+produits.__description": 1 }));
        assert_eq!(
            Value::Object(hide_derived(Some(&projection), &catalog())),
            json!({ "code": 1, "produits.__description": 1 })
        );
    }

    #[test]
    fn test_empty_catalog() {
        assert!(hide_derived(None, &Catalog::empty()).is_empty());
    }
}
