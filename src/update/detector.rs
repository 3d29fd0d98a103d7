//! Change detection: does an update description touch a field path?
//!
//! Detection is conservative. A missed change leaves stale tokens in the
//! index, while a false positive only costs one redundant recomputation, so
//! anything ambiguous counts as touching.
//!
//! Known limitation kept on purpose: the ancestor test is a plain string
//! prefix test, so tracking `ref` is also triggered by an update of
//! `reference`.

use serde_json::{Map, Value};

use crate::util::path;

/// How an update operator or pipeline stage relates to field paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    /// Object whose keys are field paths (`$set`, `$inc`, ...).
    FieldMap,
    /// `$rename`: keys and string values are both field paths.
    Rename,
    /// `$unset`: a field map in update syntax, a path or list of paths as a
    /// pipeline stage.
    Unset,
    /// Replaces or reshapes the whole document.
    WholeDocument,
    /// Not a recognized operator; treated as touching everything.
    Unknown,
}

/// Classify an operator key such as `"$set"`.
pub fn classify(operator: &str) -> OperatorKind {
    match operator {
        "$set" | "$setOnInsert" | "$addFields" | "$inc" | "$pull" | "$push" | "$min"
        | "$max" | "$mul" | "$currentDate" | "$addToSet" | "$pop" | "$pullAll" | "$bit" => {
            OperatorKind::FieldMap
        }
        "$rename" => OperatorKind::Rename,
        "$unset" => OperatorKind::Unset,
        "$replaceRoot" | "$replaceWith" | "$project" => OperatorKind::WholeDocument,
        _ => OperatorKind::Unknown,
    }
}

/// Whether `update` touches the value at `path`.
///
/// A list (update pipeline or list of update objects) touches the path when
/// any element does. Values that are neither objects nor lists touch
/// nothing.
pub fn touches_field(update: &Value, path: &str) -> bool {
    let touched = match update {
        Value::Array(units) => units.iter().any(|unit| unit_touches(unit, path)),
        Value::Object(_) => unit_touches(update, path),
        _ => false,
    };
    log::trace!("update touches '{path}': {touched}");
    touched
}

fn unit_touches(unit: &Value, path: &str) -> bool {
    let Some(unit) = unit.as_object() else {
        return false;
    };
    // plain keys act as a replacement document
    if map_touches(unit, path) {
        return true;
    }
    unit.iter()
        .filter(|(key, _)| key.starts_with('$'))
        .any(|(operator, value)| operator_touches(operator, value, path))
}

fn operator_touches(operator: &str, value: &Value, path: &str) -> bool {
    match (classify(operator), value) {
        (OperatorKind::FieldMap, Value::Object(map)) => map_touches(map, path),
        (OperatorKind::Rename, Value::Object(map)) => {
            map_touches(map, path)
                || map
                    .values()
                    .filter_map(Value::as_str)
                    .any(|target| key_touches(target, path))
        }
        (OperatorKind::Unset, Value::Object(map)) => map_touches(map, path),
        (OperatorKind::Unset, Value::String(target)) => key_touches(target, path),
        (OperatorKind::Unset, Value::Array(targets)) => targets
            .iter()
            .any(|t| t.as_str().is_none_or(|target| key_touches(target, path))),
        // malformed operator bodies are ambiguous
        (OperatorKind::FieldMap | OperatorKind::Rename | OperatorKind::Unset, _) => true,
        (OperatorKind::WholeDocument | OperatorKind::Unknown, _) => true,
    }
}

/// The three checks on one field map: exact key or nested value, positional
/// tolerant prefix match, and ancestor assignment.
fn map_touches(map: &Map<String, Value>, path: &str) -> bool {
    if map.contains_key(path) || path::get(map, path).is_some() {
        return true;
    }
    if map.keys().any(|key| key_touches(key, path)) {
        return true;
    }
    path::ancestors(path).any(|ancestor| map.contains_key(ancestor))
}

/// `key` (stripped of positional markers) targets an ancestor container of
/// `path`, or a descendant of it.
fn key_touches(key: &str, path: &str) -> bool {
    let stripped = path::strip_positional(key);
    path.starts_with(stripped.as_ref())
        || stripped
            .strip_prefix(path)
            .is_some_and(|rest| rest.starts_with('.'))
}
