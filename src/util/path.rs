//! Dotted field paths (`"produits.description"`) as used by update
//! descriptions, pipelines and catalogs.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    /// `.$`, `.$[]` and `.$[identifier]` positional update markers.
    static ref POSITIONAL: Regex = Regex::new(r"\.\$(\[[^\]]*\])?").expect("valid regex");
}

/// Join a parent path and a segment.
pub fn join(parent: Option<&str>, segment: &str) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{parent}.{segment}"),
        _ => segment.to_string(),
    }
}

/// Split a path into its parent and its last segment.
pub fn split_last(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, path),
    }
}

/// Path of the derived sibling of `path`: the last segment gets `prefix`.
pub fn derived(path: &str, prefix: &str) -> String {
    let (parent, leaf) = split_last(path);
    join(parent, &format!("{prefix}{leaf}"))
}

/// Remove positional markers so `produits.$[elem].description` compares as
/// `produits.description`.
pub fn strip_positional(key: &str) -> Cow<'_, str> {
    POSITIONAL.replace_all(key, "")
}

/// Strict ancestors of `path`, from the immediate parent up to the first
/// segment.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.char_indices()
        .rev()
        .filter(|(_, c)| *c == '.')
        .map(move |(i, _)| &path[..i])
}

/// Walk `path` from `root`. Numeric segments index into arrays.
pub fn get<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
