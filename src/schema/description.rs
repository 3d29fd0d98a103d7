//! Static description of a document's field tree.
//!
//! This is the input of the catalog builder. It is deliberately decoupled
//! from any live schema object: hosts translate their own schema
//! declarations into this shape (or load it from JSON).
//!
//! ```json
//! {
//!   "fields": [
//!     { "name": "code", "type": "scalar", "trackable": true },
//!     { "name": "reference", "type": "scalar", "trackable": { "weight": 10 } },
//!     { "name": "produits", "type": "array", "ref": "Produit" }
//!   ],
//!   "definitions": {
//!     "Produit": [{ "name": "description", "type": "scalar", "trackable": true }]
//!   }
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShadowError};

/// Root of a schema description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDescription {
    /// Top-level fields.
    pub fields: Vec<SchemaField>,
    /// Named sub-schemas, referenced from object and array nodes with `ref`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub definitions: HashMap<String, Vec<SchemaField>>,
}

impl SchemaDescription {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self {
            fields,
            definitions: HashMap::new(),
        }
    }

    /// Register a named sub-schema.
    pub fn define(mut self, name: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        self.definitions.insert(name.into(), fields);
        self
    }

    /// Parse a description from JSON. Unknown type tags and malformed
    /// trackable markers are schema errors.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ShadowError::schema(e.to_string()))
    }
}

/// Kind of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A leaf value.
    Scalar,
    /// A nested object.
    Object,
    /// An array of objects.
    Array,
}

/// One node of the field tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Inline children of an object or array node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SchemaField>,
    /// Name of a definition providing the children of an object or array node.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Opt-in marker for scalar fields.
    #[serde(default, skip_serializing_if = "Trackable::is_off")]
    pub trackable: Trackable,
}

impl SchemaField {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Scalar,
            children: Vec::new(),
            reference: None,
            trackable: Trackable::Flag(false),
        }
    }

    pub fn object(name: impl Into<String>, children: Vec<SchemaField>) -> Self {
        Self {
            kind: FieldKind::Object,
            children,
            ..Self::scalar(name)
        }
    }

    pub fn array(name: impl Into<String>, children: Vec<SchemaField>) -> Self {
        Self {
            kind: FieldKind::Array,
            children,
            ..Self::scalar(name)
        }
    }

    /// Take the children of this node from a named definition.
    pub fn with_ref(mut self, definition: impl Into<String>) -> Self {
        self.reference = Some(definition.into());
        self
    }

    /// Mark a scalar field as tracked with default options.
    pub fn tracked(mut self) -> Self {
        self.trackable = Trackable::Flag(true);
        self
    }

    /// Mark a scalar field as tracked with explicit options.
    pub fn tracked_with(mut self, options: TrackOptions) -> Self {
        self.trackable = Trackable::Options(options);
        self
    }
}

/// The `trackable` marker: `false`, `true`, or `{ unchanged, weight }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Trackable {
    Flag(bool),
    Options(TrackOptions),
}

impl Trackable {
    pub fn is_off(&self) -> bool {
        matches!(self, Trackable::Flag(false))
    }

    /// Effective options, or `None` when the field is not tracked.
    pub fn options(&self) -> Option<TrackOptions> {
        match self {
            Trackable::Flag(false) => None,
            Trackable::Flag(true) => Some(TrackOptions::default()),
            Trackable::Options(options) => Some(options.clone()),
        }
    }
}

impl Default for Trackable {
    fn default() -> Self {
        Trackable::Flag(false)
    }
}

/// Options of a tracked field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackOptions {
    /// The source practically never changes: no derived field is maintained.
    #[serde(default)]
    pub unchanged: bool,
    /// Relevance weight in the text index, 1 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl TrackOptions {
    pub fn weight(weight: f64) -> Self {
        Self {
            unchanged: false,
            weight: Some(weight),
        }
    }

    pub fn unchanged() -> Self {
        Self {
            unchanged: true,
            weight: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_description() {
        let json = r#"{
            "fields": [
                { "name": "code", "type": "scalar", "trackable": true },
                { "name": "email", "type": "scalar", "trackable": { "unchanged": true } },
                { "name": "reference", "type": "scalar", "trackable": { "weight": 10 } },
                { "name": "status", "type": "scalar" },
                { "name": "produits", "type": "array", "ref": "Produit" }
            ],
            "definitions": {
                "Produit": [{ "name": "description", "type": "scalar", "trackable": true }]
            }
        }"#;
        let desc = SchemaDescription::from_json_str(json).unwrap();
        assert_eq!(desc.fields.len(), 5);
        assert_eq!(desc.fields[0].trackable.options(), Some(TrackOptions::default()));
        assert_eq!(desc.fields[1].trackable.options(), Some(TrackOptions::unchanged()));
        assert_eq!(desc.fields[2].trackable.options(), Some(TrackOptions::weight(10.0)));
        assert!(desc.fields[3].trackable.is_off());
        assert_eq!(desc.fields[4].reference.as_deref(), Some("Produit"));
        assert!(desc.definitions.contains_key("Produit"));
    }

    #[test]
    fn test_unknown_type_tag_is_schema_error() {
        let json = r#"{ "fields": [{ "name": "x", "type": "matrix" }] }"#;
        let err = SchemaDescription::from_json_str(json).unwrap_err();
        assert!(matches!(err, ShadowError::Schema(_)));
    }

    #[test]
    fn test_unknown_trackable_option_is_schema_error() {
        let json = r#"{ "fields": [{ "name": "x", "type": "scalar", "trackable": { "boost": 2 } }] }"#;
        assert!(SchemaDescription::from_json_str(json).is_err());
    }
}
