//! Field catalog: the flattened list of tracked fields of one schema.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ShadowError};
use crate::schema::description::{FieldKind, SchemaDescription, SchemaField};
use crate::util::path;

/// Marker prepended to the leaf name of a derived field.
pub const DEFAULT_DERIVED_PREFIX: &str = "__";

/// One tracked text field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Dotted path of the source value, e.g. `produits.description`.
    pub path: String,
    /// Dotted path of the derived sibling, e.g. `produits.__description`.
    pub derived_path: String,
    /// Leaf name of the source field.
    pub name: String,
    /// Dotted paths of the array-typed ancestors, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arrays: Vec<String>,
    /// When false the derived field is never maintained.
    pub track_changes: bool,
    /// Relevance weight in the text index.
    pub weight: f64,
}

impl FieldDescriptor {
    /// A change-tracked field with weight 1 and the default derived prefix.
    pub fn tracked(path: impl Into<String>) -> Self {
        let path = path.into();
        let derived_path = path::derived(&path, DEFAULT_DERIVED_PREFIX);
        let name = path::split_last(&path).1.to_string();
        Self {
            path,
            derived_path,
            name,
            arrays: Vec::new(),
            track_changes: true,
            weight: 1.0,
        }
    }

    /// Declare the array-typed ancestors (dotted paths, outermost first).
    pub fn in_arrays<I, S>(mut self, arrays: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arrays = arrays.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn unchanged(mut self) -> Self {
        self.track_changes = false;
        self
    }

    /// Names of the array-typed ancestor segments.
    pub fn array_segments(&self) -> Vec<&str> {
        self.arrays.iter().map(|a| path::split_last(a).1).collect()
    }

    /// Leaf name of the derived field.
    pub fn derived_name(&self) -> &str {
        path::split_last(&self.derived_path).1
    }

    /// Whether the update description touches this field's source path.
    pub fn is_touched_by(&self, update: &Value) -> bool {
        crate::update::detector::touches_field(update, &self.path)
    }
}

/// Immutable list of [`FieldDescriptor`]s for one schema.
///
/// An empty catalog means tracking is disabled for the schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    fields: Vec<FieldDescriptor>,
}

impl Catalog {
    /// Build a catalog from descriptors, checking that source and derived
    /// paths are unique and never overlap.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self> {
        let mut paths = AHashSet::new();
        for field in &fields {
            if !paths.insert(field.path.as_str()) {
                return Err(ShadowError::schema(format!(
                    "duplicate tracked path '{}'",
                    field.path
                )));
            }
            if !(field.weight > 0.0) {
                return Err(ShadowError::schema(format!(
                    "weight of '{}' must be positive",
                    field.path
                )));
            }
            if let Some(array) = field.arrays.iter().find(|a| !field.path.starts_with(&format!("{a}."))) {
                return Err(ShadowError::schema(format!(
                    "array '{array}' is not an ancestor of '{}'",
                    field.path
                )));
            }
        }
        let mut derived = AHashSet::new();
        for field in &fields {
            if paths.contains(field.derived_path.as_str()) {
                return Err(ShadowError::schema(format!(
                    "derived path '{}' collides with a tracked path",
                    field.derived_path
                )));
            }
            if !derived.insert(field.derived_path.as_str()) {
                return Err(ShadowError::schema(format!(
                    "duplicate derived path '{}'",
                    field.derived_path
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, path: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.path == path)
    }

    /// Fields whose derived value is maintained.
    pub fn tracked(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.track_changes)
    }

    /// Fields whose source path is touched by `update`.
    pub fn touched_by(&self, update: &Value) -> Vec<&FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_touched_by(update)).collect()
    }
}

/// Builds catalogs from [`SchemaDescription`]s.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    derived_prefix: String,
}

impl CatalogBuilder {
    pub fn new(derived_prefix: impl Into<String>) -> Self {
        Self {
            derived_prefix: derived_prefix.into(),
        }
    }

    /// Depth-first walk of the description emitting one descriptor per
    /// trackable scalar.
    pub fn build(&self, description: &SchemaDescription) -> Result<Catalog> {
        let mut out = Vec::new();
        let mut visiting = Vec::new();
        self.walk(description, &description.fields, None, &[], &mut visiting, &mut out)?;
        Catalog::new(out)
    }

    fn walk(
        &self,
        description: &SchemaDescription,
        fields: &[SchemaField],
        parent: Option<&str>,
        arrays: &[String],
        visiting: &mut Vec<String>,
        out: &mut Vec<FieldDescriptor>,
    ) -> Result<()> {
        let mut names = AHashSet::new();
        for field in fields {
            if field.name.is_empty() || field.name.contains('.') || field.name.starts_with('$') {
                return Err(ShadowError::schema(format!(
                    "invalid field name '{}'",
                    field.name
                )));
            }
            if !names.insert(field.name.as_str()) {
                return Err(ShadowError::schema(format!(
                    "duplicate field '{}'",
                    path::join(parent, &field.name)
                )));
            }
        }

        for field in fields {
            let path = path::join(parent, &field.name);
            match field.kind {
                FieldKind::Scalar => {
                    if !field.children.is_empty() || field.reference.is_some() {
                        return Err(ShadowError::schema(format!(
                            "scalar field '{path}' cannot have children"
                        )));
                    }
                    let Some(options) = field.trackable.options() else {
                        continue;
                    };
                    let derived_name = format!("{}{}", self.derived_prefix, field.name);
                    if names.contains(derived_name.as_str()) {
                        return Err(ShadowError::schema(format!(
                            "derived field '{}' of '{path}' is already declared",
                            path::join(parent, &derived_name)
                        )));
                    }
                    out.push(FieldDescriptor {
                        derived_path: path::join(parent, &derived_name),
                        name: field.name.clone(),
                        arrays: arrays.to_vec(),
                        track_changes: !options.unchanged,
                        weight: options.weight.unwrap_or(1.0),
                        path,
                    });
                }
                FieldKind::Object | FieldKind::Array => {
                    if !field.trackable.is_off() {
                        return Err(ShadowError::schema(format!(
                            "only scalar fields can be trackable, '{path}' is a container"
                        )));
                    }
                    let mut nested_arrays = arrays.to_vec();
                    if field.kind == FieldKind::Array {
                        nested_arrays.push(path.clone());
                    }
                    match &field.reference {
                        None => self.walk(
                            description,
                            &field.children,
                            Some(&path),
                            &nested_arrays,
                            visiting,
                            out,
                        )?,
                        Some(reference) => {
                            if !field.children.is_empty() {
                                return Err(ShadowError::schema(format!(
                                    "'{path}' has both inline children and a ref"
                                )));
                            }
                            if visiting.contains(reference) {
                                return Err(ShadowError::schema(format!(
                                    "cyclic reference {} -> {reference}",
                                    visiting.join(" -> ")
                                )));
                            }
                            let children = description.definitions.get(reference).ok_or_else(|| {
                                ShadowError::schema(format!("unknown definition '{reference}'"))
                            })?;
                            visiting.push(reference.clone());
                            self.walk(
                                description,
                                children,
                                Some(&path),
                                &nested_arrays,
                                visiting,
                                out,
                            )?;
                            visiting.pop();
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_DERIVED_PREFIX)
    }
}

/// Build a catalog with the default derived prefix.
pub fn build_catalog(description: &SchemaDescription) -> Result<Catalog> {
    CatalogBuilder::default().build(description)
}
