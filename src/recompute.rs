//! Recomputation clauses: `$set` stages assigning fresh derived values.
//!
//! Top-level fields become plain assignments (`__code := tokenize($code)`).
//! Nested fields are grouped under their top-level field, which is rebuilt
//! in one expression: embedded documents are merged with their recomputed
//! derived leaves, and every array gets a single element-wise transform:
//!
//! ```json
//! { "produits": { "$cond": [ { "$isArray": ["$produits"] },
//!     { "$map": { "input": "$produits", "as": "elemt",
//!                 "in": { "$mergeObjects": ["$$elemt", { "__description": ... }] } } },
//!     "$produits" ] } }
//! ```
//!
//! Intermediates that are absent or of the wrong type are passed through
//! unchanged, so a recomputation never creates a document the seeder would
//! have skipped.

use serde_json::{Map, Value, json};

use crate::engine::config::ShadowConfig;
use crate::expr::Expr;
use crate::schema::FieldDescriptor;

/// Builds recomputation clauses for a set of fields.
pub struct Recompute<'a> {
    config: &'a ShadowConfig,
}

/// Where the paths of a patch are resolved.
#[derive(Clone, Copy)]
enum Scope<'s> {
    Document,
    Element(&'s str),
}

impl Scope<'_> {
    fn at(self, path: &str) -> Expr {
        match self {
            Scope::Document => Expr::field(path),
            Scope::Element(var) => Expr::var(var, Some(path.to_string())),
        }
    }
}

impl<'a> Recompute<'a> {
    pub fn new(config: &'a ShadowConfig) -> Self {
        Self { config }
    }

    /// Assignments (target path, expression) for the change-tracked fields
    /// among `fields`, in catalog order. Fields sharing a top-level field
    /// share one entry.
    pub fn assignments<'f, I>(&self, fields: I) -> Vec<(String, Expr)>
    where
        I: IntoIterator<Item = &'f FieldDescriptor>,
    {
        let mut root = Node::default();
        for field in fields.into_iter().filter(|f| f.track_changes) {
            root.insert(&segments(field), field.derived_name());
        }
        self.entries(Scope::Document, None, &root, 0)
    }

    /// The `{"$set": {...}}` stage, or `None` when no change-tracked field
    /// is given.
    pub fn set_stage<'f, I>(&self, fields: I) -> Option<Value>
    where
        I: IntoIterator<Item = &'f FieldDescriptor>,
    {
        let assignments = self.assignments(fields);
        if assignments.is_empty() {
            return None;
        }
        let dialect = self.config.dialect.dialect();
        let set: Map<String, Value> = assignments
            .iter()
            .map(|(key, expr)| (key.clone(), expr.compile(dialect, &self.config.tokenizer)))
            .collect();
        Some(json!({ "$set": set }))
    }

    fn element_var(&self, depth: usize) -> String {
        if depth == 0 {
            self.config.element_var.clone()
        } else {
            format!("{}{depth}", self.config.element_var)
        }
    }

    fn each_element(&self, array: Expr, node: &Node, depth: usize) -> Expr {
        let var = self.element_var(depth);
        let body = Expr::MergeObjects(vec![
            Expr::var(var.as_str(), None),
            Expr::Object(self.entries(Scope::Element(var.as_str()), None, node, depth + 1)),
        ]);
        Expr::IfArray {
            input: Box::new(array.clone()),
            then: Box::new(Expr::Map {
                input: Box::new(array.clone()),
                body: Box::new(body),
                var,
            }),
            otherwise: Box::new(array),
        }
    }

    /// Recomputed entries for the children of `node` found at `path` in
    /// `scope`. Arrays below use the element variable of `depth`.
    fn entries(
        &self,
        scope: Scope<'_>,
        path: Option<&str>,
        node: &Node,
        depth: usize,
    ) -> Vec<(String, Expr)> {
        node.children
            .iter()
            .map(|(segment, child)| {
                let at = match path {
                    Some(path) => format!("{path}.{segment}"),
                    None => segment.clone(),
                };
                match child {
                    Child::Leaf { derived_name } => {
                        (derived_name.clone(), Expr::tokenize(scope.at(&at)))
                    }
                    Child::Object(inner) => {
                        let merged = Expr::MergeObjects(vec![
                            scope.at(&at),
                            Expr::Object(self.entries(scope, Some(&at), inner, depth)),
                        ]);
                        (
                            segment.clone(),
                            Expr::IfObject {
                                input: Box::new(scope.at(&at)),
                                then: Box::new(merged),
                                otherwise: Box::new(scope.at(&at)),
                            },
                        )
                    }
                    Child::Array(inner) => {
                        (segment.clone(), self.each_element(scope.at(&at), inner, depth))
                    }
                }
            })
            .collect()
    }
}

/// Segments of `field.path`, each flagged when it is an array.
fn segments(field: &FieldDescriptor) -> Vec<(&str, bool)> {
    let mut prefix = String::new();
    field
        .path
        .split('.')
        .map(|segment| {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);
            (segment, field.arrays.iter().any(|a| *a == prefix))
        })
        .collect()
}

#[derive(Debug, Default)]
struct Node {
    children: Vec<(String, Child)>,
}

#[derive(Debug)]
enum Child {
    Leaf { derived_name: String },
    Object(Node),
    Array(Node),
}

impl Node {
    fn insert(&mut self, segments: &[(&str, bool)], derived_name: &str) {
        let Some(((segment, is_array), rest)) = segments.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.children.push((
                segment.to_string(),
                Child::Leaf {
                    derived_name: derived_name.to_string(),
                },
            ));
            return;
        }
        let existing = self.children.iter_mut().find_map(|(name, child)| match child {
            Child::Object(node) | Child::Array(node) if name.as_str() == *segment => Some(node),
            _ => None,
        });
        match existing {
            Some(node) => node.insert(rest, derived_name),
            None => {
                let mut node = Node::default();
                node.insert(rest, derived_name);
                let child = if *is_array {
                    Child::Array(node)
                } else {
                    Child::Object(node)
                };
                self.children.push((segment.to_string(), child));
            }
        }
    }
}
