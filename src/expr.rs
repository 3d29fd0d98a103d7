//! Computation expressions embedded in rewritten updates.
//!
//! Recomputation clauses are first built as an [`Expr`] tree and then
//! compiled to the aggregation-expression JSON understood by the store.
//! Only the tokenizer itself is dialect specific: see [`dialect`].

pub mod dialect;

use serde_json::{Map, Value, json};

use crate::analysis::TokenizerProgram;

use self::dialect::ExpressionDialect;

/// A store-side computation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Value of a document field: `$a.b`.
    Field(String),
    /// Value of a bound variable, optionally followed by a path: `$$v.a`.
    Var { name: String, path: Option<String> },
    /// Tokenized form of the inner expression.
    Tokenize(Box<Expr>),
    /// Element-wise transform of an array.
    Map {
        input: Box<Expr>,
        var: String,
        body: Box<Expr>,
    },
    /// Shallow merge, later objects win.
    MergeObjects(Vec<Expr>),
    /// Object literal whose values are expressions.
    Object(Vec<(String, Expr)>),
    /// `then` when `input` is an array, `otherwise` else.
    IfArray {
        input: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `then` when `input` is an embedded document, `otherwise` else.
    IfObject {
        input: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub fn field(path: impl Into<String>) -> Self {
        Expr::Field(path.into())
    }

    pub fn var(name: impl Into<String>, path: Option<String>) -> Self {
        Expr::Var {
            name: name.into(),
            path,
        }
    }

    pub fn tokenize(input: Expr) -> Self {
        Expr::Tokenize(Box::new(input))
    }

    /// Compile to aggregation-expression JSON.
    pub fn compile(&self, dialect: &dyn ExpressionDialect, program: &TokenizerProgram) -> Value {
        match self {
            Expr::Field(path) => Value::String(format!("${path}")),
            Expr::Var { name, path: None } => Value::String(format!("$${name}")),
            Expr::Var {
                name,
                path: Some(path),
            } => Value::String(format!("$${name}.{path}")),
            Expr::Tokenize(input) => dialect.tokenize(input.compile(dialect, program), program),
            Expr::Map { input, var, body } => json!({
                "$map": {
                    "input": input.compile(dialect, program),
                    "as": var,
                    "in": body.compile(dialect, program),
                }
            }),
            Expr::MergeObjects(parts) => json!({
                "$mergeObjects": parts
                    .iter()
                    .map(|p| p.compile(dialect, program))
                    .collect::<Vec<_>>()
            }),
            Expr::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, expr)| (key.clone(), expr.compile(dialect, program)))
                    .collect::<Map<String, Value>>(),
            ),
            Expr::IfArray {
                input,
                then,
                otherwise,
            } => json!({
                "$cond": [
                    { "$isArray": [input.compile(dialect, program)] },
                    then.compile(dialect, program),
                    otherwise.compile(dialect, program),
                ]
            }),
            Expr::IfObject {
                input,
                then,
                otherwise,
            } => json!({
                "$cond": [
                    { "$eq": [{ "$type": input.compile(dialect, program) }, "object"] },
                    then.compile(dialect, program),
                    otherwise.compile(dialect, program),
                ]
            }),
        }
    }
}
