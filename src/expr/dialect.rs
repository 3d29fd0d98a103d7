//! Expression backends for the tokenizer.
//!
//! The recomputation clause references the tokenizer by value: a dialect
//! turns a [`TokenizerProgram`] into an expression the store evaluates in
//! its own execution engine.
//!
//! - [`MongoDialect`] compiles every step to native aggregation operators.
//! - [`PortableDialect`] emits `{"$tokenize": {"input", "program"}}`, carrying
//!   the serialized program for backends that compile it themselves.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::analysis::{Step, TokenizerProgram};

/// Compiles the tokenizer to a store-side expression.
pub trait ExpressionDialect: Send + Sync {
    /// Expression computing the tokens of `input`. Non-string input must
    /// evaluate to the empty string.
    fn tokenize(&self, input: Value, program: &TokenizerProgram) -> Value;

    /// Name of this dialect (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// Configured dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    #[default]
    Mongo,
    Portable,
}

static MONGO: MongoDialect = MongoDialect;
static PORTABLE: PortableDialect = PortableDialect;

impl DialectKind {
    pub fn dialect(self) -> &'static dyn ExpressionDialect {
        match self {
            DialectKind::Mongo => &MONGO,
            DialectKind::Portable => &PORTABLE,
        }
    }
}

/// Tagged, backend-neutral tokenizer expression.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortableDialect;

impl ExpressionDialect for PortableDialect {
    fn tokenize(&self, input: Value, program: &TokenizerProgram) -> Value {
        json!({
            "$tokenize": {
                "input": input,
                "program": program.steps(),
            }
        })
    }

    fn name(&self) -> &'static str {
        "portable"
    }
}

/// Native MongoDB aggregation operators.
///
/// `$toLower` only folds ASCII, so lowercasing is followed by a `$replaceAll`
/// pass over the Latin-1 and Latin Extended letters. Word splitting uses an
/// explicit class of the Unicode `White_Space` characters since the store's
/// `\s` is ASCII-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDialect;

const SOURCE_VAR: &str = "src";

/// A run of characters outside `White_Space`.
const WORD_REGEX: &str =
    r"[^\t\n\x{0B}\x{0C}\r \x{85}\x{A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}]+";

lazy_static! {
    /// `[upper, lower]` pairs for the letters `$toLower` leaves alone.
    static ref CASE_FOLDS: Value = Value::Array(
        ('\u{C0}'..='\u{24F}')
            .filter_map(|c| {
                let mut lower = c.to_lowercase();
                match (lower.next(), lower.next()) {
                    (Some(l), None) if l != c => Some(json!([c.to_string(), l.to_string()])),
                    _ => None,
                }
            })
            .collect()
    );
}

impl ExpressionDialect for MongoDialect {
    fn tokenize(&self, input: Value, program: &TokenizerProgram) -> Value {
        let mut current = json!(format!("$${SOURCE_VAR}"));
        for step in program.steps() {
            current = mongo_step(step, current);
        }
        json!({
            "$let": {
                "vars": { SOURCE_VAR: input },
                "in": {
                    "$cond": [
                        { "$eq": [{ "$type": format!("$${SOURCE_VAR}") }, "string"] },
                        current,
                        "",
                    ]
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "mongo"
    }
}

fn mongo_step(step: &Step, current: Value) -> Value {
    match step {
        Step::Lowercase => json!({
            "$reduce": {
                "input": CASE_FOLDS.clone(),
                "initialValue": { "$toLower": current },
                "in": {
                    "$replaceAll": {
                        "input": "$$value",
                        "find": { "$arrayElemAt": ["$$this", 0] },
                        "replacement": { "$arrayElemAt": ["$$this", 1] },
                    }
                },
            }
        }),
        Step::SplitWhitespace => json!({
            "$map": {
                "input": { "$regexFindAll": { "input": current, "regex": WORD_REGEX } },
                "as": "m",
                "in": "$$m.match",
            }
        }),
        Step::RemoveStopwords { words } => json!({
            "$filter": {
                "input": current,
                "as": "w",
                "cond": { "$not": [{ "$in": ["$$w", words] }] },
            }
        }),
        Step::TrimChars { chars } => {
            let class = char_class(chars);
            capture_each(current, &format!("^{class}*(.*?){class}*$"), "")
        }
        Step::StripElision {
            prefixes,
            apostrophes,
        } => {
            let markers = prefixes
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            capture_each(
                current,
                &format!(r"^(?:(?:{markers}){}\s*)?(.*)$", char_class(apostrophes)),
                "i",
            )
        }
        Step::Prefixes { min_len } => json!({
            "$reduce": {
                "input": {
                    "$map": {
                        "input": current,
                        "as": "w",
                        "in": {
                            "$map": {
                                "input": { "$range": [min_len, { "$strLenCP": "$$w" }] },
                                "as": "n",
                                "in": { "$substrCP": ["$$w", 0, "$$n"] },
                            }
                        },
                    }
                },
                "initialValue": [],
                "in": { "$concatArrays": ["$$value", "$$this"] },
            }
        }),
        Step::Dedupe => json!({
            "$reduce": {
                "input": current,
                "initialValue": [],
                "in": {
                    "$cond": [
                        { "$in": ["$$this", "$$value"] },
                        "$$value",
                        { "$concatArrays": ["$$value", ["$$this"]] },
                    ]
                },
            }
        }),
        Step::Join { separator } => json!({
            "$ifNull": [
                {
                    "$reduce": {
                        "input": current,
                        "initialValue": null,
                        "in": {
                            "$cond": [
                                { "$eq": ["$$value", null] },
                                "$$this",
                                { "$concat": ["$$value", separator, "$$this"] },
                            ]
                        },
                    }
                },
                "",
            ]
        }),
    }
}

/// Replace every word by the first capture of `regex` on it.
fn capture_each(words: Value, regex: &str, options: &str) -> Value {
    json!({
        "$map": {
            "input": words,
            "as": "w",
            "in": {
                "$let": {
                    "vars": { "found": { "$regexFind": { "input": "$$w", "regex": regex, "options": options } } },
                    "in": { "$arrayElemAt": ["$$found.captures", 0] },
                }
            },
        }
    })
}

fn char_class(chars: &str) -> String {
    let escaped: String = chars.chars().map(|c| regex::escape(&c.to_string())).collect();
    format!("[{escaped}]")
}
