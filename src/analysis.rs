//! Text analysis for derived search fields.
//!
//! The tokenizer turns a source text into a space separated bag of word
//! prefixes, so that a plain full-text index can answer prefix queries:
//!
//! ```text
//! Text → Lowercase → Split → Stop Words → Trim → Elision → Prefixes → Dedupe → Join
//! ```
//!
//! The pipeline is a declarative [`TokenizerProgram`], which lets the same
//! transform run host-side ([`TokenizerProgram::evaluate`]) and be compiled
//! into a store-side expression (see [`crate::expr::dialect`]).
//!
//! # Examples
//!
//! ```
//! use shadow_search::analysis::tokenize;
//!
//! assert_eq!(tokenize("Le Système"), "sys syst systè systèm");
//! ```

pub mod program;
pub mod stopwords;
pub mod tokenizer;

pub use program::{Step, TokenizerProgram};
pub use tokenizer::{tokenize, tokenize_value};
