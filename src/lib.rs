//! # Shadow Search
//!
//! Keeps hidden, tokenized "shadow" copies of text fields consistent with
//! their source values, so a plain full-text index over the shadows answers
//! prefix searches.
//!
//! ## Features
//!
//! - French prefix tokenizer, expressed as a declarative program
//! - Field catalogs built from schema descriptions
//! - Conservative change detection over update descriptions
//! - Update and aggregation rewriting with store-side recomputation
//! - Host-side seeding of new documents
pub mod aggregate;
pub mod analysis;
pub mod engine;
mod error;
pub mod expr;
pub mod index;
pub mod projection;
pub mod recompute;
pub mod schema;
pub mod seed;
pub mod update;
pub mod util;

// Re-exports for the public API
pub use analysis::{Step, TokenizerProgram, tokenize, tokenize_value};
pub use engine::config::{ShadowConfig, ShadowConfigBuilder};
pub use engine::{HookOptions, ShadowEngine};
pub use error::{Result, ShadowError};
pub use expr::dialect::{DialectKind, ExpressionDialect, MongoDialect, PortableDialect};
pub use index::TextIndexSpec;
pub use schema::{
    Catalog, CatalogBuilder, CatalogRegistry, FieldDescriptor, FieldKind, SchemaDescription,
    SchemaField, TrackOptions, Trackable, build_catalog,
};
pub use update::bulk::{BulkOperation, ReplaceBlock, UpdateBlock};
pub use update::{OperatorNormalizer, Rewrite, UpdateNormalizer, UpdateQuery, UpdateRewriter};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
