//! Schema descriptions and the field catalogs built from them.
//!
//! - [`description`]: the static field tree handed to the engine
//! - [`catalog`]: flattened, immutable list of tracked fields
//! - [`registry`]: process-wide catalog cache

pub mod catalog;
pub mod description;
pub mod registry;

pub use catalog::{Catalog, CatalogBuilder, DEFAULT_DERIVED_PREFIX, FieldDescriptor, build_catalog};
pub use description::{FieldKind, SchemaDescription, SchemaField, TrackOptions, Trackable};
pub use registry::CatalogRegistry;
