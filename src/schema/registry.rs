//! Process-wide cache of built catalogs.
//!
//! Catalogs are built once per schema and shared read-only through `Arc`.
//! The registry also remembers which collection stores documents of which
//! schema, so that aggregation merges can find the catalog of their target.
//! Collections are keyed by database too: a binding without a database only
//! answers merges that name no database.

use std::sync::Arc;

use ahash::AHashMap;
use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::error::Result;
use crate::schema::catalog::{Catalog, CatalogBuilder};
use crate::schema::description::SchemaDescription;

lazy_static! {
    static ref GLOBAL: CatalogRegistry = CatalogRegistry::new();
}

#[derive(Debug, Default)]
struct RegistryInner {
    catalogs: AHashMap<String, Arc<Catalog>>,
    collections: AHashMap<(Option<String>, String), String>,
}

/// Schema name → catalog, (database, collection) → schema name.
#[derive(Debug, Default)]
pub struct CatalogRegistry {
    inner: RwLock<RegistryInner>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static CatalogRegistry {
        &GLOBAL
    }

    /// Register an already built catalog. The first registration for a
    /// schema wins; later ones return the cached catalog.
    pub fn register(&self, schema: impl Into<String>, catalog: Catalog) -> Arc<Catalog> {
        let mut inner = self.inner.write();
        inner
            .catalogs
            .entry(schema.into())
            .or_insert_with(|| Arc::new(catalog))
            .clone()
    }

    /// Return the cached catalog of `schema`, building it on first use.
    pub fn get_or_build(
        &self,
        schema: &str,
        description: &SchemaDescription,
        builder: &CatalogBuilder,
    ) -> Result<Arc<Catalog>> {
        if let Some(catalog) = self.get(schema) {
            return Ok(catalog);
        }
        let catalog = builder.build(description)?;
        log::debug!(
            "built catalog for schema '{schema}' with {} tracked field(s)",
            catalog.len()
        );
        Ok(self.register(schema, catalog))
    }

    pub fn get(&self, schema: &str) -> Option<Arc<Catalog>> {
        self.inner.read().catalogs.get(schema).cloned()
    }

    /// Record that `collection` of the current database stores documents of
    /// `schema`.
    pub fn bind_collection(&self, collection: impl Into<String>, schema: impl Into<String>) {
        self.insert_binding(None, collection.into(), schema.into());
    }

    /// Record that `collection` of database `db` stores documents of `schema`.
    pub fn bind_collection_in(
        &self,
        db: impl Into<String>,
        collection: impl Into<String>,
        schema: impl Into<String>,
    ) {
        self.insert_binding(Some(db.into()), collection.into(), schema.into());
    }

    fn insert_binding(&self, db: Option<String>, collection: String, schema: String) {
        self.inner
            .write()
            .collections
            .insert((db, collection), schema);
    }

    /// Catalog of the schema bound to `collection` of the current database.
    pub fn for_collection(&self, collection: &str) -> Option<Arc<Catalog>> {
        self.for_collection_in(None, collection)
    }

    /// Catalog of the schema bound to `collection` of `db`, `None` meaning
    /// the current database.
    pub fn for_collection_in(&self, db: Option<&str>, collection: &str) -> Option<Arc<Catalog>> {
        let inner = self.inner.read();
        let key = (db.map(str::to_string), collection.to_string());
        let schema = inner.collections.get(&key)?;
        inner.catalogs.get(schema).cloned()
    }
}
