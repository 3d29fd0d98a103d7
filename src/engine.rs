pub mod config;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::aggregate::{merge_target, patch_merge};
use crate::error::Result;
use crate::index::TextIndexSpec;
use crate::projection::hide_derived;
use crate::schema::{Catalog, CatalogBuilder, CatalogRegistry, SchemaDescription};
use crate::seed::{seed, seed_many};
use crate::update::bulk::BulkOperation;
use crate::update::normalizer::{OperatorNormalizer, UpdateNormalizer};
use crate::update::rewriter::{Rewrite, UpdateRewriter};
use crate::update::UpdateQuery;

use self::config::ShadowConfig;

/// Per-call options of every hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookOptions {
    /// When set the hook leaves its input untouched.
    pub skip: bool,
}

impl HookOptions {
    pub fn skip() -> Self {
        Self { skip: true }
    }
}

/// Keeps the derived search fields of one collection consistent.
///
/// The engine acts as the host integration point: each `before_*` hook is
/// called with the operation about to be sent to the store and adjusts it
/// in place, so that source fields and their derived tokens are always
/// written together.
pub struct ShadowEngine {
    catalog: Arc<Catalog>,
    config: Arc<ShadowConfig>,
    rewriter: UpdateRewriter,
}

impl ShadowEngine {
    /// Create an engine over an already built catalog.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Tracked fields of the collection.
    /// * `config` - Engine configuration, validated here.
    /// * `normalizer` - Translates operator updates into pipelines.
    pub fn new(
        catalog: Arc<Catalog>,
        config: ShadowConfig,
        normalizer: Arc<dyn UpdateNormalizer>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let rewriter = UpdateRewriter::new(config.clone(), normalizer);
        log::info!(
            "shadow engine ready: {} tracked field(s), {} dialect",
            catalog.len(),
            config.dialect.dialect().name()
        );
        Ok(Self {
            catalog,
            config,
            rewriter,
        })
    }

    /// Engine with the default configuration and [`OperatorNormalizer`].
    pub fn with_defaults(catalog: Arc<Catalog>) -> Result<Self> {
        Self::new(catalog, ShadowConfig::default(), Arc::new(OperatorNormalizer))
    }

    /// Build the catalog of `description` with the configured derived
    /// prefix, then create the engine.
    pub fn from_schema(
        description: &SchemaDescription,
        config: ShadowConfig,
        normalizer: Arc<dyn UpdateNormalizer>,
    ) -> Result<Self> {
        config.validate()?;
        let catalog = CatalogBuilder::new(config.derived_prefix.clone()).build(description)?;
        Self::new(Arc::new(catalog), config, normalizer)
    }

    /// Like [`ShadowEngine::from_schema`], sharing the catalog through
    /// `registry` under `schema` and binding it to `collection`.
    pub fn register(
        registry: &CatalogRegistry,
        schema: &str,
        collection: &str,
        description: &SchemaDescription,
        config: ShadowConfig,
        normalizer: Arc<dyn UpdateNormalizer>,
    ) -> Result<Self> {
        config.validate()?;
        let builder = CatalogBuilder::new(config.derived_prefix.clone());
        let catalog = registry.get_or_build(schema, description, &builder)?;
        registry.bind_collection(collection, schema);
        Self::new(catalog, config, normalizer)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    /// Seed the derived fields of a document about to be saved.
    pub fn before_save(&self, document: &mut Value, options: HookOptions) {
        if options.skip {
            return;
        }
        seed(document, &self.catalog, &self.config.tokenizer);
    }

    /// Seed every document of an insert batch.
    pub fn before_insert_many(&self, documents: &mut [Value], options: HookOptions) {
        if options.skip || documents.is_empty() {
            return;
        }
        seed_many(documents, &self.catalog, &self.config.tokenizer);
        log::debug!("seeded {} document(s)", documents.len());
    }

    /// Rewrite a filtered update (updateOne, updateMany, findOneAndUpdate,
    /// findOneAndReplace).
    ///
    /// Returns whether the update was replaced. On error the query is left
    /// as it was.
    pub fn before_update(&self, query: &mut UpdateQuery, options: HookOptions) -> Result<bool> {
        if options.skip {
            return Ok(false);
        }
        let Some(update) = &query.update else {
            return Ok(false);
        };
        match self
            .rewriter
            .rewrite(&self.catalog, &query.filter, update, &query.array_filters)?
        {
            Rewrite::Unchanged => Ok(false),
            Rewrite::Pipeline(pipeline) => {
                query.update = Some(Value::Array(pipeline));
                Ok(true)
            }
        }
    }

    /// Rewrite the updates and seed the documents of a bulk write.
    ///
    /// Every update is rewritten before any operation is modified, so a
    /// failing update leaves the whole batch untouched. Returns the number
    /// of rewritten updates.
    pub fn before_bulk_write(
        &self,
        operations: &mut [BulkOperation],
        options: HookOptions,
    ) -> Result<usize> {
        if options.skip || operations.is_empty() {
            return Ok(0);
        }

        let mut rewrites = Vec::with_capacity(operations.len());
        for operation in operations.iter() {
            let rewrite = match operation {
                BulkOperation::UpdateOne(block) | BulkOperation::UpdateMany(block) => {
                    self.rewriter.rewrite(
                        &self.catalog,
                        &block.filter,
                        &block.update,
                        &block.array_filters,
                    )?
                }
                _ => Rewrite::Unchanged,
            };
            rewrites.push(rewrite);
        }

        let mut rewritten = 0;
        for (operation, rewrite) in operations.iter_mut().zip(rewrites) {
            match operation {
                BulkOperation::UpdateOne(block) | BulkOperation::UpdateMany(block) => {
                    if let Rewrite::Pipeline(pipeline) = rewrite {
                        block.update = Value::Array(pipeline);
                        rewritten += 1;
                    }
                }
                BulkOperation::InsertOne { document } => {
                    seed(document, &self.catalog, &self.config.tokenizer)
                }
                BulkOperation::ReplaceOne(block) => {
                    seed(&mut block.replacement, &self.catalog, &self.config.tokenizer)
                }
                BulkOperation::DeleteOne { .. } | BulkOperation::DeleteMany { .. } => {}
            }
        }
        log::debug!(
            "bulk write: {rewritten} of {} operation(s) rewritten",
            operations.len()
        );
        Ok(rewritten)
    }

    /// Patch the trailing `$merge` of an aggregation with the catalog of its
    /// target collection. Returns whether the pipeline changed.
    ///
    /// Targets without a registered catalog are left alone.
    pub fn before_aggregate(
        &self,
        pipeline: &mut [Value],
        registry: &CatalogRegistry,
        options: HookOptions,
    ) -> bool {
        if options.skip {
            return false;
        }
        let Some(target) = merge_target(pipeline) else {
            return false;
        };
        let Some(catalog) = registry.for_collection_in(target.db.as_deref(), &target.collection)
        else {
            log::debug!(
                "no catalog bound to merge target '{}.{}', pipeline left as is",
                target.db.as_deref().unwrap_or("<current>"),
                target.collection
            );
            return false;
        };
        patch_merge(pipeline, &catalog, &self.config)
    }

    /// Projection for a read, hiding derived fields unless requested with a
    /// `+path` key or an explicit include.
    pub fn before_find(
        &self,
        projection: Option<&Map<String, Value>>,
        options: HookOptions,
    ) -> Option<Map<String, Value>> {
        if options.skip {
            return projection.cloned();
        }
        Some(hide_derived(projection, &self.catalog))
    }

    /// Text index over the tracked fields, if any.
    pub fn text_index(&self) -> Option<TextIndexSpec> {
        TextIndexSpec::from_catalog(&self.catalog, self.config.index_name.clone())
    }
}
