//! Rewriting updates so derived fields are recomputed in the same write.

use std::sync::Arc;

use serde_json::Value;

use crate::engine::config::ShadowConfig;
use crate::error::Result;
use crate::recompute::Recompute;
use crate::schema::Catalog;
use crate::update::normalizer::UpdateNormalizer;

/// Outcome of [`UpdateRewriter::rewrite`].
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    /// No change-tracked field is touched; keep the original update.
    Unchanged,
    /// Pipeline to use instead of the original update.
    Pipeline(Vec<Value>),
}

impl Rewrite {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Rewrite::Unchanged)
    }

    pub fn into_pipeline(self) -> Option<Vec<Value>> {
        match self {
            Rewrite::Unchanged => None,
            Rewrite::Pipeline(pipeline) => Some(pipeline),
        }
    }
}

/// Appends a recomputation stage to updates touching tracked fields.
pub struct UpdateRewriter {
    config: Arc<ShadowConfig>,
    normalizer: Arc<dyn UpdateNormalizer>,
}

impl UpdateRewriter {
    pub fn new(config: Arc<ShadowConfig>, normalizer: Arc<dyn UpdateNormalizer>) -> Self {
        Self { config, normalizer }
    }

    /// Rewrite `update` for the fields of `catalog` it touches.
    ///
    /// The original update is never modified. Pipelines are extended with a
    /// final `$set` stage; operator and replacement updates are first
    /// normalized into a pipeline, and a normalizer failure is returned as
    /// is, without any partial rewrite.
    pub fn rewrite(
        &self,
        catalog: &Catalog,
        filter: &Value,
        update: &Value,
        array_filters: &[Value],
    ) -> Result<Rewrite> {
        if !(update.is_object() || update.is_array()) {
            log::warn!("ignoring update that is neither an object nor a pipeline: {update}");
            return Ok(Rewrite::Unchanged);
        }
        let touched = catalog.touched_by(update);
        if touched.is_empty() {
            return Ok(Rewrite::Unchanged);
        }
        let Some(stage) = Recompute::new(&self.config).set_stage(touched.iter().copied()) else {
            return Ok(Rewrite::Unchanged);
        };

        let mut pipeline = match update.as_array() {
            Some(stages) => stages.clone(),
            None => self.normalizer.to_pipeline(filter, update, array_filters)?,
        };
        pipeline.push(stage);

        log::debug!(
            "rewrote update touching {} tracked field(s) into a {}-stage pipeline",
            touched.len(),
            pipeline.len()
        );
        Ok(Rewrite::Pipeline(pipeline))
    }
}
