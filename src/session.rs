//! Explicit load / query lifecycle over one data source.
//!
//! A [`Session`] owns the source and the current [`Dataset`] snapshot.
//! Loading happens in [`Session::load`] and [`Session::reload`] only, never as
//! a side effect of a query. A failed reload keeps the previous snapshot.
//! Queries borrow the snapshot read-only, so they need no locking.

use std::{collections::HashMap, sync::Arc};

use log::{debug, info};

use crate::{
    data::{DEFAULT_PLACEHOLDER, TypedValue},
    dataset::Dataset,
    derive::{MetricTable, MetricValue},
    error::{LoadError, LookupError},
    report::{CoreReport, FieldReport},
    rows::ResolvedRow,
    schema::normalize_label,
    source::{DataSource, SourceIdentity},
};

pub fn load_dataset(source: &dyn DataSource) -> Result<Dataset, LoadError> {
    let identity = source.identity();
    let table = source
        .read_table()
        .map_err(|err| LoadError::unreadable(identity.to_string(), err))?;
    Dataset::from_table(identity, table)
}

/// Loaded datasets keyed by source identity. Entries are only replaced by
/// [`DatasetCache::invalidate`]; there is no expiry.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<SourceIdentity, Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, source: &dyn DataSource) -> Result<Arc<Dataset>, LoadError> {
        let identity = source.identity();
        if let Some(dataset) = self.entries.get(&identity) {
            debug!("Reusing cached dataset for {identity}");
            return Ok(Arc::clone(dataset));
        }
        let dataset = Arc::new(load_dataset(source)?);
        self.entries.insert(identity, Arc::clone(&dataset));
        Ok(dataset)
    }

    pub fn invalidate(&mut self, identity: &SourceIdentity) -> bool {
        self.entries.remove(identity).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct Session {
    source: Box<dyn DataSource>,
    dataset: Arc<Dataset>,
    metrics: MetricTable,
    placeholder: String,
}

impl Session {
    pub fn load(source: Box<dyn DataSource>) -> Result<Self, LoadError> {
        let dataset = Arc::new(load_dataset(source.as_ref())?);
        Ok(Self::from_parts(source, dataset))
    }

    pub fn load_cached(
        source: Box<dyn DataSource>,
        cache: &mut DatasetCache,
    ) -> Result<Self, LoadError> {
        let dataset = cache.get_or_load(source.as_ref())?;
        Ok(Self::from_parts(source, dataset))
    }

    fn from_parts(source: Box<dyn DataSource>, dataset: Arc<Dataset>) -> Self {
        Session {
            source,
            dataset,
            metrics: MetricTable::default(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricTable) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Re-reads the source and swaps in the new snapshot.
    pub fn reload(&mut self) -> Result<(), LoadError> {
        let dataset = load_dataset(self.source.as_ref())?;
        info!("Reloaded {}", dataset.identity());
        self.dataset = Arc::new(dataset);
        Ok(())
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn metrics(&self) -> &MetricTable {
        &self.metrics
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn resolve(&self, identifier: &str) -> Result<ResolvedRow, LookupError> {
        self.dataset.resolve(identifier)
    }

    pub fn compute(&self, metric: &str, row: &ResolvedRow) -> MetricValue {
        self.metrics.compute(metric, row)
    }

    pub fn query(&self, identifier: &str) -> Result<CoreReport, LookupError> {
        let row = self.resolve(identifier)?;
        Ok(self.report(row))
    }

    /// Reports for every row sharing the identifier, in dataset order.
    pub fn query_all(&self, identifier: &str) -> Result<Vec<CoreReport>, LookupError> {
        Ok(self
            .dataset
            .resolve_all(identifier)?
            .into_iter()
            .map(|row| self.report(row))
            .collect())
    }

    /// A single dimension. `dimension` may be a raw header label or a field
    /// key; it is normalized before matching.
    pub fn field(&self, identifier: &str, dimension: &str) -> Result<FieldReport, LookupError> {
        let row = self.resolve(identifier)?;
        let key = normalize_label(dimension);
        let schema = self.dataset.schema();
        let slot = schema
            .slot_of(&key)
            .ok_or_else(|| LookupError::FieldNotFound {
                field: dimension.trim().to_string(),
            })?;
        let value = row
            .get(&key)
            .cloned()
            .unwrap_or(TypedValue::Unavailable);
        Ok(FieldReport::new(
            &key,
            schema.label_of(slot).unwrap_or(dimension),
            value,
            &self.placeholder,
        ))
    }

    fn report(&self, row: ResolvedRow) -> CoreReport {
        CoreReport::build(&self.dataset, row, &self.metrics, &self.placeholder)
    }
}
