//! Shared application state
use crate::config::ServiceConfig;
use crate::metrics::Metrics;
use anyhow::Result;
use cms_mapping::MappingRegistry;
use cms_section::{QueryCache, SectionAdapter, SectionSource, SnapshotSource};
use std::sync::Arc;

pub struct AppState<S> {
    pub adapter: SectionAdapter<S>,
    pub registry: MappingRegistry,
    pub config: ServiceConfig,
    pub metrics: Metrics,
}

impl<S: SectionSource> AppState<S> {
    pub fn new(source: S, registry: MappingRegistry, config: ServiceConfig) -> Result<Self> {
        let cache = QueryCache::new(source, config.cache_policy());
        Ok(Self {
            adapter: SectionAdapter::new(Arc::new(cache)),
            registry,
            config,
            metrics: Metrics::new()?,
        })
    }
}

impl AppState<SnapshotSource> {
    /// Loads the snapshot and the mapping registry named by the config
    pub fn from_config(config: ServiceConfig) -> Result<Self> {
        tracing::info!(snapshot = %config.snapshot, mappings = %config.mappings, "loading state");
        let source = SnapshotSource::load(&config.snapshot)?;
        let registry = MappingRegistry::load(&config.mappings)?;
        Self::new(source, registry, config)
    }
}
