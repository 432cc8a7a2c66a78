//! Prometheus counters served on `/metrics`.
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub requests: IntCounterVec,
    pub items_served: IntCounter,
    pub fetch_errors: IntCounter,
    pub cache_invalidations: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let requests = IntCounterVec::new(
            Opts::new("cms_http_requests_total", "HTTP requests by route and status"),
            &["route", "status"],
        )?;
        let items_served = IntCounter::new("cms_items_served_total", "Content items returned")?;
        let fetch_errors = IntCounter::new("cms_fetch_errors_total", "Section fetches that ended in an error")?;
        let cache_invalidations =
            IntCounter::new("cms_cache_invalidations_total", "Cache entries marked stale")?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(items_served.clone()))?;
        registry.register(Box::new(fetch_errors.clone()))?;
        registry.register(Box::new(cache_invalidations.clone()))?;

        Ok(Self {
            registry,
            requests,
            items_served,
            fetch_errors,
            cache_invalidations,
        })
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
