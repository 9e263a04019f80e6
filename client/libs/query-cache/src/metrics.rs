//! Cache metrics for observability

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

use crate::keys::QueryKey;

static METRICS: OnceLock<Option<CacheMetricsInner>> = OnceLock::new();

struct CacheMetricsInner {
    hits: CounterVec,
    stale_hits: CounterVec,
    misses: CounterVec,
    writes: CounterVec,
    invalidations: CounterVec,
    errors: CounterVec,
}

impl CacheMetricsInner {
    fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            hits: CounterVec::new(
                Opts::new("snapgram_query_cache_hits_total", "Total fresh cache hits"),
                &["entity"],
            )?,
            stale_hits: CounterVec::new(
                Opts::new(
                    "snapgram_query_cache_stale_hits_total",
                    "Total cache hits on invalidated entries",
                ),
                &["entity"],
            )?,
            misses: CounterVec::new(
                Opts::new("snapgram_query_cache_misses_total", "Total cache misses"),
                &["entity"],
            )?,
            writes: CounterVec::new(
                Opts::new("snapgram_query_cache_writes_total", "Total cache writes"),
                &["entity"],
            )?,
            invalidations: CounterVec::new(
                Opts::new(
                    "snapgram_query_cache_invalidations_total",
                    "Total cache invalidations",
                ),
                &["entity"],
            )?,
            errors: CounterVec::new(
                Opts::new("snapgram_query_cache_errors_total", "Total cache errors"),
                &["entity", "error_type"],
            )?,
        })
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.hits.clone()))?;
        registry.register(Box::new(self.stale_hits.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.invalidations.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> Option<&'static CacheMetricsInner> {
    METRICS
        .get_or_init(|| match CacheMetricsInner::new() {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                tracing::warn!(error = %e, "Query cache metrics disabled");
                None
            }
        })
        .as_ref()
}

/// Cache metrics wrapper
#[derive(Clone, Default)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        match get_metrics() {
            Some(metrics) => metrics.register(registry),
            None => Ok(()),
        }
    }

    pub fn record_hit(&self, key: &QueryKey) {
        if let Some(m) = get_metrics() {
            m.hits.with_label_values(&[key.entity()]).inc();
        }
    }

    pub fn record_stale_hit(&self, key: &QueryKey) {
        if let Some(m) = get_metrics() {
            m.stale_hits.with_label_values(&[key.entity()]).inc();
        }
    }

    pub fn record_miss(&self, key: &QueryKey) {
        if let Some(m) = get_metrics() {
            m.misses.with_label_values(&[key.entity()]).inc();
        }
    }

    pub fn record_write(&self, key: &QueryKey) {
        if let Some(m) = get_metrics() {
            m.writes.with_label_values(&[key.entity()]).inc();
        }
    }

    pub fn record_invalidation(&self, key: &QueryKey) {
        if let Some(m) = get_metrics() {
            m.invalidations.with_label_values(&[key.entity()]).inc();
        }
    }

    pub fn record_error(&self, key: &QueryKey, error_type: &str) {
        if let Some(m) = get_metrics() {
            m.errors
                .with_label_values(&[key.entity(), error_type])
                .inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_exposes_counters() {
        let registry = Registry::new();
        CacheMetrics::register(&registry).unwrap();

        let metrics = CacheMetrics::new();
        metrics.record_hit(&QueryKey::RecentPosts);
        metrics.record_miss(&QueryKey::FeedPages);

        let names: Vec<_> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"snapgram_query_cache_hits_total".to_string()));
        assert!(names.contains(&"snapgram_query_cache_misses_total".to_string()));
    }
}
