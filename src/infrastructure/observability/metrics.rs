//! Prometheus metrics about the exporter itself.
//!
//! These families are static and live for the whole process, unlike the
//! flattened Logstash families which are rebuilt on every scrape.

use prometheus::{
    CounterVec, HistogramOpts, HistogramVec, Opts, Registry, proto::MetricFamily,
};
use std::sync::Arc;

/// Self-observability metrics, shared by every exporter.
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Arc<Registry>,
    /// Time spent in one collect cycle per upstream host
    pub scrape_duration_seconds: HistogramVec,
    /// Scrape errors by host and kind
    pub scrape_errors_total: CounterVec,
}

impl ExporterMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let scrape_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "logstash_exporter_scrape_duration_seconds",
                "Duration of a Logstash node stats scrape in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["host"],
        )?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;

        let scrape_errors_total = CounterVec::new(
            Opts::new(
                "logstash_exporter_scrape_errors_total",
                "Total Logstash scrape errors by kind",
            ),
            &["host", "kind"],
        )?;
        registry.register(Box::new(scrape_errors_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            scrape_duration_seconds,
            scrape_errors_total,
        })
    }

    pub fn inc_errors(&self, host: &str, kind: &str) {
        self.scrape_errors_total
            .with_label_values(&[host, kind])
            .inc();
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}
