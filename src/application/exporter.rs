//! One Logstash instance's scrape cycle.
//!
//! `collect()` runs fetch -> decode -> flatten and always ends with the liveness sample.
//! Failures are logged and counted here; they never leave this module.

use crate::application::flattener::{Flattened, TreeFlattener, join_path};
use crate::application::plugins::{PLUGIN_SECTIONS, collect_plugins};
use crate::domain::errors::ScrapeError;
use crate::domain::ports::StatsSource;
use crate::domain::stats::{LabelSet, Sample, StatsNode, sanitize_segment};
use crate::infrastructure::logstash::decode;
use crate::infrastructure::observability::ExporterMetrics;
use prometheus::{Gauge, Opts};
use std::sync::Arc;
use tracing::{error, warn};

/// Sections at the top of the document, flattened under their own name.
pub const TOP_LEVEL_SECTIONS: [&str; 4] = ["jvm", "events", "process", "reloads"];
/// Sections of a pipeline, flattened under `pipeline_<section>`.
pub const PIPELINE_SECTIONS: [&str; 4] = ["events", "reloads", "queue", "dead_letter_queue"];

pub const INSTANCE_LABEL: &str = "instance";
pub const UP_HELP: &str = "Was the last scrape of logstash successful";
pub const PIPELINE_LABEL: &str = "pipeline";

const PIPELINES_KEY: &str = "pipelines";
const PIPELINE_KEY: &str = "pipeline";
const PLUGINS_KEY: &str = "plugins";
const PLUGINS_PREFIX: &str = "pipeline_plugins";

/// Name of the liveness family for `host`: `<namespace>_<host>_up`.
pub fn up_metric_name(namespace: &str, host: &str) -> String {
    format!("{}_{}_up", namespace, sanitize_segment(host))
}

pub struct Exporter {
    host: String,
    source: Arc<dyn StatsSource>,
    flattener: TreeFlattener,
    base_labels: LabelSet,
    up_name: String,
    up: Gauge,
    metrics: ExporterMetrics,
}

impl Exporter {
    pub fn new(
        host: impl Into<String>,
        source: Arc<dyn StatsSource>,
        flattener: TreeFlattener,
        metrics: ExporterMetrics,
    ) -> anyhow::Result<Self> {
        let host = host.into();
        let up_name = up_metric_name(flattener.namespace(), &host);
        let up = Gauge::with_opts(Opts::new(up_name.clone(), UP_HELP))?;

        Ok(Self {
            host,
            source,
            flattener,
            base_labels: LabelSet::new(),
            up_name,
            up,
            metrics,
        })
    }

    /// Adds `instance=<host>` to every sample this exporter produces.
    pub fn with_instance_label(mut self) -> Self {
        self.base_labels
            .insert(INSTANCE_LABEL.to_string(), self.host.clone());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn up_name(&self) -> &str {
        &self.up_name
    }

    /// Whether the last fetch reached the endpoint and got a usable response.
    pub fn is_up(&self) -> bool {
        self.up.get() > 0.0
    }

    /// Runs one scrape cycle.
    pub async fn collect(&self) -> Vec<Sample> {
        let _timer = self
            .metrics
            .scrape_duration_seconds
            .with_label_values(&[self.host.as_str()])
            .start_timer();

        let (up, fetched) = self.fetch_stats().await;
        let mut samples = match fetched {
            Ok(stats) => self.collect_stats(&stats),
            Err(e) => {
                self.record_error(&e);
                Vec::new()
            }
        };

        // Liveness as written by this cycle
        samples.push(Sample::new(self.up_name.clone(), self.base_labels.clone(), up));
        samples
    }

    /// Fetches and decodes the document, returning the liveness value it wrote.
    async fn fetch_stats(&self) -> (f64, Result<StatsNode, ScrapeError>) {
        let fetched = self.source.fetch().await;

        // Single liveness write per scrape
        let up = match &fetched {
            Err(e) if e.marks_down() => 0.0,
            _ => 1.0,
        };
        self.up.set(up);

        (up, fetched.and_then(|body| decode(&body)))
    }

    /// Flattens a decoded document into samples (liveness excluded).
    ///
    /// Skipped subtrees are logged and counted as `shape` errors.
    pub fn collect_stats(&self, stats: &StatsNode) -> Vec<Sample> {
        let mut collected = Flattened::default();

        for section in TOP_LEVEL_SECTIONS {
            if let Some(tree) = stats.get(section) {
                collected.append(self.flattener.flatten(section, tree, &self.base_labels));
            }
        }

        match (stats.get(PIPELINES_KEY), stats.get(PIPELINE_KEY)) {
            (Some(pipelines), _) => match pipelines.as_mapping() {
                Some(pipelines) => {
                    for (name, pipeline) in pipelines {
                        self.collect_pipeline(Some(name.as_str()), pipeline, &mut collected);
                    }
                }
                None => collected.errors.push(ScrapeError::shape(
                    PIPELINES_KEY,
                    "mapping",
                    pipelines.kind(),
                )),
            },
            (None, Some(pipeline)) => self.collect_pipeline(None, pipeline, &mut collected),
            (None, None) => collected
                .errors
                .push(ScrapeError::shape(PIPELINE_KEY, "mapping", "nothing")),
        }

        for error in &collected.errors {
            self.record_error(error);
        }
        collected.samples
    }

    fn collect_pipeline(&self, name: Option<&str>, stats: &StatsNode, out: &mut Flattened) {
        if stats.as_mapping().is_none() {
            let path = match name {
                Some(name) => format!("{}.{}", PIPELINES_KEY, name),
                None => PIPELINE_KEY.to_string(),
            };
            out.errors
                .push(ScrapeError::shape(path, "mapping", stats.kind()));
            return;
        }

        let mut labels = self.base_labels.clone();
        if let Some(name) = name {
            labels.insert(PIPELINE_LABEL.to_string(), name.to_string());
        }

        for section in PIPELINE_SECTIONS {
            if let Some(tree) = stats.get(section) {
                let path = join_path(PIPELINE_KEY, section);
                out.append(self.flattener.flatten(&path, tree, &labels));
            }
        }

        if let Some(plugins) = stats.get(PLUGINS_KEY) {
            for section in PLUGIN_SECTIONS {
                match collect_plugins(&self.flattener, PLUGINS_PREFIX, section, plugins, &labels) {
                    Ok(plugins) => out.append(plugins),
                    Err(e) => out.errors.push(e),
                }
            }
        }
    }

    fn record_error(&self, e: &ScrapeError) {
        let endpoint = self.source.endpoint();
        match e {
            ScrapeError::Shape { .. } => {
                warn!(host = %self.host, endpoint, kind = e.kind(), "Skipping node stats subtree: {}", e);
            }
            _ => {
                error!(host = %self.host, endpoint, kind = e.kind(), "Scrape failed: {}", e);
            }
        }
        self.metrics.inc_errors(&self.host, e.kind());
    }
}
