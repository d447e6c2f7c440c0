//! Per-scrape registry for dynamically named families.
//!
//! The set of families depends on the shape of each document, so a fresh registry is
//! built for every scrape and dropped after encoding. Nothing is registered globally.

use crate::domain::stats::Sample;
use prometheus::{Gauge, GaugeVec, Opts, Registry, proto::MetricFamily};
use std::collections::HashMap;
use tracing::warn;

const DEFAULT_HELP: &str = "Logstash node statistic";

enum Family {
    Plain(Gauge),
    Labeled {
        gauges: GaugeVec,
        label_names: Vec<String>,
    },
}

pub struct SampleRegistry {
    registry: Registry,
    families: HashMap<String, Family>,
    help: HashMap<String, String>,
    recorded: usize,
}

impl Default for SampleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleRegistry {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            families: HashMap::new(),
            help: HashMap::new(),
            recorded: 0,
        }
    }

    /// Sets the help text of `name`. Must be called before its first sample.
    pub fn describe(&mut self, name: impl Into<String>, help: impl Into<String>) {
        self.help.insert(name.into(), help.into());
    }

    /// Number of samples accepted so far.
    pub fn len(&self) -> usize {
        self.recorded
    }

    pub fn is_empty(&self) -> bool {
        self.recorded == 0
    }

    /// Records every sample, logging and skipping the ones that conflict with an existing family.
    pub fn record_all<'a>(&mut self, samples: impl IntoIterator<Item = &'a Sample>) {
        for sample in samples {
            if let Err(e) = self.record(sample) {
                warn!(metric = %sample.name, error = %e, "Dropping sample");
            }
        }
    }

    /// Records one sample as a gauge.
    ///
    /// All samples of one family must share the same label names.
    pub fn record(&mut self, sample: &Sample) -> Result<(), prometheus::Error> {
        let label_names: Vec<&str> = sample.labels.keys().map(String::as_str).collect();

        if !self.families.contains_key(&sample.name) {
            let family = self.register_family(&sample.name, &label_names)?;
            self.families.insert(sample.name.clone(), family);
        }

        match self.families.get(&sample.name) {
            Some(Family::Plain(gauge)) if label_names.is_empty() => {
                gauge.set(sample.value);
            }
            Some(Family::Labeled {
                gauges,
                label_names: expected,
            }) if expected.iter().map(String::as_str).eq(label_names.iter().copied()) => {
                let values: Vec<&str> = sample.labels.values().map(String::as_str).collect();
                gauges
                    .get_metric_with_label_values(values.as_slice())?
                    .set(sample.value);
            }
            _ => {
                return Err(prometheus::Error::Msg(format!(
                    "label names {:?} do not match the existing family",
                    label_names
                )));
            }
        }

        self.recorded += 1;
        Ok(())
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    fn register_family(
        &self,
        name: &str,
        label_names: &[&str],
    ) -> Result<Family, prometheus::Error> {
        let help = self.help.get(name).map_or(DEFAULT_HELP, String::as_str);
        let opts = Opts::new(name, help);
        if label_names.is_empty() {
            let gauge = Gauge::with_opts(opts)?;
            self.registry.register(Box::new(gauge.clone()))?;
            Ok(Family::Plain(gauge))
        } else {
            let gauges = GaugeVec::new(opts, label_names)?;
            self.registry.register(Box::new(gauges.clone()))?;
            Ok(Family::Labeled {
                gauges,
                label_names: label_names.iter().map(|s| s.to_string()).collect(),
            })
        }
    }
}
