//! Prometheus exposition for the exporter.
//!
//! Two kinds of families end up on the metrics page:
//!
//! 1. **Flattened node stats**: rebuilt per scrape in a [`SampleRegistry`]
//! 2. **Self metrics**: static families in [`ExporterMetrics`]

pub mod metrics;
pub mod sample_registry;

pub use metrics::ExporterMetrics;
pub use sample_registry::SampleRegistry;

use crate::domain::stats::Sample;
use prometheus::TextEncoder;

/// Encodes one scrape's samples together with the self metrics in the text format.
///
/// `help` gives `(family, help text)` pairs for families that have their own description.
pub fn render_scrape<'a>(
    metrics: &ExporterMetrics,
    help: impl IntoIterator<Item = (&'a str, &'a str)>,
    samples: &[Sample],
) -> Result<String, prometheus::Error> {
    let mut registry = SampleRegistry::new();
    for (name, text) in help {
        registry.describe(name, text);
    }
    registry.record_all(samples);

    let mut families = registry.gather();
    families.extend(metrics.gather());

    TextEncoder::new().encode_to_string(&families)
}
