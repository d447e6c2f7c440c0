//! Statistics tree flattening.
//!
//! Walks a decoded `/_node/stats` subtree depth-first and turns every numeric leaf into a
//! [`Sample`] whose name is the underscore-joined path below the namespace. Mapping traversal
//! never adds labels; the only label introduced here is `field`, by the per-field rule.
//! Subtrees that cannot be read are reported in [`Flattened::errors`] for the caller to count.

use crate::domain::errors::ScrapeError;
use crate::domain::stats::{LabelSet, Sample, StatsNode, sanitize_segment};
use chrono::DateTime;
use std::collections::BTreeMap;

pub const DEFAULT_NAMESPACE: &str = "logstash";
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Key whose value is keyed by event field name rather than by statistic.
pub const FIELD_COLLECTION_KEY: &str = "patterns_per_field";
pub const FIELD_LABEL: &str = "field";

/// Samples of one flattening pass plus the subtrees it had to skip.
#[derive(Debug, Default)]
pub struct Flattened {
    pub samples: Vec<Sample>,
    pub errors: Vec<ScrapeError>,
}

impl Flattened {
    pub fn append(&mut self, other: Flattened) {
        self.samples.extend(other.samples);
        self.errors.extend(other.errors);
    }
}

#[derive(Debug, Clone)]
pub struct TreeFlattener {
    namespace: String,
    max_depth: usize,
}

impl Default for TreeFlattener {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl TreeFlattener {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: sanitize_segment(&namespace.into()),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Subtrees nested deeper than `max_depth` below the flattening root are dropped.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Flattens `node` found at `path` (relative to the namespace) with `labels` on every sample.
    pub fn flatten(&self, path: &str, node: &StatsNode, labels: &LabelSet) -> Flattened {
        let mut out = Flattened::default();
        self.walk(path, node, labels, 0, &mut out);
        out
    }

    /// Like [`flatten`](Self::flatten) on a mapping, leaving out the entries named in `exclude`.
    pub fn flatten_entries(
        &self,
        path: &str,
        entries: &BTreeMap<String, StatsNode>,
        exclude: &[&str],
        labels: &LabelSet,
    ) -> Flattened {
        let mut out = Flattened::default();
        self.walk_entries(path, entries, exclude, labels, 0, &mut out);
        out
    }

    /// Full metric name for a path: `<namespace>_<path>`.
    pub fn metric_name(&self, path: &str) -> String {
        if path.is_empty() {
            self.namespace.clone()
        } else {
            format!("{}_{}", self.namespace, path)
        }
    }

    fn walk(
        &self,
        path: &str,
        node: &StatsNode,
        labels: &LabelSet,
        depth: usize,
        out: &mut Flattened,
    ) {
        if depth > self.max_depth {
            out.errors
                .push(ScrapeError::shape(path, "bounded nesting", node.kind()));
            return;
        }

        if let Some(value) = coerce_numeric(node) {
            out.samples.push(Sample::new(self.metric_name(path), labels.clone(), value));
            return;
        }

        // Lists and non-numeric scalars carry nothing exportable here
        if let StatsNode::Mapping(entries) = node {
            self.walk_entries(path, entries, &[], labels, depth, out);
        }
    }

    fn walk_entries(
        &self,
        path: &str,
        entries: &BTreeMap<String, StatsNode>,
        exclude: &[&str],
        labels: &LabelSet,
        depth: usize,
        out: &mut Flattened,
    ) {
        for (key, child) in entries {
            if exclude.contains(&key.as_str()) {
                continue;
            }
            let child_path = join_path(path, key);
            if key == FIELD_COLLECTION_KEY {
                self.collect_fields(&child_path, child, labels, out);
            } else {
                self.walk(&child_path, child, labels, depth + 1, out);
            }
        }
    }

    /// Per-field rule: each field name becomes a `field` label instead of a name segment.
    fn collect_fields(
        &self,
        path: &str,
        node: &StatsNode,
        labels: &LabelSet,
        out: &mut Flattened,
    ) {
        let Some(fields) = node.as_mapping() else {
            out.errors.push(ScrapeError::shape(path, "mapping", node.kind()));
            return;
        };

        for (field, data) in fields {
            let mut field_labels = labels.clone();
            field_labels.insert(FIELD_LABEL.to_string(), field.clone());

            if let Some(value) = coerce_numeric(data) {
                out.samples
                    .push(Sample::new(self.metric_name(path), field_labels, value));
                continue;
            }

            // Entry names stay in the metric name so two entries of one field never collide
            if let Some(per_field) = data.as_mapping() {
                for (entry, entry_value) in per_field {
                    if let Some(value) = coerce_numeric(entry_value) {
                        out.samples.push(Sample::new(
                            self.metric_name(&join_path(path, entry)),
                            field_labels.clone(),
                            value,
                        ));
                    }
                }
            }
        }
    }
}

/// Appends a sanitized `key` to `prefix` with an underscore.
pub fn join_path(prefix: &str, key: &str) -> String {
    let key = sanitize_segment(key);
    if prefix.is_empty() {
        key
    } else {
        format!("{prefix}_{key}")
    }
}

/// Numeric value of a leaf: finite numbers as they are, RFC 3339 strings as epoch seconds.
pub fn coerce_numeric(node: &StatsNode) -> Option<f64> {
    match node {
        StatsNode::Number(value) if value.is_finite() => Some(*value),
        StatsNode::Text(text) => parse_timestamp(text),
        _ => None,
    }
}

fn parse_timestamp(text: &str) -> Option<f64> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_nanos()) / 1e9)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stats::labels;
    use serde_json::json;

    fn node(value: serde_json::Value) -> StatsNode {
        StatsNode::from(value)
    }

    fn find<'a>(samples: &'a [Sample], name: &str) -> Vec<&'a Sample> {
        samples.iter().filter(|s| s.name == name).collect()
    }

    #[test]
    fn test_scalar_leaf_under_section() {
        let flattener = TreeFlattener::default();
        let jvm = node(json!({"uptime_in_millis": 12345.0}));

        let samples = flattener.flatten("jvm", &jvm, &LabelSet::new()).samples;

        assert_eq!(
            samples,
            vec![Sample::new(
                "logstash_jvm_uptime_in_millis",
                LabelSet::new(),
                12345.0
            )]
        );
    }

    #[test]
    fn test_nested_mappings_join_with_underscore() {
        let flattener = TreeFlattener::default();
        let jvm = node(json!({
            "mem": {
                "heap_used_in_bytes": 1024,
                "pools": {"young": {"used_in_bytes": 10, "peak_used_in_bytes": 20}}
            },
            "threads": {"count": 42}
        }));

        let samples = flattener.flatten("jvm", &jvm, &LabelSet::new()).samples;

        assert_eq!(samples.len(), 4);
        assert_eq!(find(&samples, "logstash_jvm_mem_heap_used_in_bytes")[0].value, 1024.0);
        assert_eq!(find(&samples, "logstash_jvm_mem_pools_young_used_in_bytes")[0].value, 10.0);
        assert_eq!(
            find(&samples, "logstash_jvm_mem_pools_young_peak_used_in_bytes")[0].value,
            20.0
        );
        assert_eq!(find(&samples, "logstash_jvm_threads_count")[0].value, 42.0);
    }

    #[test]
    fn test_root_scalar_uses_path_as_name() {
        let flattener = TreeFlattener::default();
        let samples = flattener
            .flatten("events_in", &StatsNode::Number(7.0), &LabelSet::new())
            .samples;
        assert_eq!(samples, vec![Sample::new("logstash_events_in", LabelSet::new(), 7.0)]);
    }

    #[test]
    fn test_timestamp_strings_become_epoch_seconds() {
        let flattener = TreeFlattener::default();
        let reloads = node(json!({
            "last_success_timestamp": "2021-01-01T00:00:00+01:00",
            "last_failure_timestamp": "1970-01-02T00:00:00.250Z"
        }));

        let samples = flattener.flatten("reloads", &reloads, &LabelSet::new()).samples;

        assert_eq!(
            find(&samples, "logstash_reloads_last_success_timestamp")[0].value,
            1_609_455_600.0
        );
        assert_eq!(
            find(&samples, "logstash_reloads_last_failure_timestamp")[0].value,
            86_400.25
        );
    }

    #[test]
    fn test_non_numeric_leaves_are_skipped() {
        let flattener = TreeFlattener::default();
        let tree = node(json!({
            "status": "green",
            "version": "6.2.4",
            "enabled": true,
            "last_error": null,
            "backtrace": ["a", "b"],
            "numbers_in_list": [1, 2, 3],
            "count": 1
        }));

        let samples = flattener.flatten("pipeline_reloads", &tree, &LabelSet::new()).samples;

        assert_eq!(
            samples,
            vec![Sample::new("logstash_pipeline_reloads_count", LabelSet::new(), 1.0)]
        );
    }

    #[test]
    fn test_labels_are_carried_unchanged() {
        let flattener = TreeFlattener::default();
        let base = labels([("pipeline", "main")]);
        let tree = node(json!({"in": 10, "out": {"total": 9}}));

        let samples = flattener.flatten("pipeline_events", &tree, &base).samples;

        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.labels == base));
    }

    #[test]
    fn test_field_collection_scalar_per_field() {
        let flattener = TreeFlattener::default();
        let plugin = node(json!({
            "patterns_per_field": {"message": 1, "path": 3},
            "matches": 5
        }));

        let samples = flattener
            .flatten("pipeline_plugins_filters", &plugin, &LabelSet::new())
            .samples;

        let per_field = find(&samples, "logstash_pipeline_plugins_filters_patterns_per_field");
        assert_eq!(per_field.len(), 2);
        let message = per_field
            .iter()
            .find(|s| s.label(FIELD_LABEL) == Some("message"))
            .expect("message field sample");
        assert_eq!(message.value, 1.0);
        let path = per_field
            .iter()
            .find(|s| s.label(FIELD_LABEL) == Some("path"))
            .expect("path field sample");
        assert_eq!(path.value, 3.0);
        assert_eq!(find(&samples, "logstash_pipeline_plugins_filters_matches").len(), 1);
    }

    #[test]
    fn test_field_collection_mapping_per_field() {
        let flattener = TreeFlattener::default();
        let base = labels([("id", "grok1")]);
        let plugin = node(json!({
            "patterns_per_field": {
                "message": {"count": 2, "failures": 1, "note": "ignored"},
                "empty": {}
            }
        }));

        let samples = flattener.flatten("filter", &plugin, &base).samples;

        assert_eq!(samples.len(), 2);
        let count = find(&samples, "logstash_filter_patterns_per_field_count");
        assert_eq!(count.len(), 1);
        assert_eq!(count[0].label(FIELD_LABEL), Some("message"));
        assert_eq!(count[0].label("id"), Some("grok1"));
        assert_eq!(count[0].value, 2.0);
        assert_eq!(find(&samples, "logstash_filter_patterns_per_field_failures")[0].value, 1.0);
    }

    #[test]
    fn test_field_label_does_not_leak_to_siblings() {
        let flattener = TreeFlattener::default();
        let base = labels([("id", "grok1")]);
        let plugin = node(json!({
            "a_before": 1,
            "patterns_per_field": {"message": 1},
            "z_after": 2
        }));

        let samples = flattener.flatten("filter", &plugin, &base).samples;

        for name in ["logstash_filter_a_before", "logstash_filter_z_after"] {
            let sample = find(&samples, name)[0];
            assert_eq!(sample.labels, base, "{name} must not carry the field label");
        }
    }

    #[test]
    fn test_field_collection_wrong_shape_is_skipped() {
        let flattener = TreeFlattener::default();
        let plugin = node(json!({"patterns_per_field": [1, 2], "matches": 3}));

        let flattened = flattener.flatten("filter", &plugin, &LabelSet::new());

        assert_eq!(flattened.samples.len(), 1);
        assert_eq!(flattened.samples[0].name, "logstash_filter_matches");
        assert_eq!(flattened.errors.len(), 1);
        assert_eq!(flattened.errors[0].kind(), "shape");
        assert!(flattened.errors[0].to_string().contains("filter_patterns_per_field"));
    }

    #[test]
    fn test_depth_guard_fails_closed() {
        let mut tree = StatsNode::Number(1.0);
        for _ in 0..70 {
            tree = StatsNode::Mapping(BTreeMap::from([("n".to_string(), tree)]));
        }

        let shallow = TreeFlattener::default().flatten("deep", &tree, &LabelSet::new());
        assert!(shallow.samples.is_empty());
        assert_eq!(shallow.errors.len(), 1);
        assert_eq!(shallow.errors[0].kind(), "shape");

        let deep = TreeFlattener::default()
            .with_max_depth(128)
            .flatten("deep", &tree, &LabelSet::new());
        assert!(deep.errors.is_empty());
        assert_eq!(deep.samples.len(), 1);
        assert!(deep.samples[0].name.starts_with("logstash_deep_n_n_"));
    }

    #[test]
    fn test_keys_are_sanitized() {
        let flattener = TreeFlattener::default();
        let tree = node(json!({"in-flight.count": 4}));

        let samples = flattener.flatten("events", &tree, &LabelSet::new()).samples;

        assert_eq!(samples[0].name, "logstash_events_in_flight_count");
    }

    #[test]
    fn test_flatten_entries_excludes_keys() {
        let flattener = TreeFlattener::default();
        let plugin = node(json!({"id": "abc", "name": "beats", "events": {"in": 10}}));
        let entries = plugin.as_mapping().unwrap();

        let samples = flattener
            .flatten_entries(
                "pipeline_plugins_inputs",
                entries,
                &["id", "name"],
                &LabelSet::new(),
            )
            .samples;

        assert_eq!(
            samples,
            vec![Sample::new(
                "logstash_pipeline_plugins_inputs_events_in",
                LabelSet::new(),
                10.0
            )]
        );
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let flattener = TreeFlattener::default();
        let tree = node(json!({
            "mem": {"heap": 1, "pools": {"old": {"used": 2}}},
            "gc": {"collectors": {"young": {"collection_count": 3}}}
        }));
        let base = labels([("instance", "localhost:9600")]);

        let first = flattener.flatten("jvm", &tree, &base).samples;
        let second = flattener.flatten("jvm", &tree, &base).samples;

        assert_eq!(first, second);
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric(&StatsNode::Number(1.5)), Some(1.5));
        assert_eq!(coerce_numeric(&StatsNode::Number(f64::NAN)), None);
        assert_eq!(coerce_numeric(&StatsNode::Number(f64::INFINITY)), None);
        assert_eq!(coerce_numeric(&StatsNode::Text("12".to_string())), None);
        assert_eq!(
            coerce_numeric(&StatsNode::Text("1970-01-01T00:01:00Z".to_string())),
            Some(60.0)
        );
        assert_eq!(coerce_numeric(&StatsNode::Bool(true)), None);
        assert_eq!(coerce_numeric(&StatsNode::Null), None);
    }

    #[test]
    fn test_sub_millisecond_timestamps_keep_precision() {
        assert_eq!(
            coerce_numeric(&StatsNode::Text("1970-01-01T00:00:00.0005Z".to_string())),
            Some(0.0005)
        );
        let micros = coerce_numeric(&StatsNode::Text("2018-05-02T10:15:30.123456Z".to_string()))
            .expect("timestamp");
        assert!((micros - 1_525_256_130.123_456).abs() < 1e-6);
    }
}
