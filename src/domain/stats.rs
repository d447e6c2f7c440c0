//! Decoded Logstash statistics and the flat samples produced from them.

use serde_json::Value;
use std::collections::BTreeMap;

/// Label name -> label value. Sorted, so enumeration order is stable for a given shape.
pub type LabelSet = BTreeMap<String, String>;

/// One node of the `/_node/stats` document.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsNode {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<StatsNode>),
    Mapping(BTreeMap<String, StatsNode>),
}

impl StatsNode {
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, StatsNode>> {
        match self {
            StatsNode::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StatsNode]> {
        match self {
            StatsNode::List(items) => Some(items),
            _ => None,
        }
    }

    /// Child lookup; `None` for anything that is not a mapping.
    pub fn get(&self, key: &str) -> Option<&StatsNode> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Short name of the variant, used in shape error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            StatsNode::Null => "null",
            StatsNode::Bool(_) => "bool",
            StatsNode::Number(_) => "number",
            StatsNode::Text(_) => "string",
            StatsNode::List(_) => "list",
            StatsNode::Mapping(_) => "mapping",
        }
    }
}

impl From<Value> for StatsNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => StatsNode::Null,
            Value::Bool(b) => StatsNode::Bool(b),
            // Every JSON number fits an f64, possibly with precision loss on huge integers
            Value::Number(n) => n.as_f64().map_or(StatsNode::Null, StatsNode::Number),
            Value::String(s) => StatsNode::Text(s),
            Value::Array(items) => StatsNode::List(items.into_iter().map(StatsNode::from).collect()),
            Value::Object(map) => StatsNode::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, StatsNode::from(v)))
                    .collect(),
            ),
        }
    }
}

/// A single exported measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: LabelSet,
    pub value: f64,
}

impl Sample {
    pub fn new(name: impl Into<String>, labels: LabelSet, value: f64) -> Self {
        Self {
            name: name.into(),
            labels,
            value,
        }
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

/// Replaces every character that is not valid in a metric name with `_`.
///
/// Applied to source-derived path segments (mapping keys, host names), never to label values.
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Builds a [`LabelSet`] from string pairs.
pub fn labels<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> LabelSet {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
