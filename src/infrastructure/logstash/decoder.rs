use crate::domain::errors::ScrapeError;
use crate::domain::stats::StatsNode;
use serde_json::Value;

/// Parses a `/_node/stats` body. The document must be a JSON object.
pub fn decode(payload: &[u8]) -> Result<StatsNode, ScrapeError> {
    let value: Value = serde_json::from_slice(payload).map_err(|e| ScrapeError::Decode {
        reason: e.to_string(),
    })?;

    match StatsNode::from(value) {
        node @ StatsNode::Mapping(_) => Ok(node),
        other => Err(ScrapeError::Decode {
            reason: format!("expected a JSON object, found {}", other.kind()),
        }),
    }
}
