use thiserror::Error;

/// Errors that can occur during one scrape of a Logstash instance.
///
/// None of them is fatal: they are logged, counted, and the next scrape starts clean.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Failed to reach {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("Unexpected HTTP status {status} from {endpoint}")]
    Protocol { endpoint: String, status: u16 },

    #[error("Failed to decode node stats: {reason}")]
    Decode { reason: String },

    #[error("Unexpected shape at {path}: expected {expected}, found {found}")]
    Shape {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl ScrapeError {
    /// Value of the `kind` label on the scrape error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Connection { .. } => "connection",
            ScrapeError::Protocol { .. } => "protocol",
            ScrapeError::Decode { .. } => "decode",
            ScrapeError::Shape { .. } => "shape",
        }
    }

    /// Whether the upstream should be reported as down for this error.
    pub fn marks_down(&self) -> bool {
        matches!(
            self,
            ScrapeError::Connection { .. } | ScrapeError::Protocol { .. }
        )
    }

    pub fn shape(path: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        ScrapeError::Shape {
            path: path.into(),
            expected,
            found,
        }
    }
}
