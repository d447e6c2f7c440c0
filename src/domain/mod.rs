pub mod errors;
pub mod ports;
pub mod stats;

pub use errors::ScrapeError;
pub use stats::{LabelSet, Sample, StatsNode};
