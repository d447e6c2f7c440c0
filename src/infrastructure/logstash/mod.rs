pub mod client;
pub mod decoder;

pub use client::{LogstashClient, NODE_STATS_PATH, node_stats_url};
pub use decoder::decode;
