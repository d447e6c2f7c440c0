pub mod http_server;
pub mod logstash;
pub mod observability;

pub use http_server::MetricsServer;
pub use logstash::LogstashClient;
