//! HTTP server exposing the scrape endpoint using Axum

use crate::application::exporter::UP_HELP;
use crate::application::{Exporter, TreeFlattener};
use crate::config::Config;
use crate::domain::stats::Sample;
use crate::infrastructure::logstash::LogstashClient;
use crate::infrastructure::observability::{ExporterMetrics, render_scrape};
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use futures_util::future::join_all;
use std::{future::Future, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

pub const PING_PATH: &str = "/-/ping";

/// Shared state for all HTTP handlers
#[derive(Clone)]
struct ServerState {
    exporters: Arc<Vec<Exporter>>,
    metrics: ExporterMetrics,
    telemetry_path: String,
}

/// HTTP server that scrapes every configured Logstash node on each request
pub struct MetricsServer {
    bind_address: SocketAddr,
    state: ServerState,
}

impl MetricsServer {
    pub fn new(
        bind_address: SocketAddr,
        telemetry_path: impl Into<String>,
        exporters: Vec<Exporter>,
        metrics: ExporterMetrics,
    ) -> Self {
        Self {
            bind_address,
            state: ServerState {
                exporters: Arc::new(exporters),
                metrics,
                telemetry_path: telemetry_path.into(),
            },
        }
    }

    /// Build one client and exporter per configured Logstash host.
    pub fn from_config(config: &Config) -> Result<Self> {
        let metrics = ExporterMetrics::new()?;
        let flattener = TreeFlattener::default().with_max_depth(config.logstash.max_depth);

        let mut exporters = Vec::with_capacity(config.logstash.hosts.len());
        for host in &config.logstash.hosts {
            let client = LogstashClient::new(host, config.logstash.timeout)
                .context(format!("Failed to create client for {}", host))?;
            let mut exporter =
                Exporter::new(host.clone(), Arc::new(client), flattener.clone(), metrics.clone())?;
            if config.instance_label() {
                exporter = exporter.with_instance_label();
            }
            exporters.push(exporter);
        }

        Ok(Self::new(
            config.web.socket_addr()?,
            config.web.telemetry_path.clone(),
            exporters,
            metrics,
        ))
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handle_root))
            .route(PING_PATH, get(handle_ping))
            .route(&self.state.telemetry_path, get(handle_metrics))
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until `shutdown_signal` resolves.
    pub async fn run(self, shutdown_signal: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let listener = TcpListener::bind(self.bind_address).await?;
        self.serve(listener, shutdown_signal).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let address = listener.local_addr()?;
        info!(
            "Metrics available at http://{}{} ({} Logstash node(s))",
            address,
            self.state.telemetry_path,
            self.state.exporters.len()
        );

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal.await;
                info!("Metrics server received shutdown signal, stopping...");
            })
            .await?;

        info!("Metrics server stopped");
        Ok(())
    }
}

async fn handle_root(State(state): State<ServerState>) -> Json<serde_json::Value> {
    let hosts: Vec<&str> = state.exporters.iter().map(|e| e.host()).collect();
    Json(serde_json::json!({
        "service": "Logstash Exporter",
        "version": env!("CARGO_PKG_VERSION"),
        "hosts": hosts,
        "endpoints": {
            "/": "This endpoint - API listing",
            (PING_PATH): "Liveness check",
            (state.telemetry_path.as_str()): "Prometheus metrics"
        }
    }))
}

async fn handle_ping() -> StatusCode {
    StatusCode::OK
}

async fn handle_metrics(State(state): State<ServerState>) -> Response {
    let scrapes = join_all(state.exporters.iter().map(|exporter| exporter.collect())).await;
    let samples: Vec<Sample> = scrapes.into_iter().flatten().collect();
    debug!("Scrape produced {} samples", samples.len());

    let help = state
        .exporters
        .iter()
        .map(|exporter| (exporter.up_name(), UP_HELP));

    match render_scrape(&state.metrics, help, &samples) {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Encoding error: {}", e),
            )
                .into_response()
        }
    }
}
