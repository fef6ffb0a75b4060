//! HTTP scrape endpoint for the plugin's prometheus registry.

use std::io;
use std::net::SocketAddr;

use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use crate::metrics::global_metrics;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Bind `addr` and serve `GET /metrics` until the listener fails.
pub async fn run_metrics_exporter(addr: SocketAddr) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router())
        .await
        .map_err(|e| io::Error::other(format!("metrics exporter on {addr}: {e}")))
}

fn router() -> Router {
    Router::new().route("/metrics", get(scrape))
}

async fn scrape() -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_TEXT)], global_metrics().render_prometheus())
}
