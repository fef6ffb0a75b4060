use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use sse_common::{CardinalityPolicy, PluginConfig, SseError};
use sse_plugin::grpc::PluginService;
use sse_plugin::tls::TlsMaterial;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed_or_default<T>(key: &str, default: T) -> Result<T, SseError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| SseError::InvalidConfig(format!("{key}={raw}: {e}"))),
        Err(_) => Ok(default),
    }
}

fn load_config() -> Result<PluginConfig, SseError> {
    let defaults = PluginConfig::default();
    let pem_dir = env::var("SSE_PEM_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let metrics_bind = match env::var("SSE_METRICS_BIND") {
        Ok(raw) => Some(raw.parse::<SocketAddr>().map_err(|e| {
            SseError::InvalidConfig(format!("SSE_METRICS_BIND={raw}: {e}"))
        })?),
        Err(_) => None,
    };
    Ok(PluginConfig {
        bind_host: env_or_default("SSE_BIND_HOST", &defaults.bind_host),
        insecure_port: env_parsed_or_default("SSE_INSECURE_PORT", defaults.insecure_port)?,
        secure_port: env_parsed_or_default("SSE_SECURE_PORT", defaults.secure_port)?,
        pem_dir,
        cardinality_policy: env_parsed_or_default::<CardinalityPolicy>(
            "SSE_CARDINALITY_POLICY",
            defaults.cardinality_policy,
        )?,
        ranking_prealloc_limit: env_parsed_or_default(
            "SSE_RANKING_PREALLOC_LIMIT",
            defaults.ranking_prealloc_limit,
        )?,
        metrics_bind,
    })
}

#[cfg(feature = "profiling")]
fn spawn_metrics_exporter(config: &PluginConfig) {
    if let Some(addr) = config.metrics_bind {
        info!(%addr, "metrics exporter listening");
        tokio::spawn(async move {
            if let Err(e) = sse_common::run_metrics_exporter(addr).await {
                tracing::error!(error = %e, "metrics exporter stopped");
            }
        });
    }
}

#[cfg(not(feature = "profiling"))]
fn spawn_metrics_exporter(config: &PluginConfig) {
    if config.metrics_bind.is_some() {
        tracing::warn!("SSE_METRICS_BIND set but the 'profiling' feature is disabled");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let config = load_config()?;
    let addr = config.listen_addr()?;
    spawn_metrics_exporter(&config);

    let mut builder = Server::builder();
    match &config.pem_dir {
        Some(dir) => {
            let material = TlsMaterial::load(dir)?;
            builder = builder.tls_config(material.server_config())?;
            info!(%addr, pem_dir = %dir.display(), "secure server listening (mutual TLS)");
        }
        None => info!(%addr, "insecure server listening"),
    }
    info!(
        version = sse_plugin::catalog::PLUGIN_VERSION,
        cardinality_policy = %config.cardinality_policy,
        ranking_prealloc_limit = config.ranking_prealloc_limit,
        "sse-plugin-server started"
    );

    builder
        .add_service(PluginService::new(&config).into_server())
        .serve(addr)
        .await?;

    Ok(())
}
