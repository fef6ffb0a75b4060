//! Shared configuration, error types, IDs, and observability primitives for the SSE plugin crates.
//!
//! Architecture role:
//! - defines the process configuration handed to the server at startup
//! - provides the common [`SseError`] / [`Result`] contracts
//! - hosts metrics and the optional exporter
//!
//! Key modules:
//! - [`config`]
//! - [`error`]
//! - [`ids`]
//! - [`metrics`]
//! - `metrics_exporter` (feature-gated)
//!
//! Feature flags:
//! - `profiling`: enables the metrics HTTP exporter helpers.

pub mod config;
pub mod error;
pub mod ids;
pub mod metrics;
#[cfg(feature = "profiling")]
pub mod metrics_exporter;

pub use config::{CardinalityPolicy, PluginConfig, DEFAULT_INSECURE_PORT, DEFAULT_SECURE_PORT};
pub use error::{Result, SseError};
pub use ids::CallId;
pub use metrics::MetricsRegistry;
#[cfg(feature = "profiling")]
pub use metrics_exporter::run_metrics_exporter;
