use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SseError};

/// Port used when no TLS material is configured.
pub const DEFAULT_INSECURE_PORT: u16 = 50061;
/// Port used when mutual TLS is enabled.
pub const DEFAULT_SECURE_PORT: u16 = 50062;

/// How the ranking function reacts when the row count disagrees with the
/// declared cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardinalityPolicy {
    /// Extra rows fail the call as soon as they arrive; missing rows fail it at close.
    #[default]
    Strict,
    /// Mismatches are logged and the accumulator grows as needed.
    Lenient,
}

impl fmt::Display for CardinalityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardinalityPolicy::Strict => f.write_str("strict"),
            CardinalityPolicy::Lenient => f.write_str("lenient"),
        }
    }
}

impl FromStr for CardinalityPolicy {
    type Err = SseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CardinalityPolicy::Strict),
            "lenient" => Ok(CardinalityPolicy::Lenient),
            other => Err(SseError::InvalidConfig(format!(
                "unknown cardinality policy '{other}' (expected 'strict' or 'lenient')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    pub bind_host: String,
    pub insecure_port: u16,
    pub secure_port: u16,
    /// Directory holding `sse_server_key.pem`, `sse_server_cert.pem` and
    /// `root_cert.pem`. When set the server requires client certificates.
    pub pem_dir: Option<PathBuf>,
    pub cardinality_policy: CardinalityPolicy,
    /// Upper bound on rows preallocated from a declared cardinality.
    pub ranking_prealloc_limit: usize,
    pub metrics_bind: Option<SocketAddr>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            insecure_port: DEFAULT_INSECURE_PORT,
            secure_port: DEFAULT_SECURE_PORT,
            pem_dir: None,
            cardinality_policy: CardinalityPolicy::Strict,
            ranking_prealloc_limit: 1024 * 1024,
            metrics_bind: None,
        }
    }
}

impl PluginConfig {
    pub fn is_secure(&self) -> bool {
        self.pem_dir.is_some()
    }

    /// Listen address for the active mode: secure port with TLS, insecure port otherwise.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let port = if self.is_secure() {
            self.secure_port
        } else {
            self.insecure_port
        };
        format!("{}:{port}", self.bind_host).parse().map_err(|e| {
            SseError::InvalidConfig(format!("invalid bind host '{}': {e}", self.bind_host))
        })
    }
}
