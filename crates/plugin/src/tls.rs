//! Mutual-TLS material loading for the secure listener.

use std::path::{Path, PathBuf};

use sse_common::{Result, SseError};
use tonic::transport::{Certificate, Identity, ServerTlsConfig};

pub const SERVER_KEY_FILE: &str = "sse_server_key.pem";
pub const SERVER_CERT_FILE: &str = "sse_server_cert.pem";
pub const ROOT_CERT_FILE: &str = "root_cert.pem";

/// PEM material read from a TLS directory.
#[derive(Debug, Clone)]
pub struct TlsMaterial {
    pub key: Vec<u8>,
    pub cert_chain: Vec<u8>,
    pub root_cert: Vec<u8>,
}

impl TlsMaterial {
    /// Read the server key, certificate chain and client root from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            key: read_pem(dir.join(SERVER_KEY_FILE))?,
            cert_chain: read_pem(dir.join(SERVER_CERT_FILE))?,
            root_cert: read_pem(dir.join(ROOT_CERT_FILE))?,
        })
    }

    /// Server config that presents the chain and requires a client certificate
    /// signed by the root.
    pub fn server_config(&self) -> ServerTlsConfig {
        ServerTlsConfig::new()
            .identity(Identity::from_pem(&self.cert_chain, &self.key))
            .client_ca_root(Certificate::from_pem(&self.root_cert))
            .client_auth_optional(false)
    }
}

fn read_pem(path: PathBuf) -> Result<Vec<u8>> {
    let bytes = std::fs::read(&path).map_err(|e| {
        SseError::InvalidConfig(format!("cannot read TLS file '{}': {e}", path.display()))
    })?;
    if bytes.is_empty() {
        return Err(SseError::InvalidConfig(format!(
            "TLS file '{}' is empty",
            path.display()
        )));
    }
    Ok(bytes)
}
