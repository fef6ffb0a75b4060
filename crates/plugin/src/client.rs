//! Typed client for the connector service.
//!
//! Attaches the binary call headers and collects the response stream, so
//! callers deal in bundles and [`SseError`] instead of raw metadata and
//! tonic statuses.

use futures::TryStreamExt;
use sse_common::{Result, SseError};
use tonic::transport::Channel;
use tonic::{Code, Request, Status};

use crate::grpc::ConnectorClient;
use crate::header::CallHeader;
use crate::v1;

#[derive(Debug, Clone)]
pub struct PluginClient {
    inner: ConnectorClient<Channel>,
}

impl PluginClient {
    /// Connect to an endpoint such as `http://127.0.0.1:50061`.
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let inner = ConnectorClient::connect(endpoint.to_string())
            .await
            .map_err(|e| SseError::Transport(format!("connect {endpoint}: {e}")))?;
        Ok(Self { inner })
    }

    pub async fn capabilities(&mut self) -> Result<v1::Capabilities> {
        let response = self
            .inner
            .get_capabilities(v1::Empty {})
            .await
            .map_err(map_tonic_err)?;
        Ok(response.into_inner())
    }

    /// Send `bundles` under `header`, half-close, and collect every response bundle.
    pub async fn execute(
        &mut self,
        header: &CallHeader,
        bundles: Vec<v1::BundledRows>,
    ) -> Result<Vec<v1::BundledRows>> {
        let mut request = Request::new(tokio_stream::iter(bundles));
        header.write_to(request.metadata_mut());
        self.inner
            .execute_function(request)
            .await
            .map_err(map_tonic_err)?
            .into_inner()
            .try_collect()
            .await
            .map_err(map_tonic_err)
    }
}

/// Fold a status received from the server back into the error taxonomy.
///
/// Cancellation and unreachable-server statuses keep their own variants; every
/// other status is returned as [`SseError::Remote`] with its code intact.
pub fn map_tonic_err(status: Status) -> SseError {
    match status.code() {
        Code::Cancelled => SseError::Cancelled(status.message().to_string()),
        Code::Unavailable => SseError::Transport(status.message().to_string()),
        code => SseError::Remote {
            code: code as i32,
            message: status.message().to_string(),
        },
    }
}
