//! gRPC service glue for the `qlik.sse.Connector` service.
//!
//! RPC schema source: `proto/sse.proto`.
//!
//! - `GetCapabilities`: static function catalog
//! - `ExecuteFunction` (bidirectional stream): one function per call, selected
//!   by the `qlik-functionrequestheader-bin` metadata entry
//! - `EvaluateScript` (bidirectional stream): not supported

use std::pin::Pin;
use std::time::Instant;

use sse_common::metrics::global_metrics;
use sse_common::{CallId, PluginConfig, SseError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tonic::metadata::MetadataMap;
use tonic::{Code, Request, Response, Status, Streaming};
use tracing::{info, info_span, warn, Instrument};

use crate::catalog;
use crate::dispatch::{self, StrategyOptions};
use crate::header::CallHeader;
use crate::stream::{BundleSource, ChannelSink};
use crate::v1;

pub use v1::connector_client::ConnectorClient;
pub use v1::connector_server::{Connector, ConnectorServer};

type BundleStream = Pin<Box<dyn Stream<Item = Result<v1::BundledRows, Status>> + Send>>;

/// Connector implementation. Holds only read-only options; all per-call state
/// lives in the task spawned for that call.
#[derive(Debug, Clone)]
pub struct PluginService {
    options: StrategyOptions,
}

impl PluginService {
    pub fn new(config: &PluginConfig) -> Self {
        Self {
            options: StrategyOptions::from(config),
        }
    }

    pub fn with_options(options: StrategyOptions) -> Self {
        Self { options }
    }

    pub fn into_server(self) -> ConnectorServer<Self> {
        ConnectorServer::new(self)
    }

    /// Validate the call headers and spawn the call task over `inbound`.
    ///
    /// Header and function-id faults are returned before `inbound` is polled.
    pub fn start_call<S>(
        &self,
        metadata: &MetadataMap,
        mut inbound: S,
    ) -> Result<ReceiverStream<Result<v1::BundledRows, Status>>, Status>
    where
        S: BundleSource + 'static,
    {
        let call_id = CallId::next();
        let header = CallHeader::from_metadata(metadata).map_err(|e| reject(call_id, e))?;
        let function =
            dispatch::select_function(&header, &self.options).map_err(|e| reject(call_id, e))?;
        let name = function.name();

        let span = info_span!(
            "execute_function",
            call_id = %call_id,
            function = name,
            app_id = %header.app_id,
            user_id = %header.user_id,
            cardinality = header.cardinality,
            version = %header.version,
        );
        // Capacity 1: a strategy waits until the previous bundle was taken.
        let (tx, rx) = mpsc::channel(1);
        let mut sink = ChannelSink::new(tx);

        tokio::spawn(
            async move {
                info!("function call started");
                let metrics = global_metrics();
                metrics.call_started(name);
                let started = Instant::now();
                match dispatch::execute(function, &mut inbound, &mut sink).await {
                    Ok(summary) => {
                        let secs = started.elapsed().as_secs_f64();
                        metrics.call_finished(
                            name,
                            summary.rows_in,
                            summary.rows_out,
                            summary.bundles_in,
                            summary.bundles_out,
                            secs,
                        );
                        info!(
                            rows_in = summary.rows_in,
                            rows_out = summary.rows_out,
                            bundles_out = summary.bundles_out,
                            elapsed_ms = (secs * 1000.0) as u64,
                            "function call completed"
                        );
                    }
                    Err(err) => {
                        metrics.call_failed(name, err.kind(), started.elapsed().as_secs_f64());
                        warn!(error = %err, kind = err.kind(), "function call failed");
                        sink.fail(to_status(err)).await;
                    }
                }
            }
            .instrument(span),
        );

        Ok(ReceiverStream::new(rx))
    }
}

#[tonic::async_trait]
impl Connector for PluginService {
    async fn get_capabilities(
        &self,
        _request: Request<v1::Empty>,
    ) -> Result<Response<v1::Capabilities>, Status> {
        global_metrics().inc_capability_requests();
        let caps = catalog::capabilities();
        info!(functions = caps.functions.len(), "capabilities requested");
        Ok(Response::new(caps))
    }

    type ExecuteFunctionStream = BundleStream;

    async fn execute_function(
        &self,
        request: Request<Streaming<v1::BundledRows>>,
    ) -> Result<Response<Self::ExecuteFunctionStream>, Status> {
        let (metadata, _, inbound) = request.into_parts();
        let outbound = self.start_call(&metadata, inbound)?;
        Ok(Response::new(Box::pin(outbound)))
    }

    type EvaluateScriptStream = BundleStream;

    async fn evaluate_script(
        &self,
        _request: Request<Streaming<v1::BundledRows>>,
    ) -> Result<Response<Self::EvaluateScriptStream>, Status> {
        Err(Status::unimplemented("script evaluation is not supported"))
    }
}

fn reject(call_id: CallId, err: SseError) -> Status {
    global_metrics().call_rejected(err.kind());
    warn!(call_id = %call_id, error = %err, "function call rejected");
    to_status(err)
}

/// Map a plugin error to the status returned to the peer.
pub fn to_status(err: SseError) -> Status {
    match err {
        SseError::MalformedHeader { .. } => Status::invalid_argument(err.to_string()),
        SseError::UnknownFunction(_) | SseError::Cancelled(_) => {
            Status::cancelled(err.to_string())
        }
        SseError::RowShape { .. }
        | SseError::CardinalityOverrun { .. }
        | SseError::CardinalityUnderrun { .. } => Status::out_of_range(err.to_string()),
        SseError::Transport(msg) => Status::unavailable(msg),
        SseError::Remote { code, message } => Status::new(Code::from_i32(code), message),
        SseError::InvalidConfig(msg) => Status::invalid_argument(msg),
        SseError::Io(e) => Status::internal(e.to_string()),
    }
}
