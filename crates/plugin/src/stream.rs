//! Inbound and outbound halves of an open call.
//!
//! Strategies never touch tonic types directly; the dispatcher drives them
//! through [`BundleSource`] and [`BundleSink`].

use tokio::sync::mpsc;
use tonic::{async_trait, Status, Streaming};

use sse_common::{Result, SseError};

use crate::v1;

/// Inbound side. `Ok(None)` means the peer half-closed.
#[async_trait]
pub trait BundleSource: Send {
    async fn next_bundle(&mut self) -> Result<Option<v1::BundledRows>>;
}

/// Outbound side. Returns once the transport has accepted the bundle.
#[async_trait]
pub trait BundleSink: Send {
    async fn send_bundle(&mut self, bundle: v1::BundledRows) -> Result<()>;
}

#[async_trait]
impl BundleSource for Streaming<v1::BundledRows> {
    async fn next_bundle(&mut self) -> Result<Option<v1::BundledRows>> {
        self.message().await.map_err(inbound_err)
    }
}

/// Classify a failure of the inbound half of a call.
fn inbound_err(status: Status) -> SseError {
    match status.code() {
        tonic::Code::Cancelled => SseError::Cancelled(status.message().to_string()),
        code => SseError::Transport(format!("{code:?}: {}", status.message())),
    }
}

/// Outbound half backed by the channel that feeds the response stream.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<std::result::Result<v1::BundledRows, Status>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<std::result::Result<v1::BundledRows, Status>>) -> Self {
        Self { tx }
    }

    /// Deliver a terminal error to the peer. Ignored if the peer is gone.
    pub async fn fail(&self, status: Status) {
        let _ = self.tx.send(Err(status)).await;
    }
}

#[async_trait]
impl BundleSink for ChannelSink {
    async fn send_bundle(&mut self, bundle: v1::BundledRows) -> Result<()> {
        self.tx
            .send(Ok(bundle))
            .await
            .map_err(|_| SseError::Cancelled("response stream dropped by peer".to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_status_maps_to_cancelled() {
        let err = inbound_err(Status::cancelled("client went away"));
        assert!(matches!(err, SseError::Cancelled(ref m) if m == "client went away"));
        let err = inbound_err(Status::unavailable("reset"));
        assert!(matches!(err, SseError::Transport(ref m) if m.starts_with("Unavailable")));
    }

    #[tokio::test]
    async fn channel_sink_reports_dropped_receiver() {
        let (tx, rx) = mpsc::channel(1);
        let mut sink = ChannelSink::new(tx);
        drop(rx);
        let err = sink
            .send_bundle(v1::BundledRows::default())
            .await
            .expect_err("receiver gone");
        assert!(matches!(err, SseError::Cancelled(_)));
    }

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut sink = ChannelSink::new(tx);
        for n in 1..=2 {
            sink.send_bundle(crate::bundle::numeric_bundle([vec![n as f64]]))
                .await
                .expect("send");
        }
        sink.fail(Status::out_of_range("boom")).await;
        let first = rx.recv().await.expect("first").expect("ok");
        assert_eq!(first.rows[0].duals[0].num_data, 1.0);
        let second = rx.recv().await.expect("second").expect("ok");
        assert_eq!(second.rows[0].duals[0].num_data, 2.0);
        let status = rx.recv().await.expect("third").expect_err("err");
        assert_eq!(status.code(), tonic::Code::OutOfRange);
    }
}
