//! Analytics plugin server for the bidirectional row-bundle protocol.
//!
//! A client opens an `ExecuteFunction` stream, attaches a function id and a
//! row cardinality as binary call metadata, and streams [`v1::BundledRows`].
//! The server runs exactly one function per call and streams results back.
//!
//! Key modules:
//! - [`bundle`]: bundle size bound and row/bundle helpers
//! - [`header`]: call-metadata header decoding
//! - [`catalog`]: static capability table
//! - [`dispatch`]: function selection and the per-call read loop
//! - [`strategy`]: the three function implementations
//! - [`grpc`]: tonic service glue
//! - [`client`]: typed client that attaches call headers

pub mod bundle;
pub mod catalog;
pub mod client;
pub mod dispatch;
pub mod grpc;
pub mod header;
pub mod strategy;
pub mod stream;
pub mod tls;

#[allow(missing_docs)]
pub mod v1 {
    tonic::include_proto!("qlik.sse");
}

pub use catalog::{capabilities, FunctionDescriptor, FUNCTIONS};
pub use client::PluginClient;
pub use dispatch::{execute, select_function, CallSummary, FunctionId, StrategyOptions};
pub use header::CallHeader;
