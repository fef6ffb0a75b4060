//! Function selection and the per-call read loop.

use std::fmt;

use sse_common::{CardinalityPolicy, PluginConfig, Result, SseError};
use tracing::debug;

use crate::header::CallHeader;
use crate::stream::{BundleSink, BundleSource};
use crate::strategy::{RowFunction, SumOfColumn, SumOfRows, TwoNormRanking};

/// Functions this plugin executes. Wire ids match the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionId {
    SumOfRows = 0,
    SumOfColumn = 1,
    TwoNormRanking = 2,
}

impl FunctionId {
    pub const ALL: [FunctionId; 3] = [
        FunctionId::SumOfRows,
        FunctionId::SumOfColumn,
        FunctionId::TwoNormRanking,
    ];

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            FunctionId::SumOfRows => "SumOfRows",
            FunctionId::SumOfColumn => "SumOfColumn",
            FunctionId::TwoNormRanking => "TwoNormRanking",
        }
    }
}

impl TryFrom<i32> for FunctionId {
    type Error = SseError;

    fn try_from(id: i32) -> Result<Self> {
        match id {
            0 => Ok(FunctionId::SumOfRows),
            1 => Ok(FunctionId::SumOfColumn),
            2 => Ok(FunctionId::TwoNormRanking),
            other => Err(SseError::UnknownFunction(other)),
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only knobs handed to strategies at construction.
#[derive(Debug, Clone, Copy)]
pub struct StrategyOptions {
    pub cardinality_policy: CardinalityPolicy,
    pub ranking_prealloc_limit: usize,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self::from(&PluginConfig::default())
    }
}

impl From<&PluginConfig> for StrategyOptions {
    fn from(cfg: &PluginConfig) -> Self {
        Self {
            cardinality_policy: cfg.cardinality_policy,
            ranking_prealloc_limit: cfg.ranking_prealloc_limit,
        }
    }
}

/// Build a fresh strategy for this call. Unknown ids fail before any read.
pub fn select_function(
    header: &CallHeader,
    options: &StrategyOptions,
) -> Result<Box<dyn RowFunction>> {
    let function = FunctionId::try_from(header.function_id)?;
    Ok(match function {
        FunctionId::SumOfRows => Box::new(SumOfRows),
        FunctionId::SumOfColumn => Box::new(SumOfColumn::default()),
        FunctionId::TwoNormRanking => Box::new(TwoNormRanking::new(
            header.cardinality,
            options.cardinality_policy,
            options.ranking_prealloc_limit,
        )),
    })
}

/// Row and bundle counts of one completed call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallSummary {
    pub rows_in: u64,
    pub rows_out: u64,
    pub bundles_in: u64,
    pub bundles_out: u64,
}

/// Drive `function` until the peer half-closes, then flush its final output.
///
/// Any error ends the call; nothing is retried and accumulated state is dropped.
pub async fn execute<S, K>(
    mut function: Box<dyn RowFunction>,
    source: &mut S,
    sink: &mut K,
) -> Result<CallSummary>
where
    S: BundleSource + ?Sized,
    K: BundleSink + ?Sized,
{
    let mut summary = CallSummary::default();
    while let Some(bundle) = source.next_bundle().await? {
        summary.bundles_in += 1;
        summary.rows_in += bundle.rows.len() as u64;
        for out in function.consume(bundle)? {
            write(sink, out, &mut summary).await?;
        }
    }
    debug!(
        function = function.name(),
        rows_in = summary.rows_in,
        bundles_in = summary.bundles_in,
        "inbound stream closed"
    );
    for out in function.finish()? {
        write(sink, out, &mut summary).await?;
    }
    Ok(summary)
}

async fn write<K>(
    sink: &mut K,
    bundle: crate::v1::BundledRows,
    summary: &mut CallSummary,
) -> Result<()>
where
    K: BundleSink + ?Sized,
{
    summary.bundles_out += 1;
    summary.rows_out += bundle.rows.len() as u64;
    sink.send_bundle(bundle).await
}
