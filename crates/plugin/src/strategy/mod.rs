//! Per-function execution strategies.
//!
//! Each call gets a fresh [`RowFunction`] holding only call-local state.
//! Strategies are synchronous: the dispatcher owns the stream and hands them
//! one inbound bundle at a time, writing whatever they return.

mod sum_of_column;
mod sum_of_rows;
mod two_norm_ranking;

pub use sum_of_column::SumOfColumn;
pub use sum_of_rows::SumOfRows;
pub use two_norm_ranking::TwoNormRanking;

use sse_common::Result;

use crate::v1;

pub trait RowFunction: Send {
    /// Catalog name, used for logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Fold one inbound bundle. Returned bundles are written immediately, in order.
    fn consume(&mut self, bundle: v1::BundledRows) -> Result<Vec<v1::BundledRows>>;

    /// Called once after the peer half-closed. Returned bundles are written in order.
    fn finish(self: Box<Self>) -> Result<Vec<v1::BundledRows>>;
}
