use sse_common::Result;

use super::RowFunction;
use crate::bundle::{chunk_rows, numeric_row};
use crate::v1;

/// Row-wise streaming sum: one output row per input row, no cross-bundle state.
#[derive(Debug, Default)]
pub struct SumOfRows;

impl RowFunction for SumOfRows {
    fn name(&self) -> &'static str {
        "SumOfRows"
    }

    fn consume(&mut self, bundle: v1::BundledRows) -> Result<Vec<v1::BundledRows>> {
        let sums = bundle
            .rows
            .iter()
            .map(|row| numeric_row(row.duals.iter().map(|d| d.num_data).sum()));
        Ok(chunk_rows(sums))
    }

    fn finish(self: Box<Self>) -> Result<Vec<v1::BundledRows>> {
        Ok(Vec::new())
    }
}
