use sse_common::Result;

use super::RowFunction;
use crate::bundle::{numeric_at, numeric_row};
use crate::v1;

/// Whole-stream aggregation of the first column. Emits one row after close.
#[derive(Debug, Default)]
pub struct SumOfColumn {
    total: f64,
    rows_seen: u64,
}

impl RowFunction for SumOfColumn {
    fn name(&self) -> &'static str {
        "SumOfColumn"
    }

    fn consume(&mut self, bundle: v1::BundledRows) -> Result<Vec<v1::BundledRows>> {
        for row in &bundle.rows {
            self.total += numeric_at(row, 0, self.rows_seen, self.name())?;
            self.rows_seen += 1;
        }
        Ok(Vec::new())
    }

    fn finish(self: Box<Self>) -> Result<Vec<v1::BundledRows>> {
        Ok(vec![v1::BundledRows {
            rows: vec![numeric_row(self.total)],
        }])
    }
}
