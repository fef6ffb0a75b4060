//! Row-bundle wire shape helpers.
//!
//! [`v1::BundledRows`] is the unit of framing in both directions. Outbound
//! bundles never exceed [`MAX_BUNDLE_SIZE`] rows; the bound keeps single
//! messages within transport limits and says nothing about the data.

use sse_common::{Result, SseError};

use crate::v1;

/// Maximum rows per outbound bundle.
pub const MAX_BUNDLE_SIZE: usize = 64 * 1024;

/// Single-dual numeric row.
pub fn numeric_row(value: f64) -> v1::Row {
    v1::Row {
        duals: vec![v1::Dual {
            num_data: value,
            str_data: String::new(),
        }],
    }
}

/// Bundle of numeric rows, one dual per value per row.
pub fn numeric_bundle<I, R>(rows: I) -> v1::BundledRows
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = f64>,
{
    v1::BundledRows {
        rows: rows
            .into_iter()
            .map(|values| v1::Row {
                duals: values
                    .into_iter()
                    .map(|num_data| v1::Dual {
                        num_data,
                        str_data: String::new(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Numeric value of column `col`, or a row-shape fault naming `function`.
pub fn numeric_at(
    row: &v1::Row,
    col: usize,
    row_index: u64,
    function: &'static str,
) -> Result<f64> {
    row.duals
        .get(col)
        .map(|d| d.num_data)
        .ok_or(SseError::RowShape {
            function,
            row: row_index,
            required: col + 1,
            actual: row.duals.len(),
        })
}

/// Split rows into bundles of at most [`MAX_BUNDLE_SIZE`] rows, preserving order.
pub fn chunk_rows<I>(rows: I) -> Vec<v1::BundledRows>
where
    I: IntoIterator<Item = v1::Row>,
{
    chunk_rows_with_limit(rows, MAX_BUNDLE_SIZE)
}

/// [`chunk_rows`] with an explicit bound. An empty input yields no bundles.
pub fn chunk_rows_with_limit<I>(rows: I, limit: usize) -> Vec<v1::BundledRows>
where
    I: IntoIterator<Item = v1::Row>,
{
    let limit = limit.max(1);
    let mut out = Vec::new();
    let mut current = Vec::new();
    for row in rows {
        current.push(row);
        if current.len() == limit {
            out.push(v1::BundledRows {
                rows: std::mem::take(&mut current),
            });
        }
    }
    if !current.is_empty() {
        out.push(v1::BundledRows { rows: current });
    }
    out
}

/// First dual of every row, across bundles. Rows without duals are skipped.
pub fn first_column(bundles: &[v1::BundledRows]) -> Vec<f64> {
    bundles
        .iter()
        .flat_map(|b| b.rows.iter())
        .filter_map(|r| r.duals.first().map(|d| d.num_data))
        .collect()
}
