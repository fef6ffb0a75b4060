use sse_common::{CardinalityPolicy, Result, SseError};
use tracing::{debug, warn};

use super::RowFunction;
use crate::bundle::{chunk_rows, numeric_at, numeric_row};
use crate::v1;

/// Whole-stream ranking by the two-norm of the first two columns.
///
/// Buffers one norm per inbound row, indexed by arrival order. After the
/// stream closes it emits the arrival indices sorted by ascending norm; equal
/// norms keep arrival order. The declared cardinality only sizes the initial
/// allocation (capped by `prealloc_limit`) and, under
/// [`CardinalityPolicy::Strict`], is checked against the actual row count.
/// A declared cardinality of 0 means the client did not declare one.
#[derive(Debug)]
pub struct TwoNormRanking {
    norms: Vec<f64>,
    declared: u64,
    policy: CardinalityPolicy,
    overrun_logged: bool,
}

impl TwoNormRanking {
    pub fn new(declared: u64, policy: CardinalityPolicy, prealloc_limit: usize) -> Self {
        let capacity = usize::try_from(declared)
            .unwrap_or(usize::MAX)
            .min(prealloc_limit);
        Self {
            norms: Vec::with_capacity(capacity),
            declared,
            policy,
            overrun_logged: false,
        }
    }

    fn check_overrun(&mut self) -> Result<()> {
        let received = self.norms.len() as u64 + 1;
        if self.declared == 0 || received <= self.declared {
            return Ok(());
        }
        match self.policy {
            CardinalityPolicy::Strict => Err(SseError::CardinalityOverrun {
                declared: self.declared,
                received,
            }),
            CardinalityPolicy::Lenient => {
                if !self.overrun_logged {
                    warn!(
                        declared = self.declared,
                        received, "more rows than declared cardinality; growing buffer"
                    );
                    self.overrun_logged = true;
                }
                Ok(())
            }
        }
    }
}

impl RowFunction for TwoNormRanking {
    fn name(&self) -> &'static str {
        "TwoNormRanking"
    }

    fn consume(&mut self, bundle: v1::BundledRows) -> Result<Vec<v1::BundledRows>> {
        for row in &bundle.rows {
            self.check_overrun()?;
            let index = self.norms.len() as u64;
            let x = numeric_at(row, 0, index, self.name())?;
            let y = numeric_at(row, 1, index, self.name())?;
            self.norms.push(two_norm(x, y));
        }
        Ok(Vec::new())
    }

    fn finish(self: Box<Self>) -> Result<Vec<v1::BundledRows>> {
        let received = self.norms.len() as u64;
        if self.declared != 0 && received < self.declared {
            match self.policy {
                CardinalityPolicy::Strict => {
                    return Err(SseError::CardinalityUnderrun {
                        declared: self.declared,
                        received,
                    })
                }
                CardinalityPolicy::Lenient => warn!(
                    declared = self.declared,
                    received, "fewer rows than declared cardinality; ranking what arrived"
                ),
            }
        }

        let order = rank_ascending(&self.norms);
        debug!(rows = order.len(), "two-norm ranking sorted");
        Ok(chunk_rows(order.into_iter().map(|i| numeric_row(i as f64))))
    }
}

/// Euclidean norm of `(x, y)`. Every NaN is stored as the positive quiet NaN
/// so it orders after all numbers under `total_cmp`.
fn two_norm(x: f64, y: f64) -> f64 {
    let norm = (x * x + y * y).sqrt();
    if norm.is_nan() {
        f64::NAN
    } else {
        norm
    }
}

/// Indices of `values` ordered by ascending value; ties keep index order.
fn rank_ascending(values: &[f64]) -> Vec<usize> {
    let mut idx = (0..values.len()).collect::<Vec<_>>();
    // sort_by is stable, so equal norms stay in arrival order.
    idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    idx
}
