//! Typed identifiers for per-call log correlation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identifier of one streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(
    /// Raw numeric id value.
    pub u64,
);

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

impl CallId {
    /// Allocate the next id. Ids are unique for the lifetime of the process.
    pub fn next() -> Self {
        Self(NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
