use serde::{Deserialize, Serialize};

use crate::{KfError, KfResult};

/// Parameters from the FADS paper.
pub const DEFAULT_K: usize = 100;
pub const DEFAULT_DELAY_CONSTRAINT: usize = 2000;
pub const DEFAULT_REUSE_CONSTRAINT: i64 = 200;

/// What [`FadsFilter::flush`](crate::kfilter::FadsFilter::flush) does with records
/// still waiting in the buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")] // "drop" | "publish"
pub enum FlushPolicy {
    /// Discard buffered records. Nothing below k-anonymity is ever published.
    #[default]
    Drop,
    /// Publish everything. Groups of `>= k` are formed while possible; the final
    /// remainder is released as one smaller group, breaking strict k-anonymity.
    Publish,
}

/// Construction parameters for the FADS filter.
///
/// - `k`: anonymity set size, `> 1`. Every published value stands for `>= k` records.
/// - `delay_constraint`: buffer size at which the oldest record must be published,
///   `>= k`.
/// - `reuse_constraint`: maximum cluster age (in ticks) for reuse. Not range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub k: usize,
    pub delay_constraint: usize,
    pub reuse_constraint: i64,
    pub flush_policy: FlushPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            delay_constraint: DEFAULT_DELAY_CONSTRAINT,
            reuse_constraint: DEFAULT_REUSE_CONSTRAINT,
            flush_policy: FlushPolicy::Drop,
        }
    }
}

impl FilterConfig {
    pub fn new(k: usize, delay_constraint: usize, reuse_constraint: i64) -> Self {
        Self {
            k,
            delay_constraint,
            reuse_constraint,
            ..Self::default()
        }
    }

    /// Reject `k <= 1` and `delay_constraint < k`.
    pub fn validate(&self) -> KfResult<()> {
        if self.k <= 1 {
            return Err(KfError::InvalidConfig {
                what: "k must be greater than 1",
            });
        }
        if self.delay_constraint < self.k {
            return Err(KfError::InvalidConfig {
                what: "delay constraint must be greater than or equal to k",
            });
        }
        Ok(())
    }

    /// Parse a JSON document; absent fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
