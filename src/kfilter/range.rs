use serde::{Deserialize, Serialize};

/// Closed interval `[lower, upper]` over raw values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    lower: f64,
    upper: f64,
}

impl ValueRange {
    /// Degenerate interval holding exactly `v`.
    #[inline]
    pub fn singleton(v: f64) -> Self {
        Self { lower: v, upper: v }
    }

    /// Smallest interval enclosing every value; `None` for an empty input.
    pub fn enclose_all<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut it = values.into_iter();
        let first = Self::singleton(it.next()?);
        Some(it.fold(first, |acc, v| acc.span_value(v)))
    }

    #[inline]
    pub fn lower(&self) -> f64 {
        self.lower
    }
    #[inline]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Zero width: at most one distinct value has been enclosed.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.upper == self.lower
    }

    /// Inclusive on both ends.
    #[inline]
    pub fn contains(&self, v: f64) -> bool {
        self.lower <= v && v <= self.upper
    }

    /// Widen to include `v`. Never shrinks.
    #[inline]
    pub fn span_value(self, v: f64) -> Self {
        Self {
            lower: self.lower.min(v),
            upper: self.upper.max(v),
        }
    }
}
