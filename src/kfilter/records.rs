use serde::{Deserialize, Serialize};
use std::fmt;

/// One incoming measurement.
///
/// `time` is the arrival tick of the record (seconds from stream start in the usual
/// deployment); callers feed records in non-decreasing `time` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub time: i64,
    #[serde(rename = "value", alias = "raw_value")]
    pub raw_value: f64,
}

impl InputRecord {
    #[inline]
    pub fn new(time: i64, raw_value: f64) -> Self {
        Self { time, raw_value }
    }
}

impl fmt::Display for InputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.time, self.raw_value)
    }
}

/// A published record: the raw input paired with the anonymised value it was released as.
///
/// Invariant: `output_time >= input_time` for streams fed in time order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Tick at which the record entered the filter.
    pub input_time: i64,
    /// Tick at which the record was released.
    pub output_time: i64,
    pub raw_value: f64,
    pub anonymised_value: f64,
}

impl OutputRecord {
    #[inline]
    pub(crate) fn released(input: &InputRecord, output_time: i64, anonymised_value: f64) -> Self {
        Self {
            input_time: input.time,
            output_time,
            raw_value: input.raw_value,
            anonymised_value,
        }
    }

    /// Ticks spent between arrival and release.
    #[inline]
    pub fn latency(&self) -> i64 {
        self.output_time - self.input_time
    }
}

impl fmt::Display for OutputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.input_time, self.output_time, self.raw_value, self.anonymised_value
        )
    }
}
