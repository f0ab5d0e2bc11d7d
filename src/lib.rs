//! gr-kfilter: streaming k-anonymity for scalar telemetry.
//!
//! Records enter a bounded delay buffer; once the buffer is full the oldest record is
//! published either against a recent cluster that covers it, or as part of a new
//! cluster formed with its `k - 1` nearest buffered neighbors. Every published value
//! is the mean of at least `k` raw values.
//!
//! ```
//! use gr_kfilter::kfilter::{FadsFilter, InputRecord, StreamingKFilter};
//!
//! let mut filter = FadsFilter::new(2, 2, 100).unwrap();
//! for (t, v) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
//!     filter.ingest(InputRecord::new(t as i64, v));
//! }
//! let out = filter.drain_outputs();
//! assert_eq!(out.len(), 4);
//! assert_eq!(out[0].anonymised_value, 1.5);
//! ```

pub mod error;
pub mod kfilter;
pub mod quality;

pub use error::{KfError, KfResult};
pub use quality::QualityReport;
