pub mod cluster;
pub mod config;
pub mod filter;
pub mod frontends;
pub mod neighbors;
pub mod range;
pub mod records;
pub mod test_helpers;

mod fads;
mod metrics;

// Public surface
pub use cluster::Cluster;
pub use config::{FilterConfig, FlushPolicy};
pub use fads::{FadsFilter, FadsFilterBuilder};
pub use filter::{run_stream, StreamingKFilter};
pub use metrics::FilterMetrics;
pub use range::ValueRange;
pub use records::{InputRecord, OutputRecord};
