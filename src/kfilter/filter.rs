use crate::kfilter::records::{InputRecord, OutputRecord};

/// A streaming anonymizer: raw records go in one at a time, anonymised records come
/// out in batches whenever the strategy is ready to release them.
///
/// Implementations are single-owner and synchronous. Neither call blocks.
pub trait StreamingKFilter {
    /// Accept a new raw record. Its anonymised version is released later through
    /// [`drain_outputs`](Self::drain_outputs).
    fn ingest(&mut self, record: InputRecord);

    /// Take every record ready for release, in emission order. Empty when nothing
    /// is ready.
    fn drain_outputs(&mut self) -> Vec<OutputRecord>;
}

impl<F: StreamingKFilter + ?Sized> StreamingKFilter for Box<F> {
    fn ingest(&mut self, record: InputRecord) {
        (**self).ingest(record)
    }
    fn drain_outputs(&mut self) -> Vec<OutputRecord> {
        (**self).drain_outputs()
    }
}

/// Feed every record through `filter`, draining after each one.
pub fn run_stream<F, I>(filter: &mut F, records: I) -> Vec<OutputRecord>
where
    F: StreamingKFilter + ?Sized,
    I: IntoIterator<Item = InputRecord>,
{
    let mut out = Vec::new();
    for r in records {
        filter.ingest(r);
        out.extend(filter.drain_outputs());
    }
    out
}
