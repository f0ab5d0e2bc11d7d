use ordered_float::OrderedFloat;

use crate::kfilter::records::InputRecord;

/// A record sitting in the filter's pending buffer.
///
/// `seq` is the arrival sequence number assigned by the filter. It identifies the
/// entry (two records may carry equal time and value) and totalizes tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferedRecord {
    seq: u64,
    record: InputRecord,
}

impl BufferedRecord {
    #[inline]
    pub fn new(seq: u64, record: InputRecord) -> Self {
        Self { seq, record }
    }
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }
    #[inline]
    pub fn record(&self) -> &InputRecord {
        &self.record
    }
    #[inline]
    pub fn raw_value(&self) -> f64 {
        self.record.raw_value
    }
}

/// Ordering key for neighbor candidates: distance first, then older arrival
/// time, then older sequence number. Older records win ties so they are the
/// ones consumed from the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct NeighborKey {
    distance: OrderedFloat<f64>,
    time: i64,
    seq: u64,
}

impl NeighborKey {
    #[inline]
    fn of(candidate: &BufferedRecord, target: &BufferedRecord) -> Self {
        Self {
            distance: OrderedFloat(distance(candidate, target)),
            time: candidate.record.time,
            seq: candidate.seq,
        }
    }
}

/// Single-attribute distance.
#[inline]
pub fn distance(a: &BufferedRecord, b: &BufferedRecord) -> f64 {
    (a.raw_value() - b.raw_value()).abs()
}

/// Find the `k - 1` candidates closest to `target` and return them together with
/// `target` (`k` records, `target` first, then neighbors nearest-first).
///
/// `target` itself is skipped if it is still present in `pool`. When fewer than
/// `k - 1` other candidates exist the result is empty; the filter never calls this
/// in that state because `delay_constraint >= k`.
///
/// Selection is `O(n + k log k)`: partition around the (k-1)-th key, then order the
/// survivors. The result is identical to a full sort under the same key.
pub fn k_nearest_inclusive<'a, I>(k: usize, target: &BufferedRecord, pool: I) -> Vec<BufferedRecord>
where
    I: IntoIterator<Item = &'a BufferedRecord>,
{
    if k == 0 {
        return Vec::new();
    }
    let need = k - 1;

    let mut scored: Vec<(NeighborKey, BufferedRecord)> = pool
        .into_iter()
        .filter(|c| c.seq != target.seq)
        .map(|c| (NeighborKey::of(c, target), *c))
        .collect();
    if scored.len() < need {
        return Vec::new();
    }

    if need > 0 && need < scored.len() {
        scored.select_nth_unstable_by(need - 1, |a, b| a.0.cmp(&b.0));
    }
    scored.truncate(need);
    scored.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let mut out = Vec::with_capacity(k);
    out.push(*target);
    out.extend(scored.into_iter().map(|(_, c)| c));
    out
}
