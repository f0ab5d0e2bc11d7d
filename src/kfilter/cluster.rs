use ordered_float::OrderedFloat;
use serde::Serialize;
use std::cmp::Ordering;

use crate::kfilter::range::ValueRange;
use crate::kfilter::records::InputRecord;

/// An anonymity cluster: the mean of its members is the published value.
///
/// Built once from `>= k` records at a single tick and never mutated afterwards.
/// `range` exactly encloses the member values and contains `anonymised_value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cluster {
    anonymised_value: f64,
    range: ValueRange,
    creation_time: i64,
    size: usize,
}

impl Cluster {
    /// Build from member records.
    ///
    /// # Panics
    /// On an empty member set. The filter only builds clusters from neighbor
    /// searches whose pool is guaranteed non-empty by `delay_constraint >= k`.
    pub fn from_records<'a, I>(records: I, creation_time: i64) -> Self
    where
        I: IntoIterator<Item = &'a InputRecord>,
    {
        let mut sum = 0.0;
        let mut size = 0usize;
        let mut range: Option<ValueRange> = None;
        for r in records {
            sum += r.raw_value;
            size += 1;
            range = Some(match range {
                Some(acc) => acc.span_value(r.raw_value),
                None => ValueRange::singleton(r.raw_value),
            });
        }
        let range = match range {
            Some(r) => r,
            None => panic!("kfilter: internal invariant violation: cluster built from no records"),
        };
        Cluster {
            anonymised_value: sum / size as f64,
            range,
            creation_time,
            size,
        }
    }

    #[inline]
    pub fn anonymised_value(&self) -> f64 {
        self.anonymised_value
    }
    #[inline]
    pub fn range(&self) -> ValueRange {
        self.range
    }
    #[inline]
    pub fn creation_time(&self) -> i64 {
        self.creation_time
    }
    /// Number of records the cluster was formed from.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn age(&self, now: i64) -> i64 {
        now - self.creation_time
    }

    #[inline]
    pub fn covers(&self, record: &InputRecord) -> bool {
        self.range.contains(record.raw_value)
    }

    /// Distance between the record and the value it would be published as.
    ///
    /// This is deliberately not the range-width loss from the literature: picking the
    /// closest anonymised value gives more accurate published records in practice.
    #[inline]
    pub fn info_loss(&self, record: &InputRecord) -> f64 {
        (self.anonymised_value - record.raw_value).abs()
    }

    /// Total preference order for publishing `record`: lower info loss first, then
    /// the older cluster.
    pub fn preference(&self, other: &Cluster, record: &InputRecord) -> Ordering {
        OrderedFloat(self.info_loss(record))
            .cmp(&OrderedFloat(other.info_loss(record)))
            .then(self.creation_time.cmp(&other.creation_time))
    }

    /// `true` iff `self` has strictly lower info loss for `record`, or equal loss and
    /// a strictly older creation time.
    #[inline]
    pub fn prefer_than(&self, other: &Cluster, record: &InputRecord) -> bool {
        self.preference(other, record) == Ordering::Less
    }
}
