// src/kfilter/fads.rs
use std::collections::{HashSet, VecDeque};

use tracing::{debug, info, trace, warn};

use crate::kfilter::cluster::Cluster;
use crate::kfilter::config::{FilterConfig, FlushPolicy};
use crate::kfilter::filter::StreamingKFilter;
use crate::kfilter::metrics::{FilterMetrics, RunningMetrics};
use crate::kfilter::neighbors::{k_nearest_inclusive, BufferedRecord};
use crate::kfilter::range::ValueRange;
use crate::kfilter::records::{InputRecord, OutputRecord};
use crate::KfResult;

/// Streaming k-anonymity filter using the FADS algorithm.
///
/// "Fast clustering-based anonymization approaches with time constraints for data
/// streams" by Kun Guo, Qishan Zhang.
///
/// - Records wait in a FIFO buffer until it holds `delay_constraint` entries; the head
///   is then published.
/// - Publishing either reuses a recent cluster that covers the record, or forms a
///   fresh cluster from the record and its `k - 1` nearest buffered neighbors and
///   releases all of them at once.
/// - Clusters stay reusable while `age < reuse_constraint`.
///
/// Single-owner and synchronous: state is only mutated through [`StreamingKFilter`]
/// and [`FadsFilter::flush`], and outputs are moved out on drain.
#[derive(Debug, Clone)]
pub struct FadsFilter {
    config: FilterConfig,
    buffer: VecDeque<BufferedRecord>, // Set_tp in FADS paper
    reusable: Vec<Cluster>,           // Set_kc in FADS paper
    pending: Vec<OutputRecord>,
    current_time: i64,
    next_seq: u64,
    domain: Option<ValueRange>,
    metrics: RunningMetrics,
}

/* =============================================================================
 * Builder
 * ============================================================================= */

/// Builder for [`FadsFilter`]. Validation happens in [`FadsFilterBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct FadsFilterBuilder {
    config: FilterConfig,
}

impl FadsFilterBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Anonymity set size (`> 1`).
    #[inline]
    pub fn k(mut self, k: usize) -> Self {
        self.config.k = k;
        self
    }

    /// Buffer length that forces the head to be published (`>= k`).
    #[inline]
    pub fn delay_constraint(mut self, n: usize) -> Self {
        self.config.delay_constraint = n;
        self
    }

    /// Maximum age, in ticks, at which a cluster may still be reused.
    #[inline]
    pub fn reuse_constraint(mut self, ticks: i64) -> Self {
        self.config.reuse_constraint = ticks;
        self
    }

    #[inline]
    pub fn flush_policy(mut self, p: FlushPolicy) -> Self {
        self.config.flush_policy = p;
        self
    }

    /// Replace every parameter at once.
    #[inline]
    pub fn config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> KfResult<FadsFilter> {
        self.config.validate()?;
        info!(
            k = self.config.k,
            delay_constraint = self.config.delay_constraint,
            reuse_constraint = self.config.reuse_constraint,
            flush_policy = ?self.config.flush_policy,
            "fads filter configured"
        );
        Ok(FadsFilter::with_config(self.config))
    }
}

/* =============================================================================
 * Filter
 * ============================================================================= */

impl Default for FadsFilter {
    /// Paper defaults: `k = 100`, `delay_constraint = 2000`, `reuse_constraint = 200`.
    fn default() -> Self {
        FadsFilter::with_config(FilterConfig::default())
    }
}

impl FadsFilter {
    /// Unvalidated; callers go through the builder or use known-good defaults.
    fn with_config(config: FilterConfig) -> Self {
        FadsFilter {
            config,
            buffer: VecDeque::new(),
            reusable: Vec::new(),
            pending: Vec::new(),
            current_time: 0,
            next_seq: 0,
            domain: None,
            metrics: RunningMetrics::default(),
        }
    }

    /// Validate and construct.
    pub fn new(k: usize, delay_constraint: usize, reuse_constraint: i64) -> KfResult<Self> {
        Self::builder()
            .k(k)
            .delay_constraint(delay_constraint)
            .reuse_constraint(reuse_constraint)
            .build()
    }

    /// Construct from a full parameter set.
    pub fn from_config(config: FilterConfig) -> KfResult<Self> {
        Self::builder().config(config).build()
    }

    /// Entry point for fluent construction.
    #[inline]
    pub fn builder() -> FadsFilterBuilder {
        FadsFilterBuilder::default()
    }

    #[inline]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Time of the last ingested record.
    #[inline]
    pub fn current_time(&self) -> i64 {
        self.current_time
    }

    /// Records waiting for publication, oldest first.
    pub fn buffered(&self) -> impl Iterator<Item = &InputRecord> + '_ {
        self.buffer.iter().map(|b| b.record())
    }

    #[inline]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clusters still young enough to be reused.
    #[inline]
    pub fn reusable_clusters(&self) -> &[Cluster] {
        &self.reusable
    }

    /// Number of outputs waiting to be drained.
    #[inline]
    pub fn pending_outputs(&self) -> usize {
        self.pending.len()
    }

    /// Smallest interval holding every raw value seen so far.
    #[inline]
    pub fn domain_range(&self) -> Option<ValueRange> {
        self.domain
    }

    /// Average info loss relative to the domain value range width; `0.0` while fewer
    /// than two distinct values have been seen.
    #[inline]
    pub fn info_loss_ratio(&self) -> f64 {
        self.metrics.info_loss_ratio(self.domain)
    }

    /// Average `output_time - input_time` over every published record.
    #[inline]
    pub fn latency(&self) -> f64 {
        self.metrics.latency()
    }

    #[inline]
    pub fn published(&self) -> u64 {
        self.metrics.published()
    }

    pub fn metrics(&self) -> FilterMetrics {
        self.metrics.snapshot(self.domain)
    }

    /// Empty the buffer according to the configured [`FlushPolicy`] and return the
    /// number of records that left it.
    ///
    /// Output time is the current time. Cluster expiry is not re-evaluated.
    pub fn flush(&mut self) -> usize {
        let n = self.buffer.len();
        if n == 0 {
            return 0;
        }
        match self.config.flush_policy {
            FlushPolicy::Drop => {
                self.buffer.clear();
                warn!(dropped = n, "flush dropped buffered records");
            }
            FlushPolicy::Publish => {
                while self.buffer.len() >= self.config.k {
                    match self.buffer.pop_front() {
                        Some(head) => self.publish(head),
                        None => break,
                    }
                }
                self.publish_remainder();
            }
        }
        n
    }

    /* ===========================
     * Publishing
     * =========================== */

    fn purge_expired(&mut self) {
        let now = self.current_time;
        let limit = self.config.reuse_constraint;
        let before = self.reusable.len();
        self.reusable.retain(|c| c.age(now) < limit);
        let purged = before - self.reusable.len();
        if purged > 0 {
            debug!(purged, now, remaining = self.reusable.len(), "expired clusters");
        }
    }

    /// Covering cluster with the least info loss; ties go to the older cluster.
    fn best_reusable(&self, record: &InputRecord) -> Option<Cluster> {
        self.reusable
            .iter()
            .filter(|c| c.covers(record))
            .min_by(|a, b| a.preference(b, record))
            .copied()
    }

    /// Publish `head`, which has already been taken off the buffer.
    fn publish(&mut self, head: BufferedRecord) {
        let record = *head.record();
        let reusable = self.best_reusable(&record);

        let members = k_nearest_inclusive(self.config.k, &head, &self.buffer);
        let fresh = Cluster::from_records(members.iter().map(|m| m.record()), self.current_time);

        if let Some(cached) = reusable {
            if cached.prefer_than(&fresh, &record) {
                debug!(
                    time = record.time,
                    cluster_created = cached.creation_time(),
                    value = cached.anonymised_value(),
                    "reused cluster"
                );
                self.emit(&cached, &record);
                return;
            }
        }

        debug!(
            time = self.current_time,
            size = fresh.size(),
            value = fresh.anonymised_value(),
            "formed cluster"
        );
        self.reusable.push(fresh);
        for m in &members {
            self.emit(&fresh, m.record());
        }
        let taken: HashSet<u64> = members.iter().map(|m| m.seq()).collect();
        self.buffer.retain(|b| !taken.contains(&b.seq()));
    }

    /// Release the fewer-than-k records left after a publishing flush. Records a
    /// reusable cluster covers go out against it; the rest form one undersized group.
    fn publish_remainder(&mut self) {
        let rest: Vec<BufferedRecord> = self.buffer.drain(..).collect();
        let mut uncovered = Vec::with_capacity(rest.len());
        for b in rest {
            match self.best_reusable(b.record()) {
                Some(cached) => self.emit(&cached, b.record()),
                None => uncovered.push(b),
            }
        }
        if uncovered.is_empty() {
            return;
        }
        let group = Cluster::from_records(uncovered.iter().map(|m| m.record()), self.current_time);
        warn!(
            size = group.size(),
            k = self.config.k,
            "flush released a group smaller than k"
        );
        for m in &uncovered {
            self.emit(&group, m.record());
        }
    }

    fn emit(&mut self, cluster: &Cluster, record: &InputRecord) {
        let out = OutputRecord::released(record, self.current_time, cluster.anonymised_value());
        self.metrics.record(cluster.info_loss(record), out.latency());
        trace!(%out, "emit");
        self.pending.push(out);
    }
}

impl StreamingKFilter for FadsFilter {
    fn ingest(&mut self, record: InputRecord) {
        self.current_time = record.time;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.buffer.push_back(BufferedRecord::new(seq, record));

        self.domain = Some(match self.domain {
            Some(d) => d.span_value(record.raw_value),
            None => ValueRange::singleton(record.raw_value),
        });

        self.purge_expired();

        while self.buffer.len() >= self.config.delay_constraint {
            match self.buffer.pop_front() {
                Some(head) => self.publish(head),
                None => break,
            }
        }
    }

    fn drain_outputs(&mut self) -> Vec<OutputRecord> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kfilter::test_helpers::{assert_exact, assert_rel_close};
    use crate::KfError;

    fn feed(f: &mut FadsFilter, values: &[f64]) {
        let start = f.next_seq as i64;
        for (i, &v) in values.iter().enumerate() {
            f.ingest(InputRecord::new(start + i as i64, v));
        }
    }

    #[test]
    fn constructs() {
        let _ = FadsFilter::default();
        assert!(FadsFilter::new(5, 20, 100).is_ok());
        assert!(matches!(
            FadsFilter::new(1, 20, 100),
            Err(KfError::InvalidConfig { .. })
        ));
        assert!(matches!(
            FadsFilter::new(5, 4, 100),
            Err(KfError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn immediate_consumption_is_empty() {
        let mut f = FadsFilter::default();
        assert!(f.drain_outputs().is_empty());
        f.ingest(InputRecord::new(0, 0.0));
        assert!(f.drain_outputs().is_empty());
        assert_eq!(f.buffered_len(), 1);
    }

    #[test]
    fn same_k_and_delay() {
        let mut f = FadsFilter::new(2, 2, 100).unwrap();
        feed(&mut f, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(f.pending_outputs(), 4);

        let out = f.drain_outputs();
        assert_eq!(out.len(), 4);
        assert_eq!(f.pending_outputs(), 0);
        for r in &out {
            let want = match r.input_time {
                0 | 1 => 1.5,
                2 | 3 => 3.5,
                t => panic!("unexpected input time {t}"),
            };
            assert_exact("anonymised", want, r.anonymised_value);
        }
        let times: Vec<(i64, i64)> = out.iter().map(|r| (r.input_time, r.output_time)).collect();
        assert_eq!(times, vec![(0, 1), (1, 1), (2, 3), (3, 3)]);
        assert!(f.drain_outputs().is_empty());
    }

    #[test]
    fn cluster_expires_when_age_reaches_reuse_constraint() {
        let mut f = FadsFilter::new(2, 2, 10).unwrap();
        f.ingest(InputRecord::new(4, 1.0));
        f.ingest(InputRecord::new(5, 2.0)); // cluster created at t=5
        assert_eq!(f.reusable_clusters().len(), 1);
        assert_eq!(f.reusable_clusters()[0].creation_time(), 5);

        f.ingest(InputRecord::new(14, 100.0));
        assert_eq!(f.reusable_clusters().len(), 1, "age 9 < 10 keeps the cluster");

        f.ingest(InputRecord::new(15, 200.0));
        // age 10 purges the t=5 cluster; publishing 100.0 forms a new one at t=15
        let created: Vec<i64> = f.reusable_clusters().iter().map(|c| c.creation_time()).collect();
        assert_eq!(created, vec![15]);
    }

    #[test]
    fn covered_record_reuses_an_exact_cluster() {
        // cluster {1,3} (mean 2) exists; 2.0 then arrives next to a far neighbor.
        let mut f = FadsFilter::new(2, 2, 100).unwrap();
        feed(&mut f, &[1.0, 3.0]);
        assert_eq!(f.drain_outputs().len(), 2);

        feed(&mut f, &[2.0, 50.0]);
        let out = f.drain_outputs();
        assert_eq!(out.len(), 1, "reuse releases only the head");
        assert_eq!(out[0].input_time, 2);
        assert_exact("reused", 2.0, out[0].anonymised_value);
        assert_eq!(f.buffered_len(), 1);
        assert_eq!(f.reusable_clusters().len(), 1);
    }

    #[test]
    fn new_cluster_wins_when_strictly_closer() {
        let mut f = FadsFilter::new(2, 2, 100).unwrap();
        feed(&mut f, &[1.0, 3.0]); // mean 2
        let _ = f.drain_outputs();

        // head 2.9 is covered (loss 0.9), new cluster {2.9, 3.0} has loss 0.05
        feed(&mut f, &[2.9, 3.0]);
        let out = f.drain_outputs();
        assert_eq!(out.len(), 2);
        for r in &out {
            assert_rel_close("fresh", 2.95, r.anonymised_value, 1e-12);
        }
        assert_eq!(f.reusable_clusters().len(), 2);
    }

    #[test]
    fn exact_tie_prefers_the_cached_cluster() {
        let mut f = FadsFilter::new(2, 2, 100).unwrap();
        feed(&mut f, &[1.0, 3.0]); // cached mean 2
        let _ = f.drain_outputs();

        // head 2.0: cached loss 0; fresh {2.0, 2.0} also loss 0 but younger
        feed(&mut f, &[2.0, 2.0]);
        let out = f.drain_outputs();
        assert_eq!(out.len(), 1);
        assert_eq!(f.reusable_clusters().len(), 1);
    }

    #[test]
    fn best_of_several_covering_clusters_is_chosen() {
        let mut f = FadsFilter::new(2, 2, 1_000).unwrap();
        feed(&mut f, &[0.0, 10.0]); // mean 5, covers [0,10]
        feed(&mut f, &[6.0, 8.0]); // head 6.0 covered (loss 1) vs fresh {6,8} loss 1 -> cached wins
        let _ = f.drain_outputs();
        assert_eq!(f.reusable_clusters().len(), 1);
        feed(&mut f, &[7.0]); // buffer [8,7]: head 8 loss 3 vs {8,7} loss 0.5 -> fresh mean 7.5
        let _ = f.drain_outputs();
        assert_eq!(f.reusable_clusters().len(), 2);

        // 7.4 is covered by [0,10] (loss 2.4) and [7,8] (loss 0.1)
        feed(&mut f, &[7.4, 100.0]);
        let out = f.drain_outputs();
        assert_eq!(out.len(), 1);
        assert_rel_close("best", 7.5, out[0].anonymised_value, 1e-12);
    }

    #[test]
    fn equal_loss_covering_clusters_go_to_the_older_one() {
        // [2,6] mean 4 (t=1) and [4,8] mean 6 (t=2) both sit 1.0 from head 5.0
        let older = Cluster::from_records(&[InputRecord::new(0, 2.0), InputRecord::new(1, 6.0)], 1);
        let newer = Cluster::from_records(&[InputRecord::new(0, 4.0), InputRecord::new(2, 8.0)], 2);
        for cached in [[older, newer], [newer, older]] {
            let mut f = FadsFilter::new(2, 2, 1_000).unwrap();
            f.reusable.extend(cached);
            f.ingest(InputRecord::new(3, 5.0));
            f.ingest(InputRecord::new(4, 100.0));
            let out = f.drain_outputs();
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].input_time, 3);
            assert_exact("older cluster", 4.0, out[0].anonymised_value);
            assert_eq!(f.reusable_clusters().len(), 2);
        }
    }

    #[test]
    fn huge_delay_constraint_constructs_and_buffers() {
        let mut f = FadsFilter::new(2, usize::MAX, 10).unwrap();
        feed(&mut f, &[1.0, 2.0, 3.0]);
        assert_eq!(f.buffered_len(), 3);
        assert!(f.drain_outputs().is_empty());
        assert_eq!(f.flush(), 3);
        assert_eq!(f.buffered_len(), 0);
    }

    #[test]
    fn publishing_can_release_records_out_of_order() {
        let mut f = FadsFilter::new(2, 3, 100).unwrap();
        feed(&mut f, &[1.0, 50.0, 1.1]);
        let out = f.drain_outputs();
        let inputs: Vec<i64> = out.iter().map(|r| r.input_time).collect();
        assert_eq!(inputs, vec![0, 2]);
        let left: Vec<f64> = f.buffered().map(|r| r.raw_value).collect();
        assert_eq!(left, vec![50.0]);
    }

    #[test]
    fn buffer_stays_below_delay_constraint() {
        let mut f = FadsFilter::new(3, 6, 4).unwrap();
        let values = [4.0, 1.0, 6.0, 3.0, 8.0, 2.0, 5.0, 9.0, 1.0, 6.0, 4.0, 7.0];
        for (t, &v) in values.iter().enumerate() {
            f.ingest(InputRecord::new(t as i64, v));
            assert!(f.buffered_len() < 6);
            assert!(f
                .reusable_clusters()
                .iter()
                .all(|c| c.age(f.current_time()) < 4));
        }
        let out = f.drain_outputs();
        assert_eq!(out.len() as u64, f.published());
        assert_eq!(out.len() + f.buffered_len(), values.len());
        assert!(out.iter().all(|r| r.output_time >= r.input_time));
        assert!(f.latency() >= 0.0);
        assert!(f.info_loss_ratio() >= 0.0);
    }

    #[test]
    fn metrics_follow_emissions() {
        let mut f = FadsFilter::new(2, 2, 100).unwrap();
        assert_exact("ratio before data", 0.0, f.info_loss_ratio());
        feed(&mut f, &[5.0]);
        assert_exact("ratio single value", 0.0, f.info_loss_ratio());
        feed(&mut f, &[1.0, 2.0, 3.0]);
        // emissions: {5,1} mean 3 at t=1 (loss 2, 2), {2,3} mean 2.5 at t=3 (loss .5, .5)
        // latencies 1,0,1,0
        assert_eq!(f.published(), 4);
        assert_rel_close("ratio", 1.25 / 4.0, f.info_loss_ratio(), 1e-12);
        assert_rel_close("latency", 0.5, f.latency(), 1e-12);
        let m = f.metrics();
        assert_eq!(m.published, 4);
        assert_rel_close("snapshot latency", 0.5, m.latency, 1e-12);
    }

    #[test]
    fn flush_drop_discards() {
        let mut f = FadsFilter::new(3, 5, 100).unwrap();
        feed(&mut f, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(f.flush(), 4);
        assert_eq!(f.buffered_len(), 0);
        assert!(f.drain_outputs().is_empty());
        assert_eq!(f.flush(), 0);
    }

    #[test]
    fn flush_publish_releases_everything() {
        let mut f = FadsFilter::builder()
            .k(3)
            .delay_constraint(10)
            .reuse_constraint(100)
            .flush_policy(FlushPolicy::Publish)
            .build()
            .unwrap();
        feed(&mut f, &[1.0, 2.0, 3.0, 10.0, 11.0]);
        assert_eq!(f.flush(), 5);
        assert_eq!(f.buffered_len(), 0);

        let out = f.drain_outputs();
        assert_eq!(out.len(), 5);
        // head 1.0 groups with 2.0 and 3.0; {10, 11} is the undersized remainder
        for r in &out {
            let want = if r.raw_value < 5.0 { 2.0 } else { 10.5 };
            assert_rel_close("flushed", want, r.anonymised_value, 1e-12);
            assert_eq!(r.output_time, 4);
        }
        // the undersized group is never offered for reuse
        assert!(f.reusable_clusters().iter().all(|c| c.size() >= 3));
    }

    #[test]
    fn flush_publish_prefers_covering_clusters_for_remainder() {
        let mut f = FadsFilter::builder()
            .k(2)
            .delay_constraint(2)
            .flush_policy(FlushPolicy::Publish)
            .build()
            .unwrap();
        feed(&mut f, &[0.0, 10.0, 4.0]);
        let _ = f.drain_outputs();
        assert_eq!(f.flush(), 1);
        let out = f.drain_outputs();
        assert_eq!(out.len(), 1);
        assert_exact("covered remainder", 5.0, out[0].anonymised_value);
    }
}
