use serde::{Deserialize, Serialize};

use crate::kfilter::range::ValueRange;

/// Running averages over every emission.
///
/// Each mean is updated as `avg' = (avg * n + x) / (n + 1)` with `n` the count before
/// the emission. That formula drifts in floating point over very long runs; it is
/// kept as-is so metric values stay comparable across releases.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct RunningMetrics {
    published: u64,
    info_loss_mean: f64,
    latency_mean: f64,
}

#[inline]
fn re_average(average: f64, count: u64, value: f64) -> f64 {
    if count == 0 {
        return value;
    }
    let n = count as f64;
    (average * n + value) / (n + 1.0)
}

impl RunningMetrics {
    /// Fold one emission into both means and bump the published counter.
    pub(crate) fn record(&mut self, info_loss: f64, latency: i64) {
        self.info_loss_mean = re_average(self.info_loss_mean, self.published, info_loss);
        self.latency_mean = re_average(self.latency_mean, self.published, latency as f64);
        self.published += 1;
    }

    #[inline]
    pub(crate) fn published(&self) -> u64 {
        self.published
    }

    #[inline]
    pub(crate) fn latency(&self) -> f64 {
        self.latency_mean
    }

    /// Mean info loss normalized by the width of the observed domain; `0.0` while the
    /// domain is unknown or degenerate.
    pub(crate) fn info_loss_ratio(&self, domain: Option<ValueRange>) -> f64 {
        match domain {
            Some(d) if !d.is_degenerate() => self.info_loss_mean / d.width(),
            _ => 0.0,
        }
    }

    pub(crate) fn snapshot(&self, domain: Option<ValueRange>) -> FilterMetrics {
        FilterMetrics {
            published: self.published,
            info_loss_ratio: self.info_loss_ratio(domain),
            latency: self.latency(),
        }
    }
}

/// Point-in-time view of the filter's metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterMetrics {
    /// Records emitted so far.
    pub published: u64,
    /// Average info loss divided by the domain value range width.
    pub info_loss_ratio: f64,
    /// Average `output_time - input_time`.
    pub latency: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kfilter::test_helpers::{assert_exact, assert_rel_close};

    #[test]
    fn first_sample_becomes_the_mean() {
        let mut m = RunningMetrics::default();
        m.record(0.25, 3);
        assert_eq!(m.published(), 1);
        assert_exact("latency", 3.0, m.latency());
    }

    #[test]
    fn incremental_mean_matches_formula() {
        let mut m = RunningMetrics::default();
        let samples = [(0.5, 1), (1.5, 2), (0.0, 6)];
        for (loss, lat) in samples {
            m.record(loss, lat);
        }
        assert_rel_close("latency", 3.0, m.latency(), 1e-12);
        let domain = ValueRange::enclose_all([0.0, 4.0]);
        assert_rel_close("ratio", (2.0 / 3.0) / 4.0, m.info_loss_ratio(domain), 1e-12);
    }

    #[test]
    fn ratio_is_zero_without_a_domain_width() {
        let mut m = RunningMetrics::default();
        m.record(1.0, 0);
        assert_exact("none", 0.0, m.info_loss_ratio(None));
        assert_exact(
            "degenerate",
            0.0,
            m.info_loss_ratio(Some(ValueRange::singleton(3.0))),
        );
    }

    #[test]
    fn snapshot_serializes() {
        let mut m = RunningMetrics::default();
        m.record(1.0, 2);
        let snap = m.snapshot(ValueRange::enclose_all([0.0, 2.0]));
        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(json, r#"{"published":1,"info_loss_ratio":0.5,"latency":2.0}"#);
    }
}
