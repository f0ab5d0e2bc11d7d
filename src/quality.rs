use kfilter_testdata::{gen_stream, DistKind};
use tracing::info;

use crate::kfilter::{run_stream, FadsFilter, FilterConfig, InputRecord};
use crate::KfResult;

/// Quality harness: push a seeded synthetic stream through a filter and measure
/// the distortion and delay it introduced.
#[derive(Debug, Clone)]
pub struct Quality {
    pub n: usize,
    pub config: FilterConfig,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub n: usize,
    /// Records released (the rest were still buffered when the stream ended).
    pub published: usize,
    pub info_loss_ratio: f64,
    pub latency: f64,
    /// Mean info loss recomputed from the outputs, in raw-value units.
    pub mean_abs_err: f64,
}

impl QualityReport {
    /// Half-lives chosen so a default filter on a uniform stream lands mid-range.
    pub fn quality_score(&self) -> f64 {
        self.quality_score_with_halves(0.05, 2_000.0)
    }

    /// Customizable half-lives: each subscore hits 0.5 when its metric equals its half-life.
    pub fn quality_score_with_halves(&self, half_loss: f64, half_latency: f64) -> f64 {
        fn sub(x: f64, half: f64) -> f64 {
            if half <= 0.0 || !x.is_finite() {
                return 0.0;
            }
            (2.0f64).powf(-x / half).clamp(0.0, 1.0)
        }
        let s_loss = sub(self.info_loss_ratio, half_loss);
        let s_lat = sub(self.latency, half_latency);
        (s_loss * s_lat).sqrt()
    }

    pub fn to_line(&self) -> String {
        format!(
            "QualityReport(n={}, published={}, loss_ratio={:.6e}, latency={:.3}, MAE={:.6e}, score={:.3})",
            self.n,
            self.published,
            self.info_loss_ratio,
            self.latency,
            self.mean_abs_err,
            self.quality_score()
        )
    }

    pub fn log(&self) {
        info!(
            n = self.n,
            published = self.published,
            info_loss_ratio = self.info_loss_ratio,
            latency = self.latency,
            mean_abs_err = self.mean_abs_err,
            score = self.quality_score(),
            "quality report"
        );
    }
}

impl Quality {
    pub fn new(n: usize, config: FilterConfig, seed: u64) -> Self {
        Self { n, config, seed }
    }

    /// Run the harness on a stream drawn from `kind`.
    pub fn run(&self, kind: DistKind) -> KfResult<QualityReport> {
        let records: Vec<InputRecord> = gen_stream(kind, self.n, self.seed)
            .into_iter()
            .map(|(t, v)| InputRecord::new(t, v))
            .collect();

        let mut filter = FadsFilter::from_config(self.config)?;
        let outputs = run_stream(&mut filter, records);

        let mean_abs_err = if outputs.is_empty() {
            f64::NAN
        } else {
            outputs
                .iter()
                .map(|o| (o.anonymised_value - o.raw_value).abs())
                .sum::<f64>()
                / outputs.len() as f64
        };

        Ok(QualityReport {
            n: self.n,
            published: outputs.len(),
            info_loss_ratio: filter.info_loss_ratio(),
            latency: filter.latency(),
            mean_abs_err,
        })
    }
}
