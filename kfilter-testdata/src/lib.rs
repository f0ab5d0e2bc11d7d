//! kfilter-testdata
//! Synthetic telemetry streams shared by benches, tests and the quality harness.
//! Value generators squash into \[0,1] so shapes are comparable; streams attach
//! a non-decreasing integer timestamp to each value.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Available synthetic distributions.
#[derive(Clone, Copy, Debug)]
pub enum DistKind {
    /// Uniform in \[0,1)
    Uniform,
    /// Gaussian mapped to \[0,1]
    Normal,
    /// Mixed: clumps, broad region, and heavy tails
    Mixture,
    /// Sensor-like random walk with gaussian steps of size `step`, clamped to \[0,1]
    Drift { step: f64 },
}

/// Generate `n` samples for the chosen distribution, squashed into \[0,1].
pub fn gen_dataset(kind: DistKind, n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(n);

    match kind {
        DistKind::Uniform => {
            for _ in 0..n {
                out.push(rng.random::<f64>());
            }
        }
        DistKind::Normal => {
            let normal = Normal::new(0.0, 1.0).unwrap();
            for _ in 0..n {
                let z: f64 = normal.sample(&mut rng);
                out.push((0.5 + 0.2 * z).clamp(0.0, 1.0));
            }
        }
        DistKind::Mixture => {
            for _ in 0..n {
                let bucket: u32 = rng.random_range(0..100);
                let v = match bucket {
                    // Clumps around 0.1, 0.5, 0.9 with micro-noise
                    0..=29 => {
                        let center = match rng.random_range(0..3) {
                            0 => 0.10,
                            1 => 0.50,
                            _ => 0.90,
                        };
                        center + rng.random_range(-1.0..1.0) * 1e-3
                    }
                    30..=69 => rng.random::<f64>(),
                    _ => {
                        let exp = rng.random_range(3.0..9.0);
                        if rng.random_bool(0.5) {
                            rng.random::<f64>().clamp(1e-12, 1.0).powf(exp)
                        } else {
                            1.0 - rng.random::<f64>().clamp(1e-12, 1.0).powf(exp)
                        }
                    }
                };
                out.push(v.clamp(0.0, 1.0));
            }
        }
        DistKind::Drift { step } => {
            let normal = Normal::new(0.0, step.abs().max(f64::MIN_POSITIVE)).unwrap();
            let mut x = 0.5;
            for _ in 0..n {
                let dx: f64 = normal.sample(&mut rng);
                x = (x + dx).clamp(0.0, 1.0);
                out.push(x);
            }
        }
    }
    out
}

/// Generate a timestamped stream: one sample per tick, starting at time 0.
pub fn gen_stream(kind: DistKind, n: usize, seed: u64) -> Vec<(i64, f64)> {
    gen_dataset(kind, n, seed)
        .into_iter()
        .enumerate()
        .map(|(t, v)| (t as i64, v))
        .collect()
}

/// Like [`gen_stream`], but several samples may share a tick (bursty arrival).
/// Timestamps stay non-decreasing.
pub fn gen_bursty_stream(kind: DistKind, n: usize, max_burst: usize, seed: u64) -> Vec<(i64, f64)> {
    let values = gen_dataset(kind, n, seed);
    let mut rng = StdRng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15);
    let mut out = Vec::with_capacity(n);
    let mut t = 0i64;
    let mut left_in_burst = 0usize;
    for v in values {
        if left_in_burst == 0 {
            t += 1;
            left_in_burst = rng.random_range(1..=max_burst.max(1));
        }
        left_in_burst -= 1;
        out.push((t, v));
    }
    out
}
