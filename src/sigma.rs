//! Per-arm reward dispersion estimates.
//!
//! The bandit loops scale their confidence radii by an empirical standard
//! deviation of each arm's reward, measured once per BUILD round or SWAP
//! iteration from a single uniformly-sampled reference batch shared by all
//! arms. Batches are drawn without replacement.

use crate::cache::NearestCache;
use crate::loss::Loss;
use ndarray::ArrayView2;
use rand::RngCore;
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Default number of reference points per sigma estimate.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Dispersion estimates for the BUILD phase, one per candidate medoid.
///
/// With `use_absolute` (empty medoid set) the reward sample for candidate `a`
/// and reference `r` is the plain cost `d(a, r)`; afterwards it is the
/// improvement `min(d(a, r), best[r]) - best[r]`.
pub fn build_sigma(
    data: &ArrayView2<'_, f64>,
    loss: Loss,
    cache: &NearestCache,
    rng: &mut dyn RngCore,
    batch_size: usize,
    use_absolute: bool,
) -> Vec<f64> {
    let n = data.ncols();
    let refs = sample_refs(rng, n, batch_size);

    let arm = |a: usize| -> f64 {
        let mut acc = StdAcc::default();
        for &r in &refs {
            let cost = loss.measure(data, a, r);
            let sample = if use_absolute {
                cost
            } else {
                cost.min(cache.best[r]) - cache.best[r]
            };
            acc.push(sample);
        }
        acc.stddev()
    };

    #[cfg(feature = "parallel")]
    let sigmas: Vec<f64> = (0..n).into_par_iter().map(arm).collect();

    #[cfg(not(feature = "parallel"))]
    let sigmas: Vec<f64> = (0..n).map(arm).collect();

    sigmas
}

/// Dispersion estimates for the SWAP phase, one per (candidate, slot) pair.
///
/// The returned vector has length `n * k`, indexed `candidate * k + slot`.
/// The reward sample accounts for the reference's second-best distance when
/// the slot being replaced is the reference's own nearest medoid.
pub fn swap_sigma(
    data: &ArrayView2<'_, f64>,
    loss: Loss,
    cache: &NearestCache,
    n_medoids: usize,
    rng: &mut dyn RngCore,
    batch_size: usize,
) -> Vec<f64> {
    let n = data.ncols();
    let k = n_medoids;
    let refs = sample_refs(rng, n, batch_size);

    let arm = |i: usize| -> f64 {
        let cand = i / k;
        let slot = i % k;
        let mut acc = StdAcc::default();
        for &r in &refs {
            let cost = loss.measure(data, cand, r);
            let sample = if cache.assignment[r] == slot {
                cost.min(cache.second[r]) - cache.best[r]
            } else {
                cost.min(cache.best[r]) - cache.best[r]
            };
            acc.push(sample);
        }
        acc.stddev()
    };

    #[cfg(feature = "parallel")]
    let sigmas: Vec<f64> = (0..n * k).into_par_iter().map(arm).collect();

    #[cfg(not(feature = "parallel"))]
    let sigmas: Vec<f64> = (0..n * k).map(arm).collect();

    sigmas
}

fn sample_refs(rng: &mut dyn RngCore, n: usize, batch_size: usize) -> Vec<usize> {
    rand::seq::index::sample(rng, n, batch_size.min(n)).into_vec()
}

/// Running sum / sum-of-squares accumulator for a sample standard deviation
/// (n-1 denominator).
#[derive(Default)]
struct StdAcc {
    count: usize,
    sum: f64,
    sum_sq: f64,
}

impl StdAcc {
    #[inline]
    fn push(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        self.sum_sq += x * x;
    }

    fn stddev(&self) -> f64 {
        if self.count < 2 {
            return f64::NAN;
        }
        let n = self.count as f64;
        let var = (self.sum_sq - self.sum * self.sum / n) / (n - 1.0);
        var.max(0.0).sqrt()
    }
}

/// Distribution summary of one sigma estimation, destined for the fit log.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SigmaSummary {
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
    pub mean: f64,
}

impl SigmaSummary {
    /// Summarize a slice of sigma estimates. NaN entries sort last and are
    /// excluded from the mean.
    pub fn from_sigmas(sigmas: &[f64]) -> Self {
        let mut sorted: Vec<f64> = sigmas.iter().copied().filter(|s| !s.is_nan()).collect();
        sorted.sort_unstable_by(f64::total_cmp);
        if sorted.is_empty() {
            return Self {
                min: f64::NAN,
                q25: f64::NAN,
                median: f64::NAN,
                q75: f64::NAN,
                max: f64::NAN,
                mean: f64::NAN,
            };
        }
        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
        Self {
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
            mean,
        }
    }
}

impl fmt::Display for SigmaSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min: {}, 25th: {}, median: {}, 75th: {}, max: {}, mean: {}",
            self.min, self.q25, self.median, self.q75, self.max, self.mean
        )
    }
}

/// Linear-interpolation quantile of an ascending-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}
