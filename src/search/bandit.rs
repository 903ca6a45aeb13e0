//! Bandit-accelerated BUILD and SWAP.
//!
//! Each candidate (a point during BUILD, a (candidate, slot) pair during
//! SWAP) is an arm whose expected reward is the mean per-point change in
//! loss. Rewards are estimated from reference batches sampled uniformly
//! without replacement; each sampling round draws one fresh batch shared by
//! all surviving arms. Arms whose lower confidence bound exceeds the best
//! upper confidence bound are eliminated. An arm whose sample count would
//! reach the dataset size is evaluated exactly instead and its confidence
//! radius collapses to zero, which also bounds the loop: every surviving arm
//! is exact after finitely many rounds.
//!
//! A NaN dispersion estimate means the arm's reward does not vary across
//! references (or the kernel returned NaN); such arms are not discriminable
//! by sampling and are evaluated exactly up front.

use super::{BanditParams, FitContext};
use crate::cache::NearestCache;
use crate::logging::FitLog;
use crate::sigma::{build_sigma, swap_sigma, SigmaSummary};
use rand::RngCore;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Per-arm bandit state for one BUILD round or SWAP iteration.
struct ArmState {
    estimate: Vec<f64>,
    samples: Vec<usize>,
    exact: Vec<bool>,
    eliminated: Vec<bool>,
}

impl ArmState {
    fn new(len: usize) -> Self {
        Self {
            estimate: vec![0.0; len],
            samples: vec![0; len],
            exact: vec![false; len],
            eliminated: vec![false; len],
        }
    }

    /// Arms still worth sampling: neither eliminated nor fully evaluated.
    fn in_play(&self) -> Vec<usize> {
        (0..self.estimate.len())
            .filter(|&a| !self.eliminated[a] && !self.exact[a])
            .collect()
    }

    /// Surviving arm with the smallest estimate; ties go to the smaller
    /// index, NaN estimates lose to anything finite.
    fn winner(&self) -> usize {
        let mut best = None;
        for a in 0..self.estimate.len() {
            if self.eliminated[a] {
                continue;
            }
            match best {
                None => best = Some(a),
                Some(b) if self.estimate[a] < self.estimate[b] => best = Some(a),
                _ => {}
            }
        }
        best.unwrap_or(0)
    }
}

/// Run the sample-and-eliminate race until at most one arm remains in play.
///
/// `reward` maps (arm, reference point) to the per-point reward sample; the
/// exact value of an arm is the mean reward over all n points.
fn race<F>(
    state: &mut ArmState,
    sigma: &[f64],
    confidence: usize,
    total_arms: usize,
    n: usize,
    batch_size: usize,
    rng: &mut dyn RngCore,
    reward: F,
) where
    F: Fn(usize, usize) -> f64 + Sync,
{
    let log_arms = (total_arms as f64).ln();

    loop {
        let active = state.in_play();
        if active.len() <= 1 {
            break;
        }

        let refs = rand::seq::index::sample(rng, n, batch_size).into_vec();

        let update = |&a: &usize| -> (usize, f64, usize, bool) {
            if sigma[a].is_nan() || state.samples[a] + batch_size >= n {
                // Not discriminable by sampling, or the budget would cover
                // the whole dataset: evaluate exactly.
                let mean = (0..n).map(|r| reward(a, r)).sum::<f64>() / n as f64;
                (a, mean, n, true)
            } else {
                let sum_new: f64 = refs.iter().map(|&r| reward(a, r)).sum();
                let t_old = state.samples[a] as f64;
                let t_new = state.samples[a] + batch_size;
                let est = (state.estimate[a] * t_old + sum_new) / t_new as f64;
                (a, est, t_new, false)
            }
        };

        #[cfg(feature = "parallel")]
        let updates: Vec<(usize, f64, usize, bool)> = active.par_iter().map(update).collect();

        #[cfg(not(feature = "parallel"))]
        let updates: Vec<(usize, f64, usize, bool)> = active.iter().map(update).collect();

        for (a, est, t, exact) in updates {
            state.estimate[a] = est;
            state.samples[a] = t;
            state.exact[a] = exact;
        }

        // Confidence radii; exact arms contribute a zero-width interval.
        let radius: Vec<f64> = (0..state.estimate.len())
            .map(|a| {
                if state.exact[a] || state.eliminated[a] {
                    0.0
                } else {
                    sigma[a] * (confidence as f64 * log_arms / state.samples[a] as f64).sqrt()
                }
            })
            .collect();

        let mut best_ucb = f64::INFINITY;
        for a in 0..state.estimate.len() {
            if state.eliminated[a] {
                continue;
            }
            let ucb = state.estimate[a] + radius[a];
            if ucb < best_ucb {
                best_ucb = ucb;
            }
        }

        // The arm attaining best_ucb always has lcb <= best_ucb, so at least
        // one arm survives every round.
        for a in 0..state.estimate.len() {
            if state.eliminated[a] {
                continue;
            }
            if state.estimate[a] - radius[a] > best_ucb {
                state.eliminated[a] = true;
            }
        }
    }
}

/// Bandit BUILD: k rounds of the elimination race over candidate points.
pub(crate) fn build(
    ctx: &FitContext<'_>,
    n_medoids: usize,
    params: &BanditParams,
    rng: &mut dyn RngCore,
    log: &mut dyn FitLog,
) -> (Vec<usize>, NearestCache) {
    let n = ctx.n();
    let batch_size = params.batch_size.min(n);
    let mut medoids: Vec<usize> = Vec::with_capacity(n_medoids);
    let mut cache = NearestCache::empty(n);

    for round in 0..n_medoids {
        let use_absolute = medoids.is_empty();
        let sigma = build_sigma(&ctx.data, ctx.loss, &cache, rng, batch_size, use_absolute);
        log.build_sigma_summary(SigmaSummary::from_sigmas(&sigma));

        let mut state = ArmState::new(n);
        for &m in &medoids {
            state.eliminated[m] = true;
        }

        {
            let cache = &cache;
            race(
                &mut state,
                &sigma,
                params.build_confidence,
                n,
                n,
                batch_size,
                rng,
                |a, r| {
                    let cost = ctx.d(a, r);
                    if use_absolute {
                        cost
                    } else {
                        cost.min(cache.best[r]) - cache.best[r]
                    }
                },
            );
        }

        let winner = state.winner();
        debug!(round, winner, estimate = state.estimate[winner], "build medoid selected");
        cache.absorb(&ctx.data, ctx.loss, winner, round);
        medoids.push(winner);
    }

    (medoids, cache)
}

/// Bandit SWAP: one elimination race over all (candidate, slot) pairs per
/// iteration; the winning swap is applied only when its estimated gain is
/// strictly negative. Returns the number of applied swaps.
pub(crate) fn swap(
    ctx: &FitContext<'_>,
    medoids: &mut [usize],
    cache: &mut NearestCache,
    params: &BanditParams,
    max_iter: usize,
    rng: &mut dyn RngCore,
    log: &mut dyn FitLog,
) -> usize {
    let n = ctx.n();
    let k = medoids.len();
    let batch_size = params.batch_size.min(n);
    let mut steps = 0;

    while steps < max_iter {
        let sigma = swap_sigma(&ctx.data, ctx.loss, cache, k, rng, batch_size);
        log.swap_sigma_summary(SigmaSummary::from_sigmas(&sigma));

        // Arms are (candidate, slot) pairs, candidate-major. Swapping a
        // medoid for itself is a no-op, so those arms start eliminated.
        let mut state = ArmState::new(n * k);
        for &m in medoids.iter() {
            for slot in 0..k {
                state.eliminated[m * k + slot] = true;
            }
        }

        {
            let cache = &*cache;
            race(
                &mut state,
                &sigma,
                params.swap_confidence,
                n * k,
                n,
                batch_size,
                rng,
                |arm, r| {
                    let cand = arm / k;
                    let slot = arm % k;
                    let cost = ctx.d(cand, r);
                    if cache.assignment[r] == slot {
                        cost.min(cache.second[r]) - cache.best[r]
                    } else {
                        cost.min(cache.best[r]) - cache.best[r]
                    }
                },
            );
        }

        let winner = state.winner();
        let gain = state.estimate[winner];
        if gain >= 0.0 || gain.is_nan() {
            break;
        }

        let (cand, slot) = (winner / k, winner % k);
        debug!(slot, cand, gain, "applying swap");
        medoids[slot] = cand;
        *cache = NearestCache::compute(&ctx.data, ctx.loss, medoids);
        cache.debug_validate(&ctx.data, ctx.loss, medoids);
        steps += 1;
        log.swap_loss(cache.total_loss());
    }

    steps
}
