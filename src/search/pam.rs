//! Exact BUILD and naive SWAP.
//!
//! BUILD greedily appends the candidate whose addition most reduces the mean
//! nearest-medoid distance, evaluated over every point. Naive SWAP evaluates
//! the exact gain of every (slot, candidate) replacement each iteration and
//! applies the best strictly-improving one. Both are O(n^2) per round and
//! serve as the reference the accelerated strategies are checked against.

use super::FitContext;
use crate::cache::NearestCache;
use crate::logging::FitLog;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Greedy exact BUILD: k rounds, each appending the argmin of the mean
/// improvement over all points. Ties break toward the smaller index.
pub(crate) fn build_exact(ctx: &FitContext<'_>, n_medoids: usize) -> (Vec<usize>, NearestCache) {
    let n = ctx.n();
    let mut medoids: Vec<usize> = Vec::with_capacity(n_medoids);
    let mut cache = NearestCache::empty(n);

    for round in 0..n_medoids {
        let use_absolute = medoids.is_empty();
        let score = |a: usize| -> f64 {
            if medoids.contains(&a) {
                return f64::INFINITY;
            }
            let mut total = 0.0;
            for x in 0..n {
                let cost = ctx.d(a, x);
                total += if use_absolute {
                    cost
                } else {
                    cost.min(cache.best[x]) - cache.best[x]
                };
            }
            total / n as f64
        };

        #[cfg(feature = "parallel")]
        let scores: Vec<f64> = (0..n).into_par_iter().map(score).collect();

        #[cfg(not(feature = "parallel"))]
        let scores: Vec<f64> = (0..n).map(score).collect();

        let mut winner = 0;
        for (a, &s) in scores.iter().enumerate() {
            if s < scores[winner] {
                winner = a;
            }
        }

        cache.absorb(&ctx.data, ctx.loss, winner, round);
        medoids.push(winner);
        debug!(round, winner, "build medoid selected");
    }

    (medoids, cache)
}

/// Naive SWAP: exact gain of every (slot, candidate) pair per iteration,
/// applied while a strictly negative gain exists or until `max_iter`.
/// Returns the number of applied swaps.
pub(crate) fn swap_naive(
    ctx: &FitContext<'_>,
    medoids: &mut [usize],
    cache: &mut NearestCache,
    max_iter: usize,
    log: &mut dyn FitLog,
) -> usize {
    let n = ctx.n();
    let k = medoids.len();
    let mut steps = 0;

    while steps < max_iter {
        // Best slot for each candidate; the gain of pair (slot, cand) is the
        // summed per-point reassignment delta.
        let eval = |cand: usize| -> (f64, usize) {
            if medoids.contains(&cand) {
                return (f64::INFINITY, 0);
            }
            let mut gains = vec![0.0; k];
            for x in 0..n {
                let cost = ctx.d(cand, x);
                for (slot, gain) in gains.iter_mut().enumerate() {
                    *gain += if cache.assignment[x] == slot {
                        cost.min(cache.second[x]) - cache.best[x]
                    } else {
                        cost.min(cache.best[x]) - cache.best[x]
                    };
                }
            }
            let mut best_slot = 0;
            for slot in 1..k {
                if gains[slot] < gains[best_slot] {
                    best_slot = slot;
                }
            }
            (gains[best_slot], best_slot)
        };

        #[cfg(feature = "parallel")]
        let evaluated: Vec<(f64, usize)> = (0..n).into_par_iter().map(eval).collect();

        #[cfg(not(feature = "parallel"))]
        let evaluated: Vec<(f64, usize)> = (0..n).map(eval).collect();

        let mut best_cand = 0;
        for cand in 1..n {
            if evaluated[cand].0 < evaluated[best_cand].0 {
                best_cand = cand;
            }
        }
        let (gain, slot) = evaluated[best_cand];

        if gain >= 0.0 || gain.is_nan() {
            break;
        }

        debug!(slot, cand = best_cand, gain, "applying swap");
        medoids[slot] = best_cand;
        *cache = NearestCache::compute(&ctx.data, ctx.loss, medoids);
        cache.debug_validate(&ctx.data, ctx.loss, medoids);
        steps += 1;
        log.swap_loss(cache.total_loss());
    }

    steps
}
