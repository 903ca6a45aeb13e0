//! Nearest-medoid bookkeeping.
//!
//! For the current medoid set, every point carries three values: the distance
//! to its nearest medoid, the distance to its second-nearest medoid, and the
//! slot index of the nearest medoid. Swap gain can be evaluated from these
//! three arrays alone, without touching the rest of the medoid set.

use crate::loss::Loss;
use ndarray::ArrayView2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Per-point distances to the nearest and second-nearest medoid.
///
/// Invariants, restored at every step boundary:
/// - `best[x] <= second[x]`
/// - `best[x]` is the distance from `x` to `medoids[assignment[x]]`
/// - `second[x]` is the smallest distance over the remaining slots
/// - `second[x]` is infinite while fewer than two medoids exist
#[derive(Debug, Clone)]
pub struct NearestCache {
    /// Distance from each point to its nearest medoid.
    pub best: Vec<f64>,
    /// Distance from each point to its second-nearest medoid.
    pub second: Vec<f64>,
    /// Slot index (into the medoid set) of each point's nearest medoid.
    pub assignment: Vec<usize>,
}

impl NearestCache {
    /// Cache for an empty medoid set: all distances infinite, assignments
    /// pointing at no slot.
    pub fn empty(n: usize) -> Self {
        Self {
            best: vec![f64::INFINITY; n],
            second: vec![f64::INFINITY; n],
            assignment: vec![usize::MAX; n],
        }
    }

    /// Full recompute against a medoid set. Ties break toward the smaller
    /// slot index.
    pub fn compute(data: &ArrayView2<'_, f64>, loss: Loss, medoids: &[usize]) -> Self {
        let n = data.ncols();

        let scan = |x: usize| -> (f64, f64, usize) {
            let mut best = f64::INFINITY;
            let mut second = f64::INFINITY;
            let mut slot = usize::MAX;
            for (k, &m) in medoids.iter().enumerate() {
                let cost = loss.measure(data, m, x);
                if cost < best {
                    second = best;
                    best = cost;
                    slot = k;
                } else if cost < second {
                    second = cost;
                }
            }
            (best, second, slot)
        };

        #[cfg(feature = "parallel")]
        let scanned: Vec<(f64, f64, usize)> = (0..n).into_par_iter().map(scan).collect();

        #[cfg(not(feature = "parallel"))]
        let scanned: Vec<(f64, f64, usize)> = (0..n).map(scan).collect();

        let mut cache = Self::empty(n);
        for (x, (best, second, slot)) in scanned.into_iter().enumerate() {
            cache.best[x] = best;
            cache.second[x] = second;
            cache.assignment[x] = slot;
        }
        cache
    }

    /// Incremental update for a medoid appended at `new_slot`: each point
    /// either defects to the new medoid or keeps its assignment, demoting
    /// `best` to `second` where appropriate.
    pub fn absorb(
        &mut self,
        data: &ArrayView2<'_, f64>,
        loss: Loss,
        new_medoid: usize,
        new_slot: usize,
    ) {
        let n = data.ncols();

        #[cfg(feature = "parallel")]
        let costs: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|x| loss.measure(data, new_medoid, x))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let costs: Vec<f64> = (0..n).map(|x| loss.measure(data, new_medoid, x)).collect();

        for (x, cost) in costs.into_iter().enumerate() {
            if cost < self.best[x] {
                self.second[x] = self.best[x];
                self.best[x] = cost;
                self.assignment[x] = new_slot;
            } else if cost < self.second[x] {
                self.second[x] = cost;
            }
        }
    }

    /// Sum of nearest-medoid distances over all points.
    pub fn total_loss(&self) -> f64 {
        self.best.iter().sum()
    }

    /// Number of points covered by the cache.
    pub fn len(&self) -> usize {
        self.best.len()
    }

    /// True when the cache covers no points.
    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }

    /// Debug-build check that the cache agrees with a from-scratch recompute.
    ///
    /// Violations are programmer errors, not user-facing conditions, so this
    /// compiles to nothing in release builds.
    pub fn debug_validate(&self, data: &ArrayView2<'_, f64>, loss: Loss, medoids: &[usize]) {
        if cfg!(debug_assertions) {
            let fresh = Self::compute(data, loss, medoids);
            for x in 0..self.len() {
                debug_assert!(
                    self.best[x] <= self.second[x],
                    "best[{x}] > second[{x}]"
                );
                debug_assert!(
                    close(self.best[x], fresh.best[x]),
                    "stale best[{x}]: {} vs {}",
                    self.best[x],
                    fresh.best[x]
                );
                debug_assert!(
                    close(self.second[x], fresh.second[x]),
                    "stale second[{x}]: {} vs {}",
                    self.second[x],
                    fresh.second[x]
                );
                debug_assert_eq!(
                    self.assignment[x], fresh.assignment[x],
                    "stale assignment[{x}]"
                );
            }
            let mut seen = medoids.to_vec();
            seen.sort_unstable();
            seen.dedup();
            debug_assert_eq!(seen.len(), medoids.len(), "duplicate medoid index");
        }
    }
}

fn close(a: f64, b: f64) -> bool {
    (a == b) || (a - b).abs() <= 1e-12 * a.abs().max(1.0) || (a.is_nan() && b.is_nan())
}
