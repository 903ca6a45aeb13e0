//! Dissimilarity kernels over dataset columns.
//!
//! The dataset is a `d x n` matrix with one point per column; a kernel is a
//! pure function of two column indices. The kernel is selected once per fit
//! and then called in the innermost loops, so dispatch is a tagged enum
//! matched at function entry rather than a trait object.
//!
//! Note that `cos` is the cosine *similarity*, not a distance; it is exposed
//! because callers sometimes want it, and the engine consumes whatever the
//! kernel returns without sign-flipping.

use crate::error::{Error, Result};
use ndarray::ArrayView2;
use std::str::FromStr;

/// A dissimilarity kernel, selected by name at fit time.
///
/// Recognized names: `"manhattan"`, `"cos"`, `"inf"`, `"L<p>"` or a bare
/// integer string for the L_p norm with integer `p >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Loss {
    /// L_p norm with integer `p >= 1`.
    Lp(u32),
    /// Sum of absolute coordinate differences (same as `Lp(1)`).
    Manhattan,
    /// Maximum absolute coordinate difference.
    LInf,
    /// Cosine similarity of the two columns.
    Cosine,
}

impl Loss {
    /// Evaluate the kernel between columns `i` and `j` of `data`.
    #[inline]
    pub fn measure(&self, data: &ArrayView2<'_, f64>, i: usize, j: usize) -> f64 {
        let a = data.column(i);
        let b = data.column(j);
        match *self {
            Loss::Lp(1) | Loss::Manhattan => {
                a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
            }
            Loss::Lp(2) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            Loss::Lp(p) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).abs().powi(p as i32))
                .sum::<f64>()
                .powf(1.0 / p as f64),
            Loss::LInf => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).abs())
                .fold(0.0, f64::max),
            Loss::Cosine => {
                let mut dot = 0.0;
                let mut na = 0.0;
                let mut nb = 0.0;
                for (x, y) in a.iter().zip(b.iter()) {
                    dot += x * y;
                    na += x * x;
                    nb += y * y;
                }
                dot / (na.sqrt() * nb.sqrt())
            }
        }
    }

    /// Total loss of a medoid set: sum over points of the smallest kernel
    /// value to any medoid.
    pub fn total(&self, data: &ArrayView2<'_, f64>, medoids: &[usize]) -> f64 {
        let n = data.ncols();
        (0..n)
            .map(|x| {
                medoids
                    .iter()
                    .map(|&m| self.measure(data, m, x))
                    .fold(f64::INFINITY, f64::min)
            })
            .sum()
    }
}

impl FromStr for Loss {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manhattan" => return Ok(Loss::Manhattan),
            "cos" => return Ok(Loss::Cosine),
            "inf" => return Ok(Loss::LInf),
            _ => {}
        }
        // "L2", "L02", and bare "2" all select the L_2 norm.
        let digits = s.strip_prefix('L').unwrap_or(s);
        match digits.parse::<u32>() {
            Ok(p) if p >= 1 => Ok(Loss::Lp(p)),
            _ => Err(Error::UnknownLoss(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn parses_named_losses() {
        assert_eq!("manhattan".parse::<Loss>().unwrap(), Loss::Manhattan);
        assert_eq!("cos".parse::<Loss>().unwrap(), Loss::Cosine);
        assert_eq!("inf".parse::<Loss>().unwrap(), Loss::LInf);
    }

    #[test]
    fn parses_lp_spellings() {
        assert_eq!("L2".parse::<Loss>().unwrap(), Loss::Lp(2));
        assert_eq!("2".parse::<Loss>().unwrap(), Loss::Lp(2));
        assert_eq!("L02".parse::<Loss>().unwrap(), Loss::Lp(2));
        assert_eq!("L10".parse::<Loss>().unwrap(), Loss::Lp(10));
    }

    #[test]
    fn rejects_malformed_names() {
        assert!("L".parse::<Loss>().is_err());
        assert!("Lfoo".parse::<Loss>().is_err());
        assert!("".parse::<Loss>().is_err());
        assert!("L0".parse::<Loss>().is_err());
        assert!("euclidean".parse::<Loss>().is_err());
    }

    #[test]
    fn l2_distance() {
        let data = array![[0.0, 3.0], [0.0, 4.0]];
        let v = data.view();
        let d = Loss::Lp(2).measure(&v, 0, 1);
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn manhattan_matches_l1() {
        let data = array![[0.0, 3.0], [0.0, -4.0]];
        let v = data.view();
        assert_eq!(
            Loss::Manhattan.measure(&v, 0, 1),
            Loss::Lp(1).measure(&v, 0, 1)
        );
        assert!((Loss::Manhattan.measure(&v, 0, 1) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn linf_takes_max_coordinate() {
        let data = array![[0.0, 3.0], [0.0, -4.0]];
        let v = data.view();
        assert!((Loss::LInf.measure(&v, 0, 1) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_is_a_similarity() {
        let data = array![[1.0, 2.0], [0.0, 0.0]];
        let v = data.view();
        // Parallel vectors: similarity 1, not distance 0.
        assert!((Loss::Cosine.measure(&v, 0, 1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn total_sums_nearest_medoid_distances() {
        let data = array![[0.0, 1.0, 2.0, 10.0]];
        let v = data.view();
        let total = Loss::Lp(2).total(&v, &[1]);
        assert!((total - 11.0).abs() < 1e-12);
    }
}
