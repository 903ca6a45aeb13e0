//! Medoid search strategies and the driver that dispatches between them.
//!
//! All three strategies share the BUILD + SWAP structure of partitioning
//! around medoids:
//!
//! - **naive**: exact greedy BUILD, then exact evaluation of every
//!   (medoid, candidate) swap per iteration.
//! - **FastPAM1**: the same exact semantics, with the swap gain of all k
//!   slots produced by a single pass per candidate.
//! - **BanditPAM**: BUILD and SWAP both run as multi-armed bandits over
//!   sampled reference batches, eliminating candidates whose confidence
//!   interval is dominated.
//!
//! The strategy is a tagged enum; the driver matches on it once per fit.

mod bandit;
mod fastpam1;
mod pam;

use crate::error::{Error, Result};
use crate::logging::{FileLog, FitLog, NoopLog};
use crate::loss::Loss;
use crate::sigma::DEFAULT_BATCH_SIZE;
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::str::FromStr;
use tracing::{debug, warn};

/// Search strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// Exact PAM with naive swap evaluation.
    Naive,
    /// Exact PAM with the delta-TD swap decomposition.
    FastPam1,
    /// Bandit-accelerated BUILD and SWAP.
    #[default]
    BanditPam,
}

impl Algorithm {
    /// Canonical name, as accepted by [`Algorithm::from_str`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Naive => "naive",
            Algorithm::FastPam1 => "FastPAM1",
            Algorithm::BanditPam => "BanditPAM",
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "naive" => Ok(Algorithm::Naive),
            "FastPAM1" => Ok(Algorithm::FastPam1),
            "BanditPAM" => Ok(Algorithm::BanditPam),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only fit state shared by the strategies: the borrowed dataset and the
/// selected kernel.
pub(crate) struct FitContext<'a> {
    pub data: ArrayView2<'a, f64>,
    pub loss: Loss,
}

impl FitContext<'_> {
    /// Kernel value between columns `i` and `j`.
    #[inline]
    pub fn d(&self, i: usize, j: usize) -> f64 {
        self.loss.measure(&self.data, i, j)
    }

    /// Number of points.
    pub fn n(&self) -> usize {
        self.data.ncols()
    }
}

/// Confidence-bound constants for the bandit strategy.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BanditParams {
    pub build_confidence: usize,
    pub swap_confidence: usize,
    pub batch_size: usize,
}

/// k-medoids driver.
///
/// Holds the configuration, dispatches [`KMedoids::fit`] to the selected
/// strategy, and retains the fit results for the getters.
///
/// ```rust
/// use kmedoids::{Algorithm, KMedoids};
/// use ndarray::array;
///
/// let data = array![[0.0, 1.0, 2.0, 10.0]];
/// let mut model = KMedoids::new(1).with_algorithm(Algorithm::Naive);
/// model.fit(data.view(), "L2").unwrap();
/// assert_eq!(model.medoids_final(), &[1]);
/// ```
#[derive(Debug)]
pub struct KMedoids {
    n_medoids: usize,
    algorithm: Algorithm,
    max_iter: usize,
    build_confidence: usize,
    swap_confidence: usize,
    verbosity: usize,
    log_filename: String,
    seed: Option<u64>,

    medoids_build: Vec<usize>,
    medoids_final: Vec<usize>,
    labels: Vec<usize>,
    steps: usize,
    final_loss: f64,
}

impl KMedoids {
    /// Create a driver that will select `n_medoids` medoids with the default
    /// strategy (BanditPAM).
    pub fn new(n_medoids: usize) -> Self {
        Self {
            n_medoids,
            algorithm: Algorithm::default(),
            max_iter: 1000,
            build_confidence: 1000,
            swap_confidence: 10_000,
            verbosity: 0,
            log_filename: "KMedoidsLogfile".to_string(),
            seed: None,

            medoids_build: Vec::new(),
            medoids_final: Vec::new(),
            labels: Vec::new(),
            steps: 0,
            final_loss: f64::NAN,
        }
    }

    /// Select the search strategy.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Cap the number of SWAP iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Multiplier inside the BUILD confidence radius.
    pub fn with_build_confidence(mut self, build_confidence: usize) -> Self {
        self.build_confidence = build_confidence;
        self
    }

    /// Multiplier inside the SWAP confidence radius.
    pub fn with_swap_confidence(mut self, swap_confidence: usize) -> Self {
        self.swap_confidence = swap_confidence;
        self
    }

    /// Verbosity: 0 emits no log file, anything higher writes a profile to
    /// the configured log filename at the end of `fit`.
    pub fn with_verbosity(mut self, verbosity: usize) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Path of the profile file written when verbosity is nonzero.
    pub fn with_log_filename(mut self, log_filename: impl Into<String>) -> Self {
        self.log_filename = log_filename.into();
        self
    }

    /// Seed the PRNG for bit-reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of medoids to select.
    pub fn n_medoids(&self) -> usize {
        self.n_medoids
    }

    /// Change the number of medoids to select.
    pub fn set_n_medoids(&mut self, n_medoids: usize) {
        self.n_medoids = n_medoids;
    }

    /// The selected strategy.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Select the strategy by name; unknown names leave the driver unchanged.
    pub fn set_algorithm(&mut self, name: &str) -> Result<()> {
        self.algorithm = name.parse()?;
        Ok(())
    }

    /// The SWAP iteration cap.
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Change the SWAP iteration cap.
    pub fn set_max_iter(&mut self, max_iter: usize) {
        self.max_iter = max_iter;
    }

    /// The BUILD confidence multiplier.
    pub fn build_confidence(&self) -> usize {
        self.build_confidence
    }

    /// Change the BUILD confidence multiplier.
    pub fn set_build_confidence(&mut self, build_confidence: usize) {
        self.build_confidence = build_confidence;
    }

    /// The SWAP confidence multiplier.
    pub fn swap_confidence(&self) -> usize {
        self.swap_confidence
    }

    /// Change the SWAP confidence multiplier.
    pub fn set_swap_confidence(&mut self, swap_confidence: usize) {
        self.swap_confidence = swap_confidence;
    }

    /// Current verbosity.
    pub fn verbosity(&self) -> usize {
        self.verbosity
    }

    /// Change the verbosity.
    pub fn set_verbosity(&mut self, verbosity: usize) {
        self.verbosity = verbosity;
    }

    /// The configured log filename.
    pub fn log_filename(&self) -> &str {
        &self.log_filename
    }

    /// Change the log filename.
    pub fn set_log_filename(&mut self, log_filename: impl Into<String>) {
        self.log_filename = log_filename.into();
    }

    /// Medoid indices at the end of BUILD.
    pub fn medoids_build(&self) -> &[usize] {
        &self.medoids_build
    }

    /// Medoid indices at the end of SWAP.
    pub fn medoids_final(&self) -> &[usize] {
        &self.medoids_final
    }

    /// Slot index of the nearest final medoid, one entry per point.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of swaps applied during the last fit.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Total loss of the final medoid set.
    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }

    /// Find medoids for `data` under the named loss.
    ///
    /// `data` is a `d x n` matrix with one point per column, borrowed
    /// read-only for the duration of the call. On configuration or data
    /// errors the driver's recorded results are left untouched.
    pub fn fit(&mut self, data: ArrayView2<'_, f64>, loss: &str) -> Result<()> {
        let loss: Loss = loss.parse()?;
        let n = data.ncols();

        if n == 0 || data.nrows() == 0 {
            return Err(Error::EmptyInput);
        }
        if self.n_medoids == 0 || self.n_medoids > n {
            return Err(Error::InvalidClusterCount {
                requested: self.n_medoids,
                n_items: n,
            });
        }
        for ((row, col), &value) in data.indexed_iter() {
            if !value.is_finite() {
                return Err(Error::NonFiniteInput { row, col });
            }
        }

        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };
        let mut log: Box<dyn FitLog> = if self.verbosity > 0 {
            Box::new(FileLog::new(&self.log_filename))
        } else {
            Box::new(NoopLog)
        };

        let ctx = FitContext { data, loss };
        let params = BanditParams {
            build_confidence: self.build_confidence,
            swap_confidence: self.swap_confidence,
            batch_size: DEFAULT_BATCH_SIZE,
        };

        let (mut medoids, mut cache) = match self.algorithm {
            Algorithm::Naive | Algorithm::FastPam1 => pam::build_exact(&ctx, self.n_medoids),
            Algorithm::BanditPam => {
                bandit::build(&ctx, self.n_medoids, &params, &mut *rng, &mut *log)
            }
        };
        let medoids_build = medoids.clone();
        debug!(algorithm = %self.algorithm, medoids = ?medoids_build, "build complete");

        let steps = match self.algorithm {
            Algorithm::Naive => {
                pam::swap_naive(&ctx, &mut medoids, &mut cache, self.max_iter, &mut *log)
            }
            Algorithm::FastPam1 => {
                fastpam1::swap(&ctx, &mut medoids, &mut cache, self.max_iter, &mut *log)
            }
            Algorithm::BanditPam => bandit::swap(
                &ctx,
                &mut medoids,
                &mut cache,
                &params,
                self.max_iter,
                &mut *rng,
                &mut *log,
            ),
        };
        debug!(medoids = ?medoids, steps, "swap complete");

        cache.debug_validate(&ctx.data, ctx.loss, &medoids);

        self.final_loss = cache.total_loss();
        self.labels = cache.assignment.clone();
        self.steps = steps;
        self.medoids_build = medoids_build;
        self.medoids_final = medoids;

        if self.verbosity > 0 {
            if let Err(e) = log.write_profile(
                &self.medoids_build,
                &self.medoids_final,
                self.steps,
                self.final_loss,
            ) {
                warn!(error = %e, path = %self.log_filename, "failed to write fit log");
            }
        }

        Ok(())
    }
}
