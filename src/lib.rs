//! # kmedoids
//!
//! k-medoids clustering of a finite dataset under a user-chosen dissimilarity.
//!
//! Given `n` points (one per column of a `d x n` matrix) and a target cluster
//! count `k`, the engine returns `k` dataset indices (the medoids) that
//! approximately minimize the sum over all points of the dissimilarity to the
//! nearest medoid, plus the assignment of each point to its nearest medoid.
//!
//! Three search strategies share one driver:
//!
//! - **naive**: the classic PAM BUILD + SWAP, exact, O(k n^2) per swap pass.
//! - **FastPAM1**: exact PAM with the delta-TD decomposition, producing the
//!   gain of every (medoid, candidate) swap in one O(n) pass per candidate.
//! - **BanditPAM**: a randomized multi-armed-bandit scheme that estimates arm
//!   rewards from sampled reference batches and eliminates losers with
//!   confidence bounds, matching exact PAM with high probability at a
//!   fraction of the distance evaluations.
//!
//! ## Usage
//!
//! ```rust
//! use kmedoids::KMedoids;
//! use ndarray::array;
//!
//! // Columns are points: two clusters on a line.
//! let data = array![[0.0, 0.5, 1.0, 10.0, 10.5, 11.0]];
//!
//! let mut model = KMedoids::new(2).with_seed(42);
//! model.fit(data.view(), "L2").unwrap();
//!
//! let medoids = model.medoids_final();
//! assert_eq!(medoids.len(), 2);
//! let labels = model.labels();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[5]);
//! ```

pub mod cache;
pub mod error;
pub mod logging;
pub mod loss;
pub mod search;
pub mod sigma;

pub use error::{Error, Result};
pub use loss::Loss;
pub use search::{Algorithm, KMedoids};
pub use sigma::SigmaSummary;
