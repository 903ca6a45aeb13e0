//! Cross-algorithm agreement and end-to-end invariants.

use kmedoids::{Algorithm, KMedoids, Loss};
use ndarray::Array2;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Gaussian blobs around well-separated centers, one point per column.
fn blobs(centers: &[(f64, f64)], per_cluster: usize, spread: f64, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, spread).unwrap();
    let n = centers.len() * per_cluster;
    let mut data = Array2::zeros((2, n));
    for (c, &(cx, cy)) in centers.iter().enumerate() {
        for j in 0..per_cluster {
            let col = c * per_cluster + j;
            data[[0, col]] = cx + normal.sample(&mut rng);
            data[[1, col]] = cy + normal.sample(&mut rng);
        }
    }
    data
}

fn fit(data: &Array2<f64>, k: usize, alg: Algorithm, seed: u64) -> KMedoids {
    let mut model = KMedoids::new(k).with_algorithm(alg).with_seed(seed);
    model.fit(data.view(), "L2").unwrap();
    model
}

#[test]
fn two_obvious_clusters_partition_correctly() {
    // Columns: (0,0), (0,1), (1,0), (10,10), (10,11), (11,10).
    let data = ndarray::array![
        [0.0, 0.0, 1.0, 10.0, 10.0, 11.0],
        [0.0, 1.0, 0.0, 10.0, 11.0, 10.0]
    ];

    for alg in [Algorithm::Naive, Algorithm::FastPam1, Algorithm::BanditPam] {
        let mut model = KMedoids::new(2).with_algorithm(alg).with_seed(0);
        model.fit(data.view(), "L2").unwrap();

        let labels = model.labels();
        assert_eq!(labels[0], labels[1], "{alg}");
        assert_eq!(labels[1], labels[2], "{alg}");
        assert_eq!(labels[3], labels[4], "{alg}");
        assert_eq!(labels[4], labels[5], "{alg}");
        assert_ne!(labels[0], labels[3], "{alg}");

        let medoids = model.medoids_final();
        assert!(medoids.iter().any(|&m| m < 3), "{alg}: {medoids:?}");
        assert!(medoids.iter().any(|&m| m >= 3), "{alg}: {medoids:?}");
    }
}

#[test]
fn naive_and_fastpam1_agree_exactly() {
    for seed in 0..5u64 {
        let data = blobs(&[(0.0, 0.0), (8.0, 3.0), (2.0, 9.0)], 20, 1.5, seed);
        for k in [2, 3, 5] {
            let naive = fit(&data, k, Algorithm::Naive, seed);
            let fast = fit(&data, k, Algorithm::FastPam1, seed);

            assert_eq!(
                naive.medoids_final(),
                fast.medoids_final(),
                "seed {seed}, k {k}"
            );
            assert_eq!(naive.labels(), fast.labels(), "seed {seed}, k {k}");
            assert!((naive.final_loss() - fast.final_loss()).abs() < 1e-9);
        }
    }
}

#[test]
fn banditpam_loss_close_to_exact_pam() {
    let mut worst_ratio: f64 = 0.0;
    for seed in 0..10u64 {
        let data = blobs(&[(0.0, 0.0), (12.0, 0.0), (6.0, 10.0)], 60, 1.0, seed);

        let exact = fit(&data, 3, Algorithm::Naive, seed);
        let bandit = fit(&data, 3, Algorithm::BanditPam, seed);

        let ratio = bandit.final_loss() / exact.final_loss();
        worst_ratio = worst_ratio.max(ratio);
    }
    assert!(
        worst_ratio < 1.01,
        "bandit loss exceeded exact by {:.3}%",
        (worst_ratio - 1.0) * 100.0
    );
}

#[test]
fn swap_never_worsens_build() {
    for alg in [Algorithm::Naive, Algorithm::FastPam1, Algorithm::BanditPam] {
        let data = blobs(&[(0.0, 0.0), (6.0, 6.0)], 40, 2.0, 42);
        let model = fit(&data, 2, alg, 42);

        let build_loss = Loss::Lp(2).total(&data.view(), model.medoids_build());
        assert!(
            model.final_loss() <= build_loss + 1e-9,
            "{alg}: {} > {}",
            model.final_loss(),
            build_loss
        );
    }
}

#[test]
fn manhattan_loss_name_variants_agree() {
    let data = blobs(&[(0.0, 0.0), (9.0, 9.0)], 15, 1.0, 3);

    let mut a = KMedoids::new(2).with_algorithm(Algorithm::Naive).with_seed(3);
    a.fit(data.view(), "manhattan").unwrap();
    let mut b = KMedoids::new(2).with_algorithm(Algorithm::Naive).with_seed(3);
    b.fit(data.view(), "L1").unwrap();
    let mut c = KMedoids::new(2).with_algorithm(Algorithm::Naive).with_seed(3);
    c.fit(data.view(), "1").unwrap();

    assert_eq!(a.medoids_final(), b.medoids_final());
    assert_eq!(b.medoids_final(), c.medoids_final());
}

#[test]
fn refit_reuses_driver_cleanly() {
    let data1 = blobs(&[(0.0, 0.0), (10.0, 10.0)], 20, 1.0, 1);
    let data2 = blobs(&[(0.0, 0.0), (10.0, 10.0), (20.0, 0.0)], 20, 1.0, 2);

    let mut model = KMedoids::new(2).with_seed(9);
    model.fit(data1.view(), "L2").unwrap();
    assert_eq!(model.labels().len(), 40);

    model.set_n_medoids(3);
    model.fit(data2.view(), "L2").unwrap();
    assert_eq!(model.medoids_final().len(), 3);
    assert_eq!(model.labels().len(), 60);
}

fn assert_fit_invariants(model: &KMedoids, data: &Array2<f64>, k: usize) {
    let n = data.ncols();
    let medoids = model.medoids_final();

    assert_eq!(medoids.len(), k);
    let mut sorted = medoids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), k, "medoids not distinct: {medoids:?}");
    assert!(medoids.iter().all(|&m| m < n));

    let labels = model.labels();
    assert_eq!(labels.len(), n);
    let v = data.view();
    for x in 0..n {
        let d_assigned = Loss::Lp(2).measure(&v, medoids[labels[x]], x);
        for &m in medoids {
            assert!(
                d_assigned <= Loss::Lp(2).measure(&v, m, x) + 1e-12,
                "label of point {x} is not its nearest medoid"
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Final medoids are k distinct in-range indices and every label points
    /// at the point's nearest medoid, for all three algorithms.
    #[test]
    fn fit_invariants_hold(
        n in 4usize..40,
        d in 1usize..4,
        k in 1usize..4,
        seed in any::<u64>(),
    ) {
        prop_assume!(k <= n);

        let mut rng = StdRng::seed_from_u64(seed);
        let data = Array2::from_shape_fn((d, n), |_| rng.random_range(-50.0..50.0));

        for alg in [Algorithm::Naive, Algorithm::FastPam1, Algorithm::BanditPam] {
            let mut model = KMedoids::new(k).with_algorithm(alg).with_seed(seed);
            model.fit(data.view(), "L2").unwrap();
            assert_fit_invariants(&model, &data, k);
        }
    }

    /// Fitting twice with the same seed reproduces medoids, labels, and steps.
    #[test]
    fn seeded_fit_is_reproducible(
        n in 4usize..30,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = Array2::from_shape_fn((2, n), |_| rng.random_range(-10.0..10.0));

        let mut a = KMedoids::new(2).with_seed(seed);
        let mut b = KMedoids::new(2).with_seed(seed);
        a.fit(data.view(), "L2").unwrap();
        b.fit(data.view(), "L2").unwrap();

        prop_assert_eq!(a.medoids_final(), b.medoids_final());
        prop_assert_eq!(a.labels(), b.labels());
        prop_assert_eq!(a.steps(), b.steps());
    }
}
