use nalgebra::{DMatrix, DVector};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    navigation::{Kalman, KfEstimate},
    tests::init_logger,
};

/// Random linear system: (H, W, y)
fn random_batch(rng: &mut SmallRng, m: usize, n: usize) -> (DMatrix<f64>, DMatrix<f64>, DVector<f64>) {
    let h = DMatrix::<f64>::from_fn(m, n, |_, _| rng.random_range(-1.0..1.0));
    let w = DMatrix::<f64>::from_diagonal(&DVector::from_fn(m, |_, _| rng.random_range(0.5..2.0)));
    let y = DVector::<f64>::from_fn(m, |_, _| rng.random_range(-10.0..10.0));
    (h, w, y)
}

#[test]
fn static_filter_matches_batch_least_squares() {
    init_logger();

    let mut rng = SmallRng::seed_from_u64(0x5EED);
    let (n, m, batches) = (4, 6, 3);

    let phi = DMatrix::<f64>::identity(n, n);
    let q = DMatrix::<f64>::zeros(n, n);

    let mut estimate = KfEstimate::new(
        DVector::zeros(n),
        DMatrix::<f64>::identity(n, n) * 1.0E12,
    );

    let mut normal = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);

    for _ in 0..batches {
        let (h, w, y) = random_batch(&mut rng, m, n);

        estimate = Kalman::run(&estimate, &phi, &q, &h, &w, &y).unwrap();

        normal += h.transpose() * &w * &h;
        rhs += h.transpose() * &w * &y;
    }

    let p_wls = normal.try_inverse().unwrap();
    let x_wls = &p_wls * rhs;

    for i in 0..n {
        let err = (estimate.x[i] - x_wls[i]).abs();
        assert!(err < 1.0E-6, "x[{}]: kf={} wls={}", i, estimate.x[i], x_wls[i]);
        for j in 0..n {
            let err = (estimate.p[(i, j)] - p_wls[(i, j)]).abs();
            assert!(err < 1.0E-6, "P[{},{}]: kf={} wls={}", i, j, estimate.p[(i, j)], p_wls[(i, j)]);
        }
    }
}

#[test]
fn sequential_equals_single_update() {
    let mut rng = SmallRng::seed_from_u64(42);
    let n = 3;

    let (h1, w1, y1) = random_batch(&mut rng, 5, n);
    let (h2, w2, y2) = random_batch(&mut rng, 5, n);

    let apriori = KfEstimate::new(
        DVector::from_row_slice(&[1.0, -2.0, 0.5]),
        DMatrix::<f64>::identity(n, n) * 10.0,
    );

    let first = Kalman::correct(&apriori, &h1, &w1, &y1).unwrap();
    let sequential = Kalman::correct(&first, &h2, &w2, &y2).unwrap();

    let mut h = DMatrix::<f64>::zeros(10, n);
    h.view_mut((0, 0), (5, n)).copy_from(&h1);
    h.view_mut((5, 0), (5, n)).copy_from(&h2);

    let mut w = DMatrix::<f64>::zeros(10, 10);
    w.view_mut((0, 0), (5, 5)).copy_from(&w1);
    w.view_mut((5, 5), (5, 5)).copy_from(&w2);

    let mut y = DVector::<f64>::zeros(10);
    y.rows_mut(0, 5).copy_from(&y1);
    y.rows_mut(5, 5).copy_from(&y2);

    let single = Kalman::correct(&apriori, &h, &w, &y).unwrap();

    assert!((sequential.x - single.x).norm() < 1.0E-9);
    assert!((sequential.p - single.p).norm() < 1.0E-9);
}
