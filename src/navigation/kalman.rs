use log::debug;
use nalgebra::{linalg::Cholesky, DMatrix, DVector};

use crate::error::Error;

/// Symmetric positive definite inversion
pub(crate) fn spd_inverse(m: &DMatrix<f64>) -> Result<DMatrix<f64>, Error> {
    Cholesky::new(m.clone())
        .map(|c| c.inverse())
        .ok_or(Error::MatrixInversion)
}

#[derive(Debug, Clone, PartialEq)]
pub struct KfEstimate {
    /// P Matrix
    pub p: DMatrix<f64>,

    /// x Vector
    pub x: DVector<f64>,
}

impl KfEstimate {
    /// Create a zero [KfEstimate] of said dimension
    pub fn zero(size: usize) -> Self {
        Self {
            x: DVector::zeros(size),
            p: DMatrix::zeros(size, size),
        }
    }

    /// Create new [KfEstimate]
    pub fn new(x: DVector<f64>, p: DMatrix<f64>) -> Self {
        Self { p, x }
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Information form [Kalman] filter, operating on dynamically sized
/// states since the unknowns change every epoch.
#[derive(Debug, Clone, Default)]
pub struct Kalman {
    /// True if this [Kalman] filter has been initialized
    pub initialized: bool,

    /// Latest committed [KfEstimate]
    estimate: Option<KfEstimate>,
}

impl Kalman {
    /// Create a new [Kalman] filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest committed [KfEstimate]
    pub fn estimate(&self) -> Option<&KfEstimate> {
        self.estimate.as_ref()
    }

    /// Reset this [Kalman] filter
    pub fn reset(&mut self) {
        self.initialized = false;
        self.estimate = None;
    }

    /// Install a new [KfEstimate]
    pub fn commit(&mut self, estimate: KfEstimate) {
        self.estimate = Some(estimate);
        self.initialized = true;
    }

    /// Time update
    /// ## Input
    /// - apriori: [KfEstimate] expressed in the current state layout
    /// - phi: state transition
    /// - q: process noise
    pub fn predict(
        apriori: &KfEstimate,
        phi: &DMatrix<f64>,
        q: &DMatrix<f64>,
    ) -> Result<KfEstimate, Error> {
        let n = apriori.len();
        if phi.shape() != (n, n) || q.shape() != (n, n) || apriori.p.shape() != (n, n) {
            return Err(Error::MatrixDimension);
        }

        let x = phi * &apriori.x;
        let p = phi * &apriori.p * phi.transpose() + q;
        Ok(KfEstimate { x, p })
    }

    /// Measurement update
    /// ## Input
    /// - prediction: predicted [KfEstimate]
    /// - h: design matrix
    /// - r: weight matrix
    /// - y: prefit residuals
    pub fn correct(
        prediction: &KfEstimate,
        h: &DMatrix<f64>,
        r: &DMatrix<f64>,
        y: &DVector<f64>,
    ) -> Result<KfEstimate, Error> {
        let (m, n) = h.shape();
        if n != prediction.len() || r.shape() != (m, m) || y.nrows() != m {
            return Err(Error::MatrixDimension);
        }

        let ht = h.transpose();
        let p_inv = spd_inverse(&prediction.p)?;

        let ht_r = &ht * r;
        let p = spd_inverse(&(&ht_r * h + &p_inv))?;
        let x = &p * (&ht_r * y + &p_inv * &prediction.x);

        Ok(KfEstimate { x, p })
    }

    /// Runs a complete iteration of this [Kalman] filter.
    /// Nothing is committed.
    pub fn run(
        apriori: &KfEstimate,
        phi: &DMatrix<f64>,
        q: &DMatrix<f64>,
        h: &DMatrix<f64>,
        r: &DMatrix<f64>,
        y: &DVector<f64>,
    ) -> Result<KfEstimate, Error> {
        let prediction = Self::predict(apriori, phi, q)?;
        let estimate = Self::correct(&prediction, h, r, y)?;
        debug!("kalman - x={}", estimate.x.transpose());
        Ok(estimate)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_state() {
        // two measurements of the same quantity
        let apriori = KfEstimate::new(DVector::from_row_slice(&[0.0]), DMatrix::from_element(1, 1, 1.0E12));
        let phi = DMatrix::identity(1, 1);
        let q = DMatrix::zeros(1, 1);
        let h = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let r = DMatrix::from_diagonal(&DVector::from_row_slice(&[1.0, 1.0]));
        let y = DVector::from_row_slice(&[1.0, 3.0]);

        let estimate = Kalman::run(&apriori, &phi, &q, &h, &r, &y).unwrap();
        assert!((estimate.x[0] - 2.0).abs() < 1.0E-6);
        assert!((estimate.p[(0, 0)] - 0.5).abs() < 1.0E-6);
    }

    #[test]
    fn white_noise_forgets() {
        let apriori = KfEstimate::new(DVector::from_row_slice(&[10.0]), DMatrix::from_element(1, 1, 1.0E-4));
        let phi = DMatrix::zeros(1, 1);
        let q = DMatrix::from_element(1, 1, 100.0);

        let prediction = Kalman::predict(&apriori, &phi, &q).unwrap();
        assert_eq!(prediction.x[0], 0.0);
        assert_eq!(prediction.p[(0, 0)], 100.0);
    }

    #[test]
    fn dimension_errors() {
        let apriori = KfEstimate::zero(2);
        let phi = DMatrix::identity(3, 3);
        let q = DMatrix::zeros(2, 2);
        assert_eq!(Kalman::predict(&apriori, &phi, &q), Err(Error::MatrixDimension));

        // singular covariance
        let phi = DMatrix::identity(2, 2);
        let h = DMatrix::identity(2, 2);
        let r = DMatrix::identity(2, 2);
        let y = DVector::zeros(2);
        assert_eq!(
            Kalman::run(&apriori, &phi, &q, &h, &r, &y),
            Err(Error::MatrixInversion)
        );
    }
}
