//! Modified LAMBDA integer least squares search
use log::{debug, error};
use nalgebra::{DMatrix, DVector};

use crate::prelude::Error;

/// Maximal number of search loops
const MAX_SEARCH: usize = 10_000;

fn sgn(x: f64) -> f64 {
    if x <= 0.0 {
        -1.0
    } else {
        1.0
    }
}

fn round(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Integer least squares solutions
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaSolution {
    /// Candidates (n x m), best first
    pub f: DMatrix<f64>,
    /// Squared residual norm of each candidate, ascending
    pub s: DVector<f64>,
}

impl LambdaSolution {
    /// Best integer vector
    pub fn best(&self) -> DVector<f64> {
        self.f.column(0).into_owned()
    }

    /// s1/s0, capped to 999.9
    pub fn ratio(&self) -> Option<f64> {
        if self.s.len() < 2 || self.s[0] <= 0.0 {
            None
        } else {
            Some((self.s[1] / self.s[0]).min(999.9))
        }
    }
}

pub struct Lambda {}

impl Lambda {
    /// Q = Lᵀ diag(D) L factorization
    fn ld(q: &DMatrix<f64>) -> Result<(DMatrix<f64>, DVector<f64>), Error> {
        let n = q.nrows();
        let mut a = q.clone();
        let mut l_mat = DMatrix::<f64>::zeros(n, n);
        let mut d = DVector::<f64>::zeros(n);

        for i in (0..n).rev() {
            d[i] = a[(i, i)];
            if d[i] <= 0.0 {
                error!("lambda - LD factorization error");
                return Err(Error::AmbiguityFactorization);
            }
            let sqrt = d[i].sqrt();
            for j in 0..=i {
                l_mat[(i, j)] = a[(i, j)] / sqrt;
            }
            for j in 0..i {
                for k in 0..=j {
                    a[(j, k)] -= l_mat[(i, k)] * l_mat[(i, j)];
                }
            }
            let lii = l_mat[(i, i)];
            for j in 0..=i {
                l_mat[(i, j)] /= lii;
            }
        }

        Ok((l_mat, d))
    }

    /// Integer Gauss transformation
    fn gauss_transform(i: usize, j: usize, l_mat: &mut DMatrix<f64>, z_mat: &mut DMatrix<f64>) {
        let n = l_mat.nrows();
        let mu = round(l_mat[(i, j)]);

        if mu != 0.0 {
            for k in i..n {
                l_mat[(k, j)] -= mu * l_mat[(k, i)];
            }
            for k in 0..n {
                z_mat[(k, j)] -= mu * z_mat[(k, i)];
            }
        }
    }

    fn permutation(
        j: usize,
        delta: f64,
        l_mat: &mut DMatrix<f64>,
        d: &mut DVector<f64>,
        z_mat: &mut DMatrix<f64>,
    ) {
        let n = l_mat.nrows();
        let eta = d[j] / delta;
        let lambda = d[j + 1] * l_mat[(j + 1, j)] / delta;

        d[j] = eta * d[j + 1];
        d[j + 1] = delta;

        for k in 0..j {
            let (a0, a1) = (l_mat[(j, k)], l_mat[(j + 1, k)]);
            l_mat[(j, k)] = -l_mat[(j + 1, j)] * a0 + a1;
            l_mat[(j + 1, k)] = eta * a0 + lambda * a1;
        }

        l_mat[(j + 1, j)] = lambda;

        for k in (j + 2)..n {
            l_mat.swap((k, j), (k, j + 1));
        }
        z_mat.swap_columns(j, j + 1);
    }

    /// Decorrelation: z = Zᵀa, Qz = ZᵀQZ = Lᵀ diag(D) L
    fn reduction(l_mat: &mut DMatrix<f64>, d: &mut DVector<f64>, z_mat: &mut DMatrix<f64>) {
        let n = l_mat.nrows();
        if n < 2 {
            return;
        }

        let mut j = n as isize - 2;
        let mut k = n as isize - 2;

        while j >= 0 {
            let ju = j as usize;
            if j <= k {
                for i in (ju + 1)..n {
                    Self::gauss_transform(i, ju, l_mat, z_mat);
                }
            }

            let delta = d[ju] + l_mat[(ju + 1, ju)].powi(2) * d[ju + 1];

            if delta + 1.0E-6 < d[ju + 1] {
                Self::permutation(ju, delta, l_mat, d, z_mat);
                k = j;
                j = n as isize - 2;
            } else {
                j -= 1;
            }
        }
    }

    /// Search the `m` best integer vectors
    fn search(
        m: usize,
        l_mat: &DMatrix<f64>,
        d: &DVector<f64>,
        zs: &DVector<f64>,
    ) -> Result<(DMatrix<f64>, DVector<f64>), Error> {
        let n = l_mat.nrows();

        let mut zn = DMatrix::<f64>::zeros(n, m);
        let mut s = DVector::<f64>::zeros(m);

        let mut s_mat = DMatrix::<f64>::zeros(n, n);
        let mut dist = DVector::<f64>::zeros(n);
        let mut zb = DVector::<f64>::zeros(n);
        let mut z = DVector::<f64>::zeros(n);
        let mut step = DVector::<f64>::zeros(n);

        let (mut nn, mut imax) = (0, 0);
        let mut maxdist = 1.0E99;

        let mut k = n - 1;
        dist[k] = 0.0;
        zb[k] = zs[k];
        z[k] = round(zb[k]);
        let mut y = zb[k] - z[k];
        step[k] = sgn(y);

        let mut completed = false;

        for _ in 0..MAX_SEARCH {
            let newdist = dist[k] + y * y / d[k];
            if newdist < maxdist {
                if k != 0 {
                    // move down
                    k -= 1;
                    dist[k] = newdist;
                    for i in 0..=k {
                        s_mat[(k, i)] = s_mat[(k + 1, i)] + (z[k + 1] - zb[k + 1]) * l_mat[(k + 1, i)];
                    }
                    zb[k] = zs[k] + s_mat[(k, k)];
                    z[k] = round(zb[k]);
                    y = zb[k] - z[k];
                    step[k] = sgn(y);
                } else {
                    // store candidate
                    if nn < m {
                        if nn == 0 || newdist > s[imax] {
                            imax = nn;
                        }
                        zn.set_column(nn, &z);
                        s[nn] = newdist;
                        nn += 1;
                    } else {
                        if newdist < s[imax] {
                            zn.set_column(imax, &z);
                            s[imax] = newdist;
                            imax = 0;
                            for i in 0..m {
                                if s[imax] < s[i] {
                                    imax = i;
                                }
                            }
                        }
                        maxdist = s[imax];
                    }
                    z[0] += step[0];
                    y = zb[0] - z[0];
                    step[0] = -step[0] - sgn(step[0]);
                }
            } else if k == n - 1 {
                completed = true;
                break;
            } else {
                // move up
                k += 1;
                z[k] += step[k];
                y = zb[k] - z[k];
                step[k] = -step[k] - sgn(step[k]);
            }
        }

        if !completed {
            error!("lambda - search loop count overflow");
            return Err(Error::AmbiguitySearch);
        }

        // sort by s
        for i in 0..m.saturating_sub(1) {
            for j in (i + 1)..m {
                if s[i] < s[j] {
                    continue;
                }
                s.swap_rows(i, j);
                zn.swap_columns(i, j);
            }
        }

        Ok((zn, s))
    }

    /// Resolves the `m` best integer vectors of the float ambiguities `a`
    /// of covariance `q`.
    pub fn solve(a: &DVector<f64>, q: &DMatrix<f64>, m: usize) -> Result<LambdaSolution, Error> {
        let n = a.nrows();
        if n == 0 || m == 0 || q.shape() != (n, n) {
            return Err(Error::MatrixDimension);
        }

        let (mut l_mat, mut d) = Self::ld(q)?;
        let mut z_mat = DMatrix::<f64>::identity(n, n);

        Self::reduction(&mut l_mat, &mut d, &mut z_mat);

        let z = z_mat.transpose() * a;
        let (e, s) = Self::search(m, &l_mat, &d, &z)?;

        // F = Zᵀ⁻¹ E, integer by construction
        let f = z_mat
            .transpose()
            .lu()
            .solve(&e)
            .ok_or(Error::AmbiguityInverse)?
            .map(round);

        debug!("lambda - s={}", s.transpose());
        Ok(LambdaSolution { f, s })
    }
}
