//! Integer bootstrapping success rate
use std::f64::consts::SQRT_2;

/// ln(Γ(1/2)) = ln(π)/2
const LN_GAMMA_HALF: f64 = 0.572_364_942_924_700_1;

const MAX_ITER: usize = 100;
const TOLERANCE: f64 = 1.0E-15;

/// Regularized lower incomplete gamma function P(a, x)
fn p_gamma(a: f64, x: f64, ln_gamma_a: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }
    if x >= a + 1.0 {
        return 1.0 - q_gamma(a, x, ln_gamma_a);
    }

    let mut w = (a * x.ln() - x - ln_gamma_a).exp() / a;
    let mut y = w;

    for i in 1..MAX_ITER {
        w *= x / (a + i as f64);
        y += w;
        if w.abs() < TOLERANCE {
            break;
        }
    }
    y
}

/// Regularized upper incomplete gamma function Q(a, x)
fn q_gamma(a: f64, x: f64, ln_gamma_a: f64) -> f64 {
    if x < a + 1.0 {
        return 1.0 - p_gamma(a, x, ln_gamma_a);
    }

    let (mut la, mut lb) = (1.0, x + 1.0 - a);
    let mut w = (-x + a * x.ln() - ln_gamma_a).exp();
    let mut y = w / lb;

    for i in 2..MAX_ITER {
        let i = i as f64;
        let lc = ((i - 1.0 - a) * (lb - la) + (i + x) * lb) / i;
        la = lb;
        lb = lc;
        w *= (i - 1.0 - a) / i;
        y += w / la / lb;
        if (w / la / lb).abs() < TOLERANCE {
            break;
        }
    }
    y
}

/// Complementary error function
pub fn erfc(x: f64) -> f64 {
    if x >= 0.0 {
        q_gamma(0.5, x * x, LN_GAMMA_HALF)
    } else {
        1.0 + p_gamma(0.5, x * x, LN_GAMMA_HALF)
    }
}

/// Probability that rounding the float ambiguity `float`, of standard deviation
/// `sigma`, to the integer `fixed` is correct.
pub fn confidence(fixed: i64, float: f64, sigma: f64) -> f64 {
    let x = (float - fixed as f64).abs();
    if sigma <= 0.0 || sigma.is_nan() {
        // degenerate: only an exact integer is trusted
        return if x == 0.0 { 1.0 } else { 0.0 };
    }
    let mut p = 1.0;
    for i in 1..8 {
        let i = i as f64;
        p -= erfc((i - x) / SQRT_2 / sigma) - erfc((i + x) / SQRT_2 / sigma);
    }
    p
}
