//! Constraining transforms for unconstrained parameterization.
//!
//! Gradient-based engines operate on `z ∈ R^n`. Each transform maps an
//! unconstrained block to its constrained value and returns the log absolute
//! Jacobian determinant, so a density on the constrained space becomes a
//! proper density on `z`. Forward maps are generic over [`Scalar`]; inverses
//! are `f64` only (they are used for initialisation and packing).

use fg_ad::Scalar;

use crate::math::log1pexp_s;

/// `x = exp(u)`, log-Jacobian `u`.
#[inline]
pub fn positive_constrain<S: Scalar>(u: S) -> (S, S) {
    (u.exp(), u)
}

/// Inverse of [`positive_constrain`].
#[inline]
pub fn positive_unconstrain(x: f64) -> f64 {
    x.ln()
}

#[inline]
fn sigmoid_s<S: Scalar>(x: S) -> S {
    let one = S::from_f64(1.0);
    if x.value() >= 0.0 {
        one / (one + (-x).exp())
    } else {
        let e = x.exp();
        e / (one + e)
    }
}

/// Stick-breaking map from `R^{n-1}` to the open `n`-simplex.
///
/// Coordinate `k` is centred by `ln(n - 1 - k)` so that `y = 0` maps to the
/// uniform simplex. An empty `y` yields the trivial simplex `[1]`.
pub fn simplex_constrain<S: Scalar>(y: &[S]) -> (Vec<S>, S) {
    let km1 = y.len();
    let mut x = Vec::with_capacity(km1 + 1);
    let mut stick = S::from_f64(1.0);
    let mut log_jac = S::zero();
    for (k, &yk) in y.iter().enumerate() {
        let adj = yk - S::from_f64(((km1 - k) as f64).ln());
        let xk = stick * sigmoid_s(adj);
        log_jac = log_jac + stick.ln() - log1pexp_s(-adj) - log1pexp_s(adj);
        stick = stick - xk;
        x.push(xk);
    }
    x.push(stick);
    (x, log_jac)
}

/// Inverse of [`simplex_constrain`]: `n` probabilities to `n - 1` reals.
pub fn simplex_unconstrain(x: &[f64]) -> Vec<f64> {
    if x.len() < 2 {
        return Vec::new();
    }
    let km1 = x.len() - 1;
    let mut y = vec![0.0; km1];
    let mut stick = x[km1];
    for k in (0..km1).rev() {
        stick += x[k];
        let p = x[k] / stick;
        y[k] = (p / (1.0 - p)).ln() + ((km1 - k) as f64).ln();
    }
    y
}

/// Number of free coordinates of a `k × k` correlation Cholesky factor.
#[inline]
pub fn cholesky_corr_free_dim(k: usize) -> usize {
    k * k.saturating_sub(1) / 2
}

/// `ln(1 - tanh(y)^2)` without cancellation for large `|y|`.
#[inline]
fn log_dtanh<S: Scalar>(y: S) -> S {
    let a = y.abs();
    S::from_f64(2.0)
        * (S::from_f64(std::f64::consts::LN_2) - a - (S::from_f64(-2.0) * a).exp().ln_1p())
}

/// Map `k(k-1)/2` reals to the row-major Cholesky factor of a `k × k`
/// correlation matrix.
///
/// `tanh` of each coordinate is a canonical partial correlation in `(-1, 1)`;
/// row `i` is filled left to right, each entry scaled by the remaining row
/// norm, and the diagonal takes what is left so every row has unit norm.
pub fn cholesky_corr_constrain<S: Scalar>(y: &[S], k: usize) -> (Vec<S>, S) {
    debug_assert_eq!(y.len(), cholesky_corr_free_dim(k));
    let one = S::from_f64(1.0);
    let mut l = vec![S::zero(); k * k];
    let mut log_jac = S::zero();
    if k == 0 {
        return (l, log_jac);
    }
    l[0] = one;
    let mut idx = 0;
    for i in 1..k {
        let z0 = y[idx].tanh();
        log_jac = log_jac + log_dtanh(y[idx]);
        idx += 1;
        l[i * k] = z0;
        let mut sum_sqs = z0 * z0;
        for j in 1..i {
            let zj = y[idx].tanh();
            log_jac = log_jac + log_dtanh(y[idx]);
            idx += 1;
            let rem = one - sum_sqs;
            log_jac = log_jac + S::from_f64(0.5) * rem.ln();
            let w = zj * rem.sqrt();
            l[i * k + j] = w;
            sum_sqs = sum_sqs + w * w;
        }
        l[i * k + i] = (one - sum_sqs).sqrt();
    }
    (l, log_jac)
}

/// Inverse of [`cholesky_corr_constrain`].
pub fn cholesky_corr_unconstrain(l: &[f64], k: usize) -> Vec<f64> {
    let mut y = Vec::with_capacity(cholesky_corr_free_dim(k));
    for i in 1..k {
        let mut sum_sqs = 0.0;
        for j in 0..i {
            let w = l[i * k + j];
            let z = (w / (1.0 - sum_sqs).sqrt()).clamp(-1.0 + 1e-15, 1.0 - 1e-15);
            y.push(z.atanh());
            sum_sqs += w * w;
        }
    }
    y
}
