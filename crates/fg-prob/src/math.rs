//! Small numerically-stable math utilities used across probability code.

use fg_ad::Scalar;

/// Stable `log(1 + exp(x))`.
///
/// Branchless: `log(1+exp(x)) = max(x,0) + log(1+exp(-|x|))`.
#[inline]
pub fn log1pexp(x: f64) -> f64 {
    let abs_x = x.abs();
    let e = (-abs_x).exp(); // always in (0, 1], no overflow
    x.max(0.0) + e.ln_1p()
}

/// Stable `log(1 + exp(x))` for any [`Scalar`].
#[inline]
pub fn log1pexp_s<S: Scalar>(x: S) -> S {
    if x.value() > 0.0 { x + (-x).exp().ln_1p() } else { x.exp().ln_1p() }
}

/// Stable sigmoid: `1 / (1 + exp(-x))`.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    let abs_x = x.abs();
    let e = (-abs_x).exp();
    let recip = 1.0 / (1.0 + e);
    if x >= 0.0 { recip } else { e * recip }
}

/// Stable `log(sigmoid(x))`.
#[inline]
pub fn log_sigmoid(x: f64) -> f64 {
    if x >= 0.0 { -(-x).exp().ln_1p() } else { x - x.exp().ln_1p() }
}

/// Stable `log(sum(exp(xs)))`.
///
/// The running maximum is subtracted before exponentiating, so no term can
/// overflow and the dominant term never underflows. Returns `-inf` for an
/// empty slice or when every term is `-inf`.
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let m = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if m == f64::NEG_INFINITY || m == f64::INFINITY {
        return m;
    }
    let s: f64 = xs.iter().map(|&x| (x - m).exp()).sum();
    m + s.ln()
}

/// [`log_sum_exp`] for any [`Scalar`].
///
/// The shift is taken as a constant: the gradient of `m + ln Σ exp(x_i - m)`
/// is the softmax of `x` whatever `m` is.
pub fn log_sum_exp_s<S: Scalar>(xs: &[S]) -> S {
    let m = xs.iter().map(|x| x.value()).fold(f64::NEG_INFINITY, f64::max);
    if m == f64::NEG_INFINITY || m == f64::INFINITY {
        return S::from_f64(m);
    }
    let shift = S::from_f64(m);
    let s: S = xs.iter().map(|&x| (x - shift).exp()).sum();
    shift + s.ln()
}

/// Stable `log(mean(exp(xs)))`.
pub fn log_mean_exp(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NEG_INFINITY;
    }
    log_sum_exp(xs) - (xs.len() as f64).ln()
}
