//! Log-domain reductions.
//!
//! Mixture densities and class posteriors are accumulated as logarithms to
//! avoid underflow; these helpers combine such values without leaving the
//! log domain.

/// Computes `ln(Σ exp(v))` without overflow or underflow.
///
/// Returns `f64::NEG_INFINITY` for an empty input or when every term is
/// `-inf`. A `NaN` term propagates to the result.
///
/// # Examples
///
/// ```
/// use mgnb_stats::logsumexp::logsumexp;
///
/// assert_eq!(logsumexp(Vec::new()), f64::NEG_INFINITY);
/// assert!((logsumexp([0.0, 0.0]) - 2f64.ln()).abs() < 1e-15);
/// assert!((logsumexp([800.0, 800.0]) - (800.0 + 2f64.ln())).abs() < 1e-12);
/// ```
#[must_use]
pub fn logsumexp<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let values = values.into_iter().collect::<Vec<_>>();
    logsumexp_slice(&values)
}

/// Slice form of [`logsumexp`].
#[must_use]
pub fn logsumexp_slice(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum = values.iter().map(|v| (v - max).exp()).sum::<f64>();
    max + sum.ln()
}

/// Normalizes log-weights in place so that their exponentials sum to one.
///
/// Returns the normalizer (the log-sum-exp of the input).
///
/// # Examples
///
/// ```
/// use mgnb_stats::logsumexp::normalize_log_weights;
///
/// let mut weights = [1.0f64.ln(), 3.0f64.ln()];
/// normalize_log_weights(&mut weights);
/// assert!((weights[0].exp() - 0.25).abs() < 1e-12);
/// assert!((weights[1].exp() - 0.75).abs() < 1e-12);
/// ```
pub fn normalize_log_weights(values: &mut [f64]) -> f64 {
    let norm = logsumexp_slice(values);
    if norm.is_finite() {
        for v in values.iter_mut() {
            *v -= norm;
        }
    }
    norm
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_all_negative_infinity() {
        assert_eq!(
            logsumexp([f64::NEG_INFINITY, f64::NEG_INFINITY]),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn test_nan_propagates() {
        assert!(logsumexp([0.0, f64::NAN]).is_nan());
    }

    #[test]
    fn test_deep_underflow() {
        // exp(-2000) is zero in f64, but the log-sum-exp is still exact
        let lse = logsumexp([-2000.0, -2001.0]);
        assert_relative_eq!(lse, -2000.0 + (1.0 + (-1.0f64).exp()).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_leaves_degenerate_input() {
        let mut values = [f64::NEG_INFINITY; 3];
        let norm = normalize_log_weights(&mut values);
        assert_eq!(norm, f64::NEG_INFINITY);
        assert!(values.iter().all(|v| *v == f64::NEG_INFINITY));
    }
}
