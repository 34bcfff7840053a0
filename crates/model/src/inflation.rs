//! Missingness hurdle for the inflated model variants.
//!
//! Under an inflated variant each item carries an absence discrimination and
//! difficulty; a response is missing with probability
//! `sigmoid(absence_disc * theta - absence_diff)`. Observed responses
//! contribute the complementary probability on top of their outcome
//! likelihood, so informative missingness moves the trait estimate.

use crate::family::sigmoid;

/// Log-likelihood of the missingness indicator given the absence linear
/// predictor `eta_miss = absence_disc * theta - absence_diff`.
pub fn inflation_loglik(missing: bool, eta_miss: f64) -> f64 {
    let p = sigmoid(eta_miss).clamp(1e-12, 1.0 - 1e-12);
    if missing { p.ln() } else { (1.0 - p).ln() }
}

/// First and second derivative of [`inflation_loglik`] with respect to
/// `eta_miss`.
pub fn inflation_score(missing: bool, eta_miss: f64) -> (f64, f64) {
    let p = sigmoid(eta_miss);
    let m = if missing { 1.0 } else { 0.0 };
    (m - p, -(p * (1.0 - p)).max(1e-10))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn balanced_at_zero() {
        assert_relative_eq!(inflation_loglik(true, 0.0), 0.5_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(inflation_loglik(false, 0.0), 0.5_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn score_matches_numeric() {
        let h = 1e-6;
        for &missing in &[true, false] {
            for &eta in &[-1.2, 0.0, 2.5] {
                let (d1, d2) = inflation_score(missing, eta);
                let num =
                    (inflation_loglik(missing, eta + h) - inflation_loglik(missing, eta - h))
                        / (2.0 * h);
                assert_relative_eq!(d1, num, epsilon = 1e-5);
                assert!(d2 < 0.0);
            }
        }
    }

    #[test]
    fn missing_likelihood_rises_with_eta() {
        assert!(inflation_loglik(true, 2.0) > inflation_loglik(true, -2.0));
        assert!(inflation_loglik(false, -2.0) > inflation_loglik(false, 2.0));
    }
}
