//! Per-family log-likelihood contributions.
//!
//! Each family exposes the log-likelihood of one response and its first and
//! second derivatives with respect to the linear predictor `eta`. Second
//! derivatives are clamped away from zero so Newton steps stay bounded.
//! The ordinal curvature uses a central difference of the closed-form score;
//! everything else is analytic.

use statrs::function::gamma::ln_gamma;

/// Numerically stable logistic function.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Numerically stable `ln(1 + exp(x))`.
fn log1p_exp(x: f64) -> f64 {
    if x > 35.0 { x } else { x.exp().ln_1p() }
}

/// Curvature floor: keeps Newton denominators away from zero.
const MIN_CURVATURE: f64 = 1e-10;

/// Probability floor for ordinal category masses.
const MIN_PROB: f64 = 1e-12;

// --- Binary (logit link) ---

/// Bernoulli-logit log-likelihood. `y` must be 0.0 or 1.0.
pub fn binary_loglik(y: f64, eta: f64) -> f64 {
    y * eta - log1p_exp(eta)
}

/// First and second derivative of [`binary_loglik`] with respect to `eta`.
pub fn binary_score(y: f64, eta: f64) -> (f64, f64) {
    let p = sigmoid(eta);
    (y - p, -(p * (1.0 - p)).max(MIN_CURVATURE))
}

// --- Poisson (log link) ---

/// Poisson log-likelihood with `log(mu) = eta`.
pub fn poisson_loglik(y: f64, eta: f64) -> f64 {
    y * eta - eta.exp() - ln_gamma(y + 1.0)
}

/// First and second derivative of [`poisson_loglik`] with respect to `eta`.
pub fn poisson_score(y: f64, eta: f64) -> (f64, f64) {
    // Cap the conditional mean so a wild proposal cannot overflow the step.
    let mu = eta.exp().min(1e6);
    (y - mu, -mu.max(MIN_CURVATURE))
}

// --- Normal (identity link) ---

/// Gaussian log-likelihood with mean `eta` and standard deviation `sigma`.
pub fn normal_loglik(y: f64, eta: f64, sigma: f64) -> f64 {
    let z = (y - eta) / sigma;
    -0.5 * z * z - sigma.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln()
}

/// First and second derivative of [`normal_loglik`] with respect to `eta`.
pub fn normal_score(y: f64, eta: f64, sigma: f64) -> (f64, f64) {
    let s2 = sigma * sigma;
    ((y - eta) / s2, -1.0 / s2)
}

// --- Ordinal (ordered logit, shared or per-item cutpoints) ---

/// Cutpoints from observed category counts: logit of the clamped cumulative
/// proportions, nudged apart where categories are empty.
///
/// For `K` categories the result has `K - 1` strictly increasing entries.
pub fn cutpoints_from_counts(counts: &[usize]) -> Vec<f64> {
    let total: usize = counts.iter().sum();
    let total = total.max(1) as f64;

    let mut cuts = Vec::with_capacity(counts.len().saturating_sub(1));
    let mut cum = 0.0;
    for &c in counts.iter().take(counts.len().saturating_sub(1)) {
        cum += c as f64;
        let p = (cum / total).clamp(1e-3, 1.0 - 1e-3);
        cuts.push((p / (1.0 - p)).ln());
    }

    // Empty categories collapse adjacent cumulative proportions.
    for i in 1..cuts.len() {
        if cuts[i] <= cuts[i - 1] {
            cuts[i] = cuts[i - 1] + 1e-6;
        }
    }
    cuts
}

/// Probability of category `k` (0-based) under an ordered logit with the
/// given cutpoints.
pub fn ordinal_prob(k: usize, eta: f64, cutpoints: &[f64]) -> f64 {
    let n_cats = cutpoints.len() + 1;
    let upper = if k + 1 >= n_cats {
        1.0
    } else {
        sigmoid(cutpoints[k] - eta)
    };
    let lower = if k == 0 {
        0.0
    } else {
        sigmoid(cutpoints[k - 1] - eta)
    };
    (upper - lower).max(MIN_PROB)
}

/// Ordered-logit log-likelihood of category `k` (0-based).
pub fn ordinal_loglik(k: usize, eta: f64, cutpoints: &[f64]) -> f64 {
    ordinal_prob(k, eta, cutpoints).ln()
}

/// First and second derivative of [`ordinal_loglik`] with respect to `eta`.
///
/// The score is analytic; the curvature is a central difference of the score
/// (step 1e-5), which is accurate enough for damped Newton updates.
pub fn ordinal_score(k: usize, eta: f64, cutpoints: &[f64]) -> (f64, f64) {
    let d1 = ordinal_d1(k, eta, cutpoints);
    let h = 1e-5;
    let d2 = (ordinal_d1(k, eta + h, cutpoints) - ordinal_d1(k, eta - h, cutpoints)) / (2.0 * h);
    (d1, d2.min(-MIN_CURVATURE))
}

fn ordinal_d1(k: usize, eta: f64, cutpoints: &[f64]) -> f64 {
    let n_cats = cutpoints.len() + 1;
    let dens = |u: f64| {
        let s = sigmoid(u);
        s * (1.0 - s)
    };
    let f_upper = if k + 1 >= n_cats {
        0.0
    } else {
        dens(cutpoints[k] - eta)
    };
    let f_lower = if k == 0 { 0.0 } else { dens(cutpoints[k - 1] - eta) };
    (f_lower - f_upper) / ordinal_prob(k, eta, cutpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn numeric_d1(f: impl Fn(f64) -> f64, x: f64) -> f64 {
        let h = 1e-6;
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    #[test]
    fn sigmoid_symmetry() {
        assert_relative_eq!(sigmoid(0.0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(sigmoid(3.0) + sigmoid(-3.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn binary_score_matches_numeric() {
        for &(y, eta) in &[(0.0, -1.3), (1.0, 0.7), (1.0, 4.0)] {
            let (d1, _) = binary_score(y, eta);
            let num = numeric_d1(|e| binary_loglik(y, e), eta);
            assert_relative_eq!(d1, num, epsilon = 1e-5);
        }
    }

    #[test]
    fn binary_curvature_negative() {
        let (_, d2) = binary_score(1.0, 0.2);
        assert!(d2 < 0.0);
    }

    #[test]
    fn poisson_score_matches_numeric() {
        for &(y, eta) in &[(0.0, -0.5), (3.0, 1.2), (10.0, 2.0)] {
            let (d1, _) = poisson_score(y, eta);
            let num = numeric_d1(|e| poisson_loglik(y, e), eta);
            assert_relative_eq!(d1, num, epsilon = 1e-4);
        }
    }

    #[test]
    fn normal_loglik_standard_density() {
        // N(0,1) log-density at 0: -0.5*ln(2*pi)
        let expected = -0.5 * (2.0 * std::f64::consts::PI).ln();
        assert_relative_eq!(normal_loglik(0.0, 0.0, 1.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn normal_score_matches_numeric() {
        let (d1, _) = normal_score(1.5, 0.3, 2.0);
        let num = numeric_d1(|e| normal_loglik(1.5, e, 2.0), 0.3);
        assert_relative_eq!(d1, num, epsilon = 1e-5);
    }

    #[test]
    fn cutpoints_increasing() {
        let cuts = cutpoints_from_counts(&[10, 20, 30, 40]);
        assert_eq!(cuts.len(), 3);
        assert!(cuts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn cutpoints_survive_empty_category() {
        let cuts = cutpoints_from_counts(&[10, 0, 30]);
        assert_eq!(cuts.len(), 2);
        assert!(cuts[0] < cuts[1]);
    }

    #[test]
    fn ordinal_probs_sum_to_one() {
        let cuts = cutpoints_from_counts(&[5, 10, 5, 2]);
        for &eta in &[-2.0, 0.0, 1.7] {
            let total: f64 = (0..4).map(|k| ordinal_prob(k, eta, &cuts)).sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn ordinal_score_matches_numeric() {
        let cuts = cutpoints_from_counts(&[8, 12, 6]);
        for k in 0..3 {
            for &eta in &[-1.0, 0.4] {
                let (d1, d2) = ordinal_score(k, eta, &cuts);
                let num = numeric_d1(|e| ordinal_loglik(k, e, &cuts), eta);
                assert_relative_eq!(d1, num, epsilon = 1e-4);
                assert!(d2 < 0.0);
            }
        }
    }

    #[test]
    fn higher_eta_favours_higher_categories() {
        let cuts = cutpoints_from_counts(&[10, 10, 10]);
        assert!(ordinal_prob(2, 2.0, &cuts) > ordinal_prob(2, -2.0, &cuts));
        assert!(ordinal_prob(0, -2.0, &cuts) > ordinal_prob(0, 2.0, &cuts));
    }
}
