// TODO: quantile interpolation types other than 7 (needed if summary output
// ever has to match rstan's type-8 intervals)

//! Scalar statistics and convergence diagnostics for the solon workspace.

/// Arithmetic mean of a slice. Returns 0.0 if empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample variance with N-1 denominator. Returns 0.0 if fewer than 2 elements.
pub fn variance(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / (n as f64 - 1.0)
}

/// Sample standard deviation with N-1 denominator. Returns 0.0 if fewer than
/// 2 elements.
pub fn sd(data: &[f64]) -> f64 {
    variance(data).sqrt()
}

/// Quantile with linear interpolation (R's default type=7 algorithm).
///
/// **Expects pre-sorted input** (caller's responsibility).
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn quantile_type7(sorted: &[f64], p: f64) -> f64 {
    assert!(
        !sorted.is_empty(),
        "quantile_type7: input must not be empty"
    );
    let n = sorted.len();
    let h = (n - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    sorted[lo] + (h - h.floor()) * (sorted[hi] - sorted[lo])
}

/// Median of pre-sorted data. For even length, averages the middle two values.
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn median(sorted: &[f64]) -> f64 {
    assert!(!sorted.is_empty(), "median: input must not be empty");
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Pearson correlation coefficient.
///
/// Filters to indices where both `x[i]` and `y[i]` are finite. Returns `None`
/// if fewer than 3 finite pairs or if either input is constant.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .collect();

    if pairs.len() < 3 {
        return None;
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let my = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for &(a, b) in &pairs {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denom = (sxx * syy).sqrt();
    if denom == 0.0 {
        return None;
    }
    Some(sxy / denom)
}

/// Spearman rank correlation: Pearson correlation of mid-ranks.
///
/// Ties receive the average of the ranks they span. Returns `None` under the
/// same conditions as [`pearson_correlation`], or on length mismatch.
pub fn spearman_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    let rx = midranks(x);
    let ry = midranks(y);
    pearson_correlation(&rx, &ry)
}

/// Mid-ranks of a slice (1-based; tied values share the average rank).
/// Non-finite values receive rank NaN so correlation filtering drops them.
pub fn midranks(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        data[a]
            .partial_cmp(&data[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![f64::NAN; n];
    let mut i = 0;
    while i < n {
        if !data[order[i]].is_finite() {
            i += 1;
            continue;
        }
        // Extent of the tie group starting at i.
        let mut j = i;
        while j + 1 < n && data[order[j + 1]] == data[order[i]] {
            j += 1;
        }
        let avg = (i + 1 + j + 1) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Split-chain Gelman-Rubin potential scale reduction factor (split R-hat).
///
/// Each chain is split in half before computing between- and within-chain
/// variances, so a single long chain still yields a meaningful diagnostic.
/// Values near 1.0 indicate convergence; > ~1.05 is suspect.
///
/// Returns `None` if there are no chains, any chain has fewer than 4 draws,
/// or the within-chain variance is zero (constant chains).
pub fn split_rhat(chains: &[Vec<f64>]) -> Option<f64> {
    if chains.is_empty() || chains.iter().any(|c| c.len() < 4) {
        return None;
    }

    let mut halves: Vec<&[f64]> = Vec::with_capacity(chains.len() * 2);
    for chain in chains {
        let mid = chain.len() / 2;
        halves.push(&chain[..mid]);
        halves.push(&chain[mid..mid * 2]);
    }

    let m = halves.len() as f64;
    let n = halves[0].len() as f64;

    let chain_means: Vec<f64> = halves.iter().map(|h| mean(h)).collect();
    let grand_mean = mean(&chain_means);

    let b = n / (m - 1.0)
        * chain_means
            .iter()
            .map(|&cm| (cm - grand_mean) * (cm - grand_mean))
            .sum::<f64>();
    let w = halves.iter().map(|h| variance(h)).sum::<f64>() / m;

    if w <= 0.0 {
        return None;
    }

    let var_plus = (n - 1.0) / n * w + b / n;
    Some((var_plus / w).sqrt())
}

/// Effective sample size of pooled chains via Geyer's initial positive
/// sequence: paired autocorrelations are summed until a pair turns negative.
///
/// Returns `None` for empty or constant input.
pub fn effective_sample_size(chains: &[Vec<f64>]) -> Option<f64> {
    let total: usize = chains.iter().map(|c| c.len()).sum();
    if total == 0 {
        return None;
    }

    let max_lag = chains.iter().map(|c| c.len()).min()? / 2;
    let mut rho_sum = 0.0;
    let mut t = 1;
    while t + 1 < max_lag {
        let mut pair = 0.0;
        for lag in [t, t + 1] {
            let rhos: Vec<f64> = chains.iter().filter_map(|c| autocorr(c, lag)).collect();
            if rhos.is_empty() {
                return None;
            }
            pair += mean(&rhos);
        }
        if pair < 0.0 {
            break;
        }
        rho_sum += pair;
        t += 2;
    }

    Some(total as f64 / (1.0 + 2.0 * rho_sum))
}

/// Lag-`k` autocorrelation of a single chain. `None` for constant input.
fn autocorr(chain: &[f64], lag: usize) -> Option<f64> {
    let n = chain.len();
    if lag >= n {
        return None;
    }
    let m = mean(chain);
    let denom: f64 = chain.iter().map(|&x| (x - m) * (x - m)).sum();
    if denom == 0.0 {
        return None;
    }
    let num: f64 = (0..n - lag)
        .map(|i| (chain[i] - m) * (chain[i + lag] - m))
        .sum();
    Some(num / denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_basic() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn mean_empty() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn variance_matches_r() {
        // R: var(c(2, 4, 4, 4, 5, 5, 7, 9)) = 4.571429
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(variance(&data), 4.571429, epsilon = 1e-5);
    }

    #[test]
    fn variance_degenerate() {
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(variance(&[3.0]), 0.0);
    }

    #[test]
    fn sd_two_points() {
        // var([1, 3]) = 2
        assert_relative_eq!(sd(&[1.0, 3.0]), 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn quantile_endpoints() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(quantile_type7(&sorted, 0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(quantile_type7(&sorted, 1.0), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn quantile_r_crossvalidation() {
        // R: quantile(1:10, 0.3, type=7) = 3.7
        let sorted: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_relative_eq!(quantile_type7(&sorted, 0.3), 3.7, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "quantile_type7: input must not be empty")]
    fn quantile_empty_panics() {
        quantile_type7(&[], 0.5);
    }

    #[test]
    fn median_odd_even() {
        assert_relative_eq!(median(&[1.0, 5.0, 9.0]), 5.0, epsilon = 1e-12);
        assert_relative_eq!(median(&[1.0, 2.0, 8.0, 9.0]), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn pearson_perfect_negative() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [8.0, 6.0, 4.0, 2.0];
        assert_relative_eq!(
            pearson_correlation(&x, &y).unwrap(),
            -1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn pearson_constant_input() {
        assert!(pearson_correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn spearman_monotone_nonlinear() {
        // Monotone transform: rank correlation is exactly 1.
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|&v| v * v * v).collect();
        assert_relative_eq!(
            spearman_correlation(&x, &y).unwrap(),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn spearman_length_mismatch() {
        assert!(spearman_correlation(&[1.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn midranks_with_ties() {
        // 3.0 appears twice at sorted positions 2 and 3 -> rank 2.5 each
        let r = midranks(&[3.0, 1.0, 3.0, 7.0]);
        assert_relative_eq!(r[0], 2.5, epsilon = 1e-12);
        assert_relative_eq!(r[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(r[2], 2.5, epsilon = 1e-12);
        assert_relative_eq!(r[3], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn rhat_identical_chains_near_one() {
        let chain: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64 / 101.0).collect();
        let rhat = split_rhat(&[chain.clone(), chain]).unwrap();
        assert!(rhat < 1.05, "rhat = {rhat}");
    }

    #[test]
    fn rhat_shifted_chains_large() {
        let a: Vec<f64> = (0..100).map(|i| (i % 10) as f64 * 0.1).collect();
        let b: Vec<f64> = a.iter().map(|v| v + 50.0).collect();
        let rhat = split_rhat(&[a, b]).unwrap();
        assert!(rhat > 2.0, "rhat = {rhat}");
    }

    #[test]
    fn rhat_rejects_short_or_constant() {
        assert!(split_rhat(&[]).is_none());
        assert!(split_rhat(&[vec![1.0, 2.0, 3.0]]).is_none());
        assert!(split_rhat(&[vec![2.0; 50], vec![2.0; 50]]).is_none());
    }

    #[test]
    fn ess_low_autocorrelation_is_large() {
        // Deterministic low-autocorrelation sequence.
        let chain: Vec<f64> = (0..500).map(|i| ((i * 97) % 251) as f64).collect();
        let ess = effective_sample_size(&[chain]).unwrap();
        assert!(ess > 100.0, "ess = {ess}");
    }

    #[test]
    fn ess_empty_and_constant() {
        assert!(effective_sample_size(&[]).is_none());
        assert!(effective_sample_size(&[vec![1.0; 100]]).is_none());
    }
}
