//! Automatic anchor selection from an unidentified fit.

use solon_engine::Draws;
use solon_model::TimeProcess;
use tracing::info;

use crate::config::{AnchorPair, AnchorTargets};
use crate::error::IdentifyError;
use crate::transform::anchored_posterior_means;

/// Picks the anchor pair as the argmax and argmin of the posterior-mean
/// anchored quantity, with targets set to those posterior means.
///
/// Exact ties break toward the smaller person index. A separation between
/// the chosen extremes below `epsilon` is an error: such a posterior carries
/// no usable polarity information.
pub fn select_anchors(
    draws: &Draws,
    time: TimeProcess,
    epsilon: f64,
) -> Result<(AnchorPair, AnchorTargets), IdentifyError> {
    let means = anchored_posterior_means(draws, time);

    let mut high = 0usize;
    let mut low = 0usize;
    for (p, &m) in means.iter().enumerate() {
        if m > means[high] {
            high = p;
        }
        if m < means[low] {
            low = p;
        }
    }

    let separation = (means[high] - means[low]).abs();
    if high == low || separation < epsilon {
        return Err(IdentifyError::DegenerateAnchors {
            separation,
            epsilon,
        });
    }

    info!(
        high,
        low,
        high_mean = means[high],
        low_mean = means[low],
        "anchors selected"
    );
    let anchors = AnchorPair::new(high, low)?;
    let targets = AnchorTargets::new(means[high], means[low])?;
    Ok((anchors, targets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn draws_with_means(means: &[f64]) -> Draws {
        // Two draws per person, both equal to the mean.
        let n = means.len();
        let mut theta = Array2::zeros((2, n));
        for (p, &m) in means.iter().enumerate() {
            theta[[0, p]] = m;
            theta[[1, p]] = m;
        }
        Draws::new(
            n,
            1,
            1,
            1,
            2,
            theta,
            Array2::zeros((2, 1)),
            Array2::zeros((2, 1)),
            None,
            None,
        )
    }

    #[test]
    fn picks_argmax_and_argmin() {
        let draws = draws_with_means(&[0.2, -1.5, 0.9, 0.0]);
        let (anchors, targets) =
            select_anchors(&draws, TimeProcess::Static, 1e-6).unwrap();
        assert_eq!(anchors.high, 2);
        assert_eq!(anchors.low, 1);
        assert_eq!(targets.high, 0.9);
        assert_eq!(targets.low, -1.5);
    }

    #[test]
    fn exact_ties_break_toward_smaller_index() {
        let draws = draws_with_means(&[1.0, 1.0, -1.0, -1.0]);
        let (anchors, _) = select_anchors(&draws, TimeProcess::Static, 1e-6).unwrap();
        assert_eq!(anchors.high, 0);
        assert_eq!(anchors.low, 2);
    }

    #[test]
    fn near_tied_extremes_are_an_error() {
        let draws = draws_with_means(&[0.0, 1e-9, 5e-10]);
        let res = select_anchors(&draws, TimeProcess::Static, 1e-6);
        assert!(matches!(res, Err(IdentifyError::DegenerateAnchors { .. })));
    }
}
