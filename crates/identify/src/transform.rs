//! The per-draw affine transform and the stationary variance cap.

use solon_engine::Draws;
use solon_model::TimeProcess;
use tracing::debug;

use crate::config::{AnchorPair, AnchorTargets};
use crate::error::IdentifyError;

/// Summary of an applied affine transform.
#[derive(Debug, Clone)]
pub struct AffineSummary {
    /// Number of draws whose polarity was flipped (negative scale).
    pub flipped_draws: usize,
    /// Mean absolute scale across draws.
    pub mean_abs_scale: f64,
}

/// The quantity the anchors constrain for one person in one draw: the first
/// time-point for static and random-walk traits, the over-time mean for
/// stationary traits.
pub(crate) fn anchored_value(
    draws: &Draws,
    time: TimeProcess,
    draw: usize,
    person: usize,
) -> f64 {
    match time {
        TimeProcess::Static | TimeProcess::RandomWalk => {
            draws.theta()[[draw, draws.slot(person, 0)]]
        }
        TimeProcess::Stationary { .. } => {
            let n_time = draws.n_time();
            let sum: f64 = (0..n_time)
                .map(|t| draws.theta()[[draw, draws.slot(person, t)]])
                .sum();
            sum / n_time as f64
        }
    }
}

/// Posterior mean of the anchored quantity for every person.
pub(crate) fn anchored_posterior_means(draws: &Draws, time: TimeProcess) -> Vec<f64> {
    let n = draws.n_draws() as f64;
    (0..draws.n_persons())
        .map(|p| {
            (0..draws.n_draws())
                .map(|d| anchored_value(draws, time, d, p))
                .sum::<f64>()
                / n
        })
        .collect()
}

/// Solves and applies the exact affine map draw by draw.
///
/// For each draw, `scale = (t_high - t_low) / (x_high - x_low)` and
/// `shift = t_high - scale * x_high`, applied to every trait value of that
/// draw. Anchors whose raw separation falls below `epsilon` in any draw make
/// the whole transform fail; nothing is modified in that case.
pub fn apply_affine(
    draws: &mut Draws,
    anchors: AnchorPair,
    targets: AnchorTargets,
    time: TimeProcess,
    epsilon: f64,
) -> Result<AffineSummary, IdentifyError> {
    let n_persons = draws.n_persons();
    for person in [anchors.high, anchors.low] {
        if person >= n_persons {
            return Err(IdentifyError::AnchorOutOfRange { person, n_persons });
        }
    }

    // Solve every draw before touching any, so a degenerate draw cannot
    // leave the matrix half-transformed.
    let n_draws = draws.n_draws();
    let mut maps = Vec::with_capacity(n_draws);
    for d in 0..n_draws {
        let x_high = anchored_value(draws, time, d, anchors.high);
        let x_low = anchored_value(draws, time, d, anchors.low);
        let separation = (x_high - x_low).abs();
        if separation < epsilon {
            return Err(IdentifyError::DegenerateAnchors {
                separation,
                epsilon,
            });
        }
        let scale = (targets.high - targets.low) / (x_high - x_low);
        let shift = targets.high - scale * x_high;
        maps.push((scale, shift));
    }

    let mut flipped = 0usize;
    let mut abs_scale_sum = 0.0;
    let theta = draws.theta_mut();
    for (d, &(scale, shift)) in maps.iter().enumerate() {
        if scale < 0.0 {
            flipped += 1;
        }
        abs_scale_sum += scale.abs();
        for s in 0..theta.ncols() {
            theta[[d, s]] = scale * theta[[d, s]] + shift;
        }
    }

    let summary = AffineSummary {
        flipped_draws: flipped,
        mean_abs_scale: abs_scale_sum / n_draws as f64,
    };
    debug!(
        flipped = summary.flipped_draws,
        mean_abs_scale = summary.mean_abs_scale,
        "affine transform applied"
    );
    Ok(summary)
}

/// Bounds the realized per-step standard deviation of every stationary
/// trajectory by shrinking its deviations around the per-draw over-time
/// mean. Trajectories already within the cap are untouched; the over-time
/// mean (the anchored quantity) is preserved exactly.
pub fn apply_variance_cap(draws: &mut Draws, cap: f64) {
    let n_time = draws.n_time();
    if n_time < 2 {
        return;
    }
    let n_persons = draws.n_persons();
    let n_draws = draws.n_draws();

    for d in 0..n_draws {
        for p in 0..n_persons {
            let base = draws.slot(p, 0);
            let theta = draws.theta_mut();
            let mean: f64 =
                (0..n_time).map(|t| theta[[d, base + t]]).sum::<f64>() / n_time as f64;
            let step_sd = {
                let mut ss = 0.0;
                for t in 1..n_time {
                    let step = theta[[d, base + t]] - theta[[d, base + t - 1]];
                    ss += step * step;
                }
                (ss / (n_time - 1) as f64).sqrt()
            };
            if step_sd > cap {
                let shrink = cap / step_sd;
                for t in 0..n_time {
                    let dev = theta[[d, base + t]] - mean;
                    theta[[d, base + t]] = mean + shrink * dev;
                }
            }
        }
    }
}

/// Realized per-step standard deviation of one person's trajectory in one
/// draw.
pub fn realized_step_sd(draws: &Draws, draw: usize, person: usize) -> f64 {
    let n_time = draws.n_time();
    if n_time < 2 {
        return 0.0;
    }
    let base = draws.slot(person, 0);
    let mut ss = 0.0;
    for t in 1..n_time {
        let step = draws.theta()[[draw, base + t]] - draws.theta()[[draw, base + t - 1]];
        ss += step * step;
    }
    (ss / (n_time - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_draws(n_draws: usize, n_person: usize, n_time: usize, seed: u64) -> Draws {
        let mut rng = StdRng::seed_from_u64(seed);
        let n_slots = n_person * n_time;
        let theta = Array2::from_shape_fn((n_draws, n_slots), |_| rng.random_range(-3.0..3.0));
        Draws::new(
            n_person,
            n_time,
            1,
            1,
            n_draws,
            theta,
            Array2::zeros((n_draws, 1)),
            Array2::zeros((n_draws, 1)),
            None,
            None,
        )
    }

    #[test]
    fn anchors_match_targets_exactly() {
        let mut draws = random_draws(50, 6, 1, 1);
        let anchors = AnchorPair::new(0, 5).unwrap();
        let targets = AnchorTargets::new(1.0, -1.0).unwrap();
        apply_affine(&mut draws, anchors, targets, TimeProcess::Static, 1e-6).unwrap();
        for d in 0..draws.n_draws() {
            assert_relative_eq!(draws.theta()[[d, 0]], 1.0, epsilon = 1e-10);
            assert_relative_eq!(draws.theta()[[d, 5]], -1.0, epsilon = 1e-10);
            assert!(draws.theta()[[d, 0]] > draws.theta()[[d, 5]]);
        }
    }

    #[test]
    fn transform_is_idempotent() {
        let mut draws = random_draws(20, 4, 1, 2);
        let anchors = AnchorPair::new(1, 3).unwrap();
        let targets = AnchorTargets::new(2.0, -0.5).unwrap();
        apply_affine(&mut draws, anchors, targets, TimeProcess::Static, 1e-6).unwrap();
        let first = draws.theta().clone();
        let summary =
            apply_affine(&mut draws, anchors, targets, TimeProcess::Static, 1e-6).unwrap();
        for (a, b) in first.iter().zip(draws.theta().iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
        // The second pass solves to the identity map, so nothing flips.
        assert_eq!(summary.flipped_draws, 0);
        assert_relative_eq!(summary.mean_abs_scale, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn degenerate_anchors_refused_without_mutation() {
        let theta = Array2::from_shape_vec((2, 2), vec![0.5, 0.5, 1.0, 2.0]).unwrap();
        let mut draws = Draws::new(
            2,
            1,
            1,
            1,
            2,
            theta.clone(),
            Array2::zeros((2, 1)),
            Array2::zeros((2, 1)),
            None,
            None,
        );
        let anchors = AnchorPair::new(0, 1).unwrap();
        let targets = AnchorTargets::new(1.0, -1.0).unwrap();
        let res = apply_affine(&mut draws, anchors, targets, TimeProcess::Static, 1e-6);
        assert!(matches!(res, Err(IdentifyError::DegenerateAnchors { .. })));
        assert_eq!(draws.theta(), &theta);
    }

    #[test]
    fn anchor_out_of_range_refused() {
        let mut draws = random_draws(5, 3, 1, 4);
        let anchors = AnchorPair::new(0, 7).unwrap();
        let targets = AnchorTargets::new(1.0, -1.0).unwrap();
        let res = apply_affine(&mut draws, anchors, targets, TimeProcess::Static, 1e-6);
        assert!(matches!(
            res,
            Err(IdentifyError::AnchorOutOfRange { person: 7, n_persons: 3 })
        ));
    }

    #[test]
    fn random_walk_constrains_first_time_point_only() {
        let mut draws = random_draws(30, 4, 3, 5);
        let anchors = AnchorPair::new(0, 3).unwrap();
        let targets = AnchorTargets::new(1.0, -1.0).unwrap();
        apply_affine(&mut draws, anchors, targets, TimeProcess::RandomWalk, 1e-6).unwrap();
        let mut later_differs = false;
        for d in 0..draws.n_draws() {
            assert_relative_eq!(
                draws.theta()[[d, draws.slot(0, 0)]],
                1.0,
                epsilon = 1e-10
            );
            if (draws.theta()[[d, draws.slot(0, 1)]] - 1.0).abs() > 1e-6 {
                later_differs = true;
            }
        }
        assert!(later_differs, "later time-points must stay free");
    }

    #[test]
    fn stationary_constrains_over_time_mean() {
        let mut draws = random_draws(30, 4, 3, 6);
        let time = TimeProcess::Stationary { ar: 0.5 };
        let anchors = AnchorPair::new(0, 3).unwrap();
        let targets = AnchorTargets::new(1.0, -1.0).unwrap();
        apply_affine(&mut draws, anchors, targets, time, 1e-6).unwrap();
        for d in 0..draws.n_draws() {
            assert_relative_eq!(anchored_value(&draws, time, d, 0), 1.0, epsilon = 1e-10);
            assert_relative_eq!(anchored_value(&draws, time, d, 3), -1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn variance_cap_bounds_step_sd_and_preserves_means() {
        let mut draws = random_draws(40, 5, 6, 7);
        let time = TimeProcess::Stationary { ar: 0.3 };
        let before: Vec<f64> = (0..draws.n_draws())
            .map(|d| anchored_value(&draws, time, d, 2))
            .collect();
        let cap = 0.4;
        apply_variance_cap(&mut draws, cap);
        for d in 0..draws.n_draws() {
            for p in 0..draws.n_persons() {
                assert!(realized_step_sd(&draws, d, p) <= cap + 1e-10);
            }
            assert_relative_eq!(
                anchored_value(&draws, time, d, 2),
                before[d],
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn variance_cap_leaves_tame_trajectories_alone() {
        let theta = Array2::from_shape_vec((1, 3), vec![0.0, 0.1, 0.2]).unwrap();
        let mut draws = Draws::new(
            1,
            3,
            1,
            1,
            1,
            theta.clone(),
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
            None,
            None,
        );
        apply_variance_cap(&mut draws, 1.0);
        assert_eq!(draws.theta(), &theta);
    }
}
