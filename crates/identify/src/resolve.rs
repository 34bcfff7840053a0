//! The resolution driver: fit, anchor, transform, retry on bad chains.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use solon_data::ResponseData;
use solon_engine::{Diagnostics, Draws, EngineConfig, EngineError, Inference};
use solon_model::{ModelSpec, TimeProcess};

use crate::anchors::select_anchors;
use crate::config::{AnchorPair, AnchorTargets, IdentifyConfig};
use crate::error::IdentifyError;
use crate::transform::{apply_affine, apply_variance_cap, AffineSummary};

/// Where a resolution run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyState {
    /// Draws exist (or are being produced) with no constraints applied.
    Unconstrained,
    /// The high anchor person and target are fixed.
    HighAnchorFixed,
    /// Both anchors are fixed; the affine solve is ready.
    LowAnchorFixed,
    /// The transform has been applied.
    Identified,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct IdentifyReport {
    /// Final state (always [`IdentifyState::Identified`] on success).
    pub state: IdentifyState,
    /// Anchor persons used.
    pub anchors: AnchorPair,
    /// Target values used.
    pub targets: AnchorTargets,
    /// Number of fit attempts consumed (1 when the first fit converged).
    pub attempts: usize,
    /// Transform summary of the accepted fit.
    pub affine: AffineSummary,
    /// Engine diagnostics of the accepted fit (`None` when an existing
    /// draw matrix was re-identified without refitting).
    pub diagnostics: Option<Diagnostics>,
}

/// Fits the model and identifies the trait draws.
///
/// The driver walks `Unconstrained → HighAnchorFixed → LowAnchorFixed →
/// Identified`. A fit that fails its convergence guard sends the driver
/// back to `Unconstrained` with a fresh seed, at most
/// [`IdentifyConfig::max_attempts`] times; the last diagnostic is surfaced
/// when the budget runs out. Anchors and targets come from the
/// configuration when given, otherwise from the unidentified fit itself.
pub fn resolve<E: Inference>(
    engine: &E,
    data: &ResponseData,
    spec: &ModelSpec,
    engine_config: &EngineConfig,
    identify_config: &IdentifyConfig,
    seed: u64,
) -> Result<(Draws, IdentifyReport), IdentifyError> {
    identify_config.validate()?;

    let mut last_failure: Option<EngineError> = None;
    for attempt in 0..identify_config.max_attempts() {
        let mut state = IdentifyState::Unconstrained;
        debug!(attempt, ?state, "starting fit");
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(attempt as u64));

        let fit = match engine.run(data, spec, engine_config, &mut rng) {
            Ok(fit) => fit,
            Err(e @ EngineError::NotConverged { .. }) => {
                warn!(attempt, error = %e, "fit rejected by convergence guard, reseeding");
                last_failure = Some(e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let mut draws = fit.draws;
        let time = spec.time_process();

        let (anchors, targets) = match (identify_config.anchors(), identify_config.targets()) {
            (Some(anchors), Some(targets)) => (anchors, targets),
            (Some(anchors), None) => {
                let targets = targets_from_posterior(&draws, time, anchors, identify_config)?;
                (anchors, targets)
            }
            (None, explicit_targets) => {
                let (anchors, selected) =
                    select_anchors(&draws, time, identify_config.epsilon())?;
                (anchors, explicit_targets.unwrap_or(selected))
            }
        };
        state = IdentifyState::HighAnchorFixed;
        debug!(?state, person = anchors.high, target = targets.high, "high anchor fixed");
        state = IdentifyState::LowAnchorFixed;
        debug!(?state, person = anchors.low, target = targets.low, "low anchor fixed");

        let affine = apply_affine(
            &mut draws,
            anchors,
            targets,
            time,
            identify_config.epsilon(),
        )?;
        if let (TimeProcess::Stationary { .. }, Some(cap)) =
            (time, identify_config.variance_cap())
        {
            apply_variance_cap(&mut draws, cap);
        }
        state = IdentifyState::Identified;

        info!(
            attempt,
            high = anchors.high,
            low = anchors.low,
            flipped = affine.flipped_draws,
            "identification complete"
        );
        return Ok((
            draws,
            IdentifyReport {
                state,
                anchors,
                targets,
                attempts: attempt + 1,
                affine,
                diagnostics: Some(fit.diagnostics),
            },
        ));
    }

    let attempts = identify_config.max_attempts();
    match last_failure {
        Some(last) => Err(IdentifyError::AttemptsExhausted { attempts, last }),
        // max_attempts >= 1 guarantees the loop ran and recorded a failure.
        None => Err(IdentifyError::InvalidConfig {
            reason: "max_attempts must be >= 1".to_string(),
        }),
    }
}

/// Identifies an existing draw matrix in place, without refitting. Anchors
/// must be explicit; targets default to the anchors' posterior means.
pub fn identify_draws(
    draws: &mut Draws,
    time: TimeProcess,
    identify_config: &IdentifyConfig,
) -> Result<IdentifyReport, IdentifyError> {
    identify_config.validate()?;
    let (anchors, targets) = match (identify_config.anchors(), identify_config.targets()) {
        (Some(anchors), Some(targets)) => (anchors, targets),
        (Some(anchors), None) => (
            anchors,
            targets_from_posterior(draws, time, anchors, identify_config)?,
        ),
        (None, explicit_targets) => {
            let (anchors, selected) = select_anchors(draws, time, identify_config.epsilon())?;
            (anchors, explicit_targets.unwrap_or(selected))
        }
    };
    let affine = apply_affine(draws, anchors, targets, time, identify_config.epsilon())?;
    if let (TimeProcess::Stationary { .. }, Some(cap)) = (time, identify_config.variance_cap())
    {
        apply_variance_cap(draws, cap);
    }
    Ok(IdentifyReport {
        state: IdentifyState::Identified,
        anchors,
        targets,
        attempts: 1,
        affine,
        diagnostics: None,
    })
}

/// Targets for explicitly chosen anchors: their posterior means, oriented so
/// the high anchor ends up above the low anchor.
fn targets_from_posterior(
    draws: &Draws,
    time: TimeProcess,
    anchors: AnchorPair,
    config: &IdentifyConfig,
) -> Result<AnchorTargets, IdentifyError> {
    let n_persons = draws.n_persons();
    for person in [anchors.high, anchors.low] {
        if person >= n_persons {
            return Err(IdentifyError::AnchorOutOfRange { person, n_persons });
        }
    }
    let means = crate::transform::anchored_posterior_means(draws, time);
    let (a, b) = (means[anchors.high], means[anchors.low]);
    let separation = (a - b).abs();
    if separation < config.epsilon() {
        return Err(IdentifyError::DegenerateAnchors {
            separation,
            epsilon: config.epsilon(),
        });
    }
    // The unidentified polarity is arbitrary, so the larger mean becomes the
    // high target.
    AnchorTargets::new(a.max(b), a.min(b))
}
