//! Model specification: variant, over-time process, and data validation.

use crate::error::ModelError;
use crate::model_type::{ModelType, OutcomeFamily};

/// How the latent trait evolves across time points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeProcess {
    /// One trait per person; no time dimension.
    Static,
    /// Non-stationary random walk: consecutive traits differ by an innovation.
    RandomWalk,
    /// Mean-reverting AR(1) around a per-person long-run mean.
    Stationary {
        /// Autoregressive coefficient, strictly inside (-1, 1).
        ar: f64,
    },
}

impl TimeProcess {
    /// Validates the process parameters.
    pub fn validate(&self) -> Result<(), ModelError> {
        if let TimeProcess::Stationary { ar } = self {
            if !ar.is_finite() || ar.abs() >= 1.0 {
                return Err(ModelError::InvalidArCoefficient { value: *ar });
            }
        }
        Ok(())
    }
}

/// A complete model specification: which of the fourteen variants to fit and
/// how the trait moves over time.
///
/// # Example
///
/// ```
/// use solon_model::{ModelSpec, ModelType, TimeProcess};
///
/// let spec = ModelSpec::new(ModelType::GrmInflated)
///     .with_time_process(TimeProcess::Stationary { ar: 0.5 });
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    model_type: ModelType,
    time_process: TimeProcess,
}

impl ModelSpec {
    /// Creates a specification with a static (time-invariant) trait.
    pub fn new(model_type: ModelType) -> Self {
        Self {
            model_type,
            time_process: TimeProcess::Static,
        }
    }

    /// Sets the over-time process.
    pub fn with_time_process(mut self, process: TimeProcess) -> Self {
        self.time_process = process;
        self
    }

    /// Returns the model variant.
    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    /// Returns the over-time process.
    pub fn time_process(&self) -> TimeProcess {
        self.time_process
    }

    /// Validates the specification's own parameters.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.time_process.validate()
    }

    /// Validates outcome values against this model variant.
    ///
    /// `outcomes` and `missing` are parallel vectors; masked entries are
    /// skipped (their recorded value is the sentinel, not a response).
    ///
    /// Checks: at least one observed outcome; discrete families see
    /// non-negative integers; ordinal families see at least three distinct
    /// categories; lognormal outcomes are strictly positive; everything
    /// observed is finite.
    pub fn validate_outcomes(&self, outcomes: &[f64], missing: &[bool]) -> Result<(), ModelError> {
        if outcomes.len() != missing.len() {
            return Err(ModelError::LengthMismatch {
                outcomes_len: outcomes.len(),
                mask_len: missing.len(),
            });
        }

        let observed: Vec<(usize, f64)> = outcomes
            .iter()
            .copied()
            .enumerate()
            .filter(|&(i, _)| !missing[i])
            .collect();
        if observed.is_empty() {
            return Err(ModelError::NoObservedOutcomes);
        }

        for &(row, y) in &observed {
            if !y.is_finite() {
                return Err(ModelError::NonFiniteOutcome { row });
            }
        }

        match self.model_type.family() {
            OutcomeFamily::Binary | OutcomeFamily::LatentSpace => {
                for &(_, y) in &observed {
                    if y.fract() != 0.0 {
                        return Err(ModelError::NonIntegerOutcome { value: y });
                    }
                    if y < 0.0 {
                        return Err(ModelError::NegativeOutcome { value: y });
                    }
                }
            }
            OutcomeFamily::RatingScale | OutcomeFamily::Grm => {
                let mut cats: Vec<i64> = Vec::new();
                for &(_, y) in &observed {
                    if y.fract() != 0.0 {
                        return Err(ModelError::NonIntegerOutcome { value: y });
                    }
                    if y < 0.0 {
                        return Err(ModelError::NegativeOutcome { value: y });
                    }
                    let k = y as i64;
                    if !cats.contains(&k) {
                        cats.push(k);
                    }
                }
                if cats.len() < 3 {
                    return Err(ModelError::TooFewCategories {
                        got: cats.len(),
                        min: 3,
                    });
                }
            }
            OutcomeFamily::Poisson => {
                for &(_, y) in &observed {
                    if y.fract() != 0.0 {
                        return Err(ModelError::NonIntegerOutcome { value: y });
                    }
                    if y < 0.0 {
                        return Err(ModelError::NegativeOutcome { value: y });
                    }
                }
            }
            OutcomeFamily::Normal => {}
            OutcomeFamily::Lognormal => {
                for &(_, y) in &observed {
                    if y <= 0.0 {
                        return Err(ModelError::NonPositiveOutcome { value: y });
                    }
                }
            }
        }

        Ok(())
    }

    /// Number of distinct observed outcome categories (discrete families).
    pub fn observed_categories(outcomes: &[f64], missing: &[bool]) -> usize {
        let mut cats: Vec<i64> = Vec::new();
        for (i, &y) in outcomes.iter().enumerate() {
            if missing.get(i).copied().unwrap_or(false) || !y.is_finite() {
                continue;
            }
            let k = y as i64;
            if !cats.contains(&k) {
                cats.push(k);
            }
        }
        cats.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stationary_ar_bounds() {
        assert!(TimeProcess::Stationary { ar: 0.8 }.validate().is_ok());
        assert!(TimeProcess::Stationary { ar: -0.8 }.validate().is_ok());
        assert!(matches!(
            TimeProcess::Stationary { ar: 1.0 }.validate(),
            Err(ModelError::InvalidArCoefficient { .. })
        ));
        assert!(matches!(
            TimeProcess::Stationary { ar: f64::NAN }.validate(),
            Err(ModelError::InvalidArCoefficient { .. })
        ));
    }

    #[test]
    fn binary_accepts_zero_one() {
        let spec = ModelSpec::new(ModelType::Binary);
        let y = [0.0, 1.0, 1.0, 0.0];
        let miss = [false; 4];
        assert!(spec.validate_outcomes(&y, &miss).is_ok());
    }

    #[test]
    fn binary_rejects_fractional() {
        let spec = ModelSpec::new(ModelType::Binary);
        let res = spec.validate_outcomes(&[0.0, 0.5], &[false, false]);
        assert!(matches!(res, Err(ModelError::NonIntegerOutcome { .. })));
    }

    #[test]
    fn ordinal_needs_three_categories() {
        let spec = ModelSpec::new(ModelType::RatingScale);
        let res = spec.validate_outcomes(&[0.0, 1.0, 1.0], &[false; 3]);
        assert!(matches!(
            res,
            Err(ModelError::TooFewCategories { got: 2, min: 3 })
        ));
        assert!(spec
            .validate_outcomes(&[0.0, 1.0, 2.0], &[false; 3])
            .is_ok());
    }

    #[test]
    fn lognormal_rejects_non_positive() {
        let spec = ModelSpec::new(ModelType::Lognormal);
        let res = spec.validate_outcomes(&[1.0, 0.0], &[false, false]);
        assert!(matches!(res, Err(ModelError::NonPositiveOutcome { .. })));
    }

    #[test]
    fn masked_rows_are_skipped() {
        // The masked -9 sentinel must not trip validation.
        let spec = ModelSpec::new(ModelType::Poisson);
        let y = [2.0, -9.0, 3.0];
        let miss = [false, true, false];
        assert!(spec.validate_outcomes(&y, &miss).is_ok());
    }

    #[test]
    fn all_missing_is_an_error() {
        let spec = ModelSpec::new(ModelType::Binary);
        let res = spec.validate_outcomes(&[-9.0, -9.0], &[true, true]);
        assert!(matches!(res, Err(ModelError::NoObservedOutcomes)));
    }

    #[test]
    fn length_mismatch() {
        let spec = ModelSpec::new(ModelType::Binary);
        let res = spec.validate_outcomes(&[0.0, 1.0], &[false]);
        assert!(matches!(res, Err(ModelError::LengthMismatch { .. })));
    }

    #[test]
    fn observed_categories_counts_distinct() {
        let y = [0.0, 1.0, 2.0, 2.0, -9.0];
        let miss = [false, false, false, false, true];
        assert_eq!(ModelSpec::observed_categories(&y, &miss), 3);
    }
}
