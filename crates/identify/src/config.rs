//! Identification configuration: anchors, targets, and resolution knobs.

use crate::error::IdentifyError;

/// The two anchor persons, by person index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPair {
    /// Person pinned to the high end of the scale.
    pub high: usize,
    /// Person pinned to the low end of the scale.
    pub low: usize,
}

impl AnchorPair {
    /// Creates an anchor pair. The two persons must differ.
    pub fn new(high: usize, low: usize) -> Result<Self, IdentifyError> {
        if high == low {
            return Err(IdentifyError::InvalidConfig {
                reason: format!("anchor persons must differ, both are {high}"),
            });
        }
        Ok(Self { high, low })
    }
}

/// Explicit target values for the anchors, on the identified scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorTargets {
    /// Value the high anchor is pinned to.
    pub high: f64,
    /// Value the low anchor is pinned to.
    pub low: f64,
}

impl AnchorTargets {
    /// Creates explicit targets. Requires `high > low` and finite values.
    pub fn new(high: f64, low: f64) -> Result<Self, IdentifyError> {
        if !high.is_finite() || !low.is_finite() || high <= low {
            return Err(IdentifyError::TargetsNotOrdered { high, low });
        }
        Ok(Self { high, low })
    }
}

/// Configuration for the identification step.
///
/// With no anchors set, the resolver selects them automatically from an
/// unidentified fit (argmax and argmin of the posterior-mean traits) and
/// targets default to the anchors' posterior means.
///
/// # Example
///
/// ```
/// use solon_identify::{AnchorPair, AnchorTargets, IdentifyConfig};
///
/// # fn main() -> Result<(), solon_identify::IdentifyError> {
/// let config = IdentifyConfig::new()
///     .with_anchors(AnchorPair::new(0, 5)?)
///     .with_targets(AnchorTargets::new(1.0, -1.0)?)
///     .with_max_attempts(2);
/// assert!(config.validate().is_ok());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IdentifyConfig {
    anchors: Option<AnchorPair>,
    targets: Option<AnchorTargets>,
    epsilon: f64,
    variance_cap: Option<f64>,
    max_attempts: usize,
}

impl IdentifyConfig {
    /// Creates a configuration with defaults: automatic anchor selection,
    /// separation epsilon `1e-6`, no variance cap, 3 attempts.
    pub fn new() -> Self {
        Self {
            anchors: None,
            targets: None,
            epsilon: 1e-6,
            variance_cap: None,
            max_attempts: 3,
        }
    }

    /// Sets explicit anchor persons.
    pub fn with_anchors(mut self, anchors: AnchorPair) -> Self {
        self.anchors = Some(anchors);
        self
    }

    /// Sets explicit anchor targets.
    pub fn with_targets(mut self, targets: AnchorTargets) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Sets the minimum anchor separation below which the affine solve is
    /// refused.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Bounds the realized per-step standard deviation of stationary
    /// trajectories.
    pub fn with_variance_cap(mut self, cap: f64) -> Self {
        self.variance_cap = Some(cap);
        self
    }

    /// Sets how many reseeded fits may be attempted before giving up.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Returns the explicit anchors, if set.
    pub fn anchors(&self) -> Option<AnchorPair> {
        self.anchors
    }

    /// Returns the explicit targets, if set.
    pub fn targets(&self) -> Option<AnchorTargets> {
        self.targets
    }

    /// Returns the minimum anchor separation.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns the per-step sd cap, if set.
    pub fn variance_cap(&self) -> Option<f64> {
        self.variance_cap
    }

    /// Returns the attempt budget.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), IdentifyError> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(IdentifyError::InvalidConfig {
                reason: format!("epsilon must be finite and positive, got {}", self.epsilon),
            });
        }
        if let Some(cap) = self.variance_cap {
            if !cap.is_finite() || cap <= 0.0 {
                return Err(IdentifyError::InvalidConfig {
                    reason: format!("variance_cap must be finite and positive, got {cap}"),
                });
            }
        }
        if self.max_attempts == 0 {
            return Err(IdentifyError::InvalidConfig {
                reason: "max_attempts must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(IdentifyConfig::new().validate().is_ok());
    }

    #[test]
    fn identical_anchor_persons_rejected() {
        assert!(AnchorPair::new(3, 3).is_err());
    }

    #[test]
    fn unordered_targets_rejected() {
        assert!(AnchorTargets::new(-1.0, 1.0).is_err());
        assert!(AnchorTargets::new(1.0, 1.0).is_err());
        assert!(AnchorTargets::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn zero_attempts_rejected() {
        let res = IdentifyConfig::new().with_max_attempts(0).validate();
        assert!(matches!(res, Err(IdentifyError::InvalidConfig { .. })));
    }

    #[test]
    fn nonpositive_cap_rejected() {
        let res = IdentifyConfig::new().with_variance_cap(0.0).validate();
        assert!(matches!(res, Err(IdentifyError::InvalidConfig { .. })));
    }
}
