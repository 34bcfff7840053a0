//! Error types for the solon-identify crate.

use solon_engine::EngineError;

/// Error type for all fallible operations in the solon-identify crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentifyError {
    /// Returned when an identification configuration value is out of range.
    #[error("invalid identify config: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when an anchor person index exceeds the data.
    #[error("anchor person index {person} out of range for {n_persons} persons")]
    AnchorOutOfRange {
        /// Offending person index.
        person: usize,
        /// Number of persons in the draws.
        n_persons: usize,
    },

    /// Returned when explicit targets are not ordered `high > low`.
    #[error("anchor targets must satisfy high > low, got high {high} and low {low}")]
    TargetsNotOrdered {
        /// Requested high target.
        high: f64,
        /// Requested low target.
        low: f64,
    },

    /// Returned when the anchors are too close together to solve the affine
    /// map. Carries the offending separation.
    #[error(
        "degenerate anchors: separation {separation:.3e} is below epsilon {epsilon:.3e}"
    )]
    DegenerateAnchors {
        /// Absolute separation between the anchors' values.
        separation: f64,
        /// Configured minimum separation.
        epsilon: f64,
    },

    /// Wraps a failure of the underlying inference engine.
    #[error("inference failed: {0}")]
    Engine(#[from] EngineError),

    /// Returned when every identification attempt ended with a
    /// non-converged fit.
    #[error("identification failed after {attempts} attempts")]
    AttemptsExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Diagnostic from the last attempt.
        #[source]
        last: EngineError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_degenerate_anchors() {
        let e = IdentifyError::DegenerateAnchors {
            separation: 1e-9,
            epsilon: 1e-6,
        };
        assert_eq!(
            e.to_string(),
            "degenerate anchors: separation 1.000e-9 is below epsilon 1.000e-6"
        );
    }

    #[test]
    fn error_targets_not_ordered() {
        let e = IdentifyError::TargetsNotOrdered {
            high: -1.0,
            low: 1.0,
        };
        assert_eq!(
            e.to_string(),
            "anchor targets must satisfy high > low, got high -1 and low 1"
        );
    }

    #[test]
    fn error_attempts_exhausted_has_source() {
        use std::error::Error;
        let e = IdentifyError::AttemptsExhausted {
            attempts: 3,
            last: EngineError::NotConverged {
                max_rhat: 1.4,
                threshold: 1.1,
            },
        };
        assert_eq!(e.to_string(), "identification failed after 3 attempts");
        assert!(e.source().is_some());
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<IdentifyError>();
    }
}
