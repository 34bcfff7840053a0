//! Error types for the solon-engine crate.

use solon_model::ModelError;

/// Error type for all fallible operations in the solon-engine crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// Returned when an engine configuration value is out of range.
    #[error("invalid engine config: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Wraps a model/data validation failure detected before fitting.
    #[error("model validation failed: {0}")]
    Model(#[from] ModelError),

    /// Returned by the full-sampling engine when the convergence diagnostic
    /// is out of range. Carries the offending statistic.
    #[error("sampler did not converge: max split R-hat {max_rhat:.3} exceeds {threshold:.3}")]
    NotConverged {
        /// Worst split R-hat across trait parameters.
        max_rhat: f64,
        /// Configured acceptance threshold.
        threshold: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_config() {
        let e = EngineError::InvalidConfig {
            reason: "chains must be >= 1".to_string(),
        };
        assert_eq!(e.to_string(), "invalid engine config: chains must be >= 1");
    }

    #[test]
    fn error_not_converged_carries_statistic() {
        let e = EngineError::NotConverged {
            max_rhat: 1.372,
            threshold: 1.1,
        };
        assert_eq!(
            e.to_string(),
            "sampler did not converge: max split R-hat 1.372 exceeds 1.100"
        );
    }

    #[test]
    fn error_wraps_model_error() {
        let e: EngineError = ModelError::NoObservedOutcomes.into();
        assert!(e.to_string().contains("every response is missing"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<EngineError>();
    }
}
