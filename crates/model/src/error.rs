//! Error types for the solon-model crate.

/// Error type for all fallible operations in the solon-model crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// Returned when a numeric model code is outside 1..=14.
    #[error("unknown model code: {code} (must be 1..=14)")]
    UnknownModelCode {
        /// The offending code.
        code: u8,
    },

    /// Returned when no non-missing outcomes remain after applying the mask.
    #[error("no observed outcomes: every response is missing")]
    NoObservedOutcomes,

    /// Returned when an ordinal model sees too few distinct categories.
    #[error("too few outcome categories: observed {got}, need at least {min}")]
    TooFewCategories {
        /// Distinct categories observed in the data.
        got: usize,
        /// Minimum required for the model variant.
        min: usize,
    },

    /// Returned when a discrete-outcome model sees a non-integer value.
    #[error("non-integer outcome {value} for a discrete model variant")]
    NonIntegerOutcome {
        /// The offending outcome value.
        value: f64,
    },

    /// Returned when a count model sees a negative outcome.
    #[error("negative outcome {value} for a count model variant")]
    NegativeOutcome {
        /// The offending outcome value.
        value: f64,
    },

    /// Returned when a lognormal model sees a non-positive outcome.
    #[error("non-positive outcome {value} for a lognormal model variant")]
    NonPositiveOutcome {
        /// The offending outcome value.
        value: f64,
    },

    /// Returned when an outcome is NaN or infinite.
    #[error("non-finite outcome at row {row}")]
    NonFiniteOutcome {
        /// Zero-based row index into the response vectors.
        row: usize,
    },

    /// Returned when the stationary autoregressive coefficient is outside (-1, 1).
    #[error("invalid AR coefficient {value} (must be finite and in (-1, 1))")]
    InvalidArCoefficient {
        /// The offending coefficient.
        value: f64,
    },

    /// Returned when outcome and missing-mask vectors differ in length.
    #[error("length mismatch: outcomes has {outcomes_len} elements, mask has {mask_len}")]
    LengthMismatch {
        /// Length of the outcome vector.
        outcomes_len: usize,
        /// Length of the missing mask.
        mask_len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_unknown_code() {
        let e = ModelError::UnknownModelCode { code: 15 };
        assert_eq!(e.to_string(), "unknown model code: 15 (must be 1..=14)");
    }

    #[test]
    fn error_too_few_categories() {
        let e = ModelError::TooFewCategories { got: 2, min: 3 };
        assert_eq!(
            e.to_string(),
            "too few outcome categories: observed 2, need at least 3"
        );
    }

    #[test]
    fn error_non_integer() {
        let e = ModelError::NonIntegerOutcome { value: 1.5 };
        assert_eq!(
            e.to_string(),
            "non-integer outcome 1.5 for a discrete model variant"
        );
    }

    #[test]
    fn error_invalid_ar() {
        let e = ModelError::InvalidArCoefficient { value: 1.2 };
        assert_eq!(
            e.to_string(),
            "invalid AR coefficient 1.2 (must be finite and in (-1, 1))"
        );
    }

    #[test]
    fn error_is_std_error() {
        fn assert_impl<T: std::error::Error>() {}
        assert_impl::<ModelError>();
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<ModelError>();
    }
}
