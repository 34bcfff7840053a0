//! Model taxonomy and outcome-family likelihoods for ideal-point estimation.
//!
//! This crate owns the fourteen outcome/missingness model variants, the
//! over-time process for time-varying traits, and the per-family
//! log-likelihood pieces (value plus first/second derivatives with respect
//! to the linear predictor) that the inference engines consume.
//!
//! # Quick start
//!
//! ```rust
//! use solon_model::{ModelSpec, ModelType, TimeProcess};
//!
//! let spec = ModelSpec::new(ModelType::Binary)
//!     .with_time_process(TimeProcess::RandomWalk);
//!
//! assert!(!spec.model_type().inflated());
//! assert_eq!(ModelType::from_code(2).unwrap(), ModelType::BinaryInflated);
//! ```

pub mod error;
pub mod family;
pub mod inflation;
pub mod model_type;
pub mod spec;

pub use error::ModelError;
pub use family::{
    binary_loglik, binary_score, cutpoints_from_counts, normal_loglik, normal_score,
    ordinal_loglik, ordinal_score, poisson_loglik, poisson_score,
};
pub use inflation::{inflation_loglik, inflation_score};
pub use model_type::{ModelType, OutcomeFamily};
pub use spec::{ModelSpec, TimeProcess};
