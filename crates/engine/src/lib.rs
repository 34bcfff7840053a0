//! Inference engines producing unidentified posterior draws.
//!
//! Two built-in engines implement the [`Inference`] trait: [`LaplaceEngine`]
//! approximates the posterior with curvature-scaled pseudo-draws around the
//! mode, and [`McmcEngine`] runs full Metropolis-within-Gibbs chains with a
//! split R-hat guard. Both emit [`Draws`] in the same slot layout, so the
//! identification step downstream is engine-agnostic.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use solon_data::{read_csv, ReaderConfig};
//! use solon_engine::{EngineConfig, Inference, LaplaceEngine};
//! use solon_model::{ModelSpec, ModelType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = read_csv(Path::new("votes.csv"), &ReaderConfig::new())?;
//! let spec = ModelSpec::new(ModelType::Binary);
//! let config = EngineConfig::new();
//! let mut rng = StdRng::seed_from_u64(42);
//! let fit = LaplaceEngine::new().run(&data, &spec, &config, &mut rng)?;
//! println!("converged: {}", fit.diagnostics.converged);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod draws;
pub mod error;
mod laplace;
mod likelihood;
mod mcmc;

pub use config::{EngineConfig, InferenceMode};
pub use draws::{Diagnostics, Draws, FitResult};
pub use error::EngineError;
pub use laplace::LaplaceEngine;
pub use mcmc::McmcEngine;

use rand::rngs::StdRng;
use solon_data::ResponseData;
use solon_model::ModelSpec;

/// A sampler that turns response data plus a model into posterior draws.
///
/// Implementations must be deterministic given the seed state of `rng` and
/// must leave the draws unidentified; polarity and location/scale are fixed
/// by the identification step afterwards.
pub trait Inference {
    /// Fits the model and returns draws plus diagnostics.
    fn run(
        &self,
        data: &ResponseData,
        spec: &ModelSpec,
        config: &EngineConfig,
        rng: &mut StdRng,
    ) -> Result<FitResult, EngineError>;
}
