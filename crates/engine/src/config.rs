//! Engine configuration.

use crate::error::EngineError;

/// Which inference mode to run.
///
/// `Approximate` trades accuracy for speed and treats non-convergence as a
/// diagnostic warning; `Sampling` runs full chains and treats an
/// out-of-range convergence statistic as a hard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceMode {
    /// Full sampling with multiple chains and an R-hat guard.
    Sampling,
    /// Fast posterior-mode approximation with curvature-scaled pseudo-draws.
    Approximate,
}

/// Configuration shared by the inference engines.
///
/// Use the builder methods to customise parameters.
///
/// # Example
///
/// ```
/// use solon_engine::{EngineConfig, InferenceMode};
///
/// let config = EngineConfig::new()
///     .with_mode(InferenceMode::Sampling)
///     .with_chains(4)
///     .with_iterations(2000, 1000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    mode: InferenceMode,
    chains: usize,
    cores: usize,
    iterations: usize,
    warmup: usize,
    rhat_threshold: f64,
    max_sweeps: usize,
    grad_tol: f64,
    proposal_scale: f64,
    trait_prior_sd: f64,
    item_prior_sd: f64,
    evolution_sd: f64,
}

impl EngineConfig {
    /// Creates a configuration with defaults: approximate mode, 2 chains,
    /// 1 core, 1000 iterations with 500 warmup, R-hat threshold 1.1.
    pub fn new() -> Self {
        Self {
            mode: InferenceMode::Approximate,
            chains: 2,
            cores: 1,
            iterations: 1000,
            warmup: 500,
            rhat_threshold: 1.1,
            max_sweeps: 200,
            grad_tol: 1e-3,
            proposal_scale: 2.4,
            trait_prior_sd: 1.0,
            item_prior_sd: 2.0,
            evolution_sd: 0.5,
        }
    }

    /// Sets the inference mode.
    pub fn with_mode(mut self, mode: InferenceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the number of chains (sampling mode).
    pub fn with_chains(mut self, chains: usize) -> Self {
        self.chains = chains;
        self
    }

    /// Sets the core count forwarded to diagnostics metadata. Chains run
    /// sequentially in the built-in engines; a real external engine would
    /// parallelise internally.
    pub fn with_cores(mut self, cores: usize) -> Self {
        self.cores = cores;
        self
    }

    /// Sets total and warmup iterations per chain.
    pub fn with_iterations(mut self, iterations: usize, warmup: usize) -> Self {
        self.iterations = iterations;
        self.warmup = warmup;
        self
    }

    /// Sets the split R-hat acceptance threshold.
    pub fn with_rhat_threshold(mut self, threshold: f64) -> Self {
        self.rhat_threshold = threshold;
        self
    }

    /// Sets the Newton sweep budget for the approximate engine.
    pub fn with_max_sweeps(mut self, sweeps: usize) -> Self {
        self.max_sweeps = sweeps;
        self
    }

    /// Sets the gradient-norm tolerance declaring the mode converged.
    pub fn with_grad_tol(mut self, tol: f64) -> Self {
        self.grad_tol = tol;
        self
    }

    /// Sets the random-walk proposal scale multiplier.
    pub fn with_proposal_scale(mut self, scale: f64) -> Self {
        self.proposal_scale = scale;
        self
    }

    /// Sets the innovation standard deviation of the over-time process.
    pub fn with_evolution_sd(mut self, sd: f64) -> Self {
        self.evolution_sd = sd;
        self
    }

    // --- Accessors ---

    /// Returns the inference mode.
    pub fn mode(&self) -> InferenceMode {
        self.mode
    }

    /// Returns the chain count.
    pub fn chains(&self) -> usize {
        self.chains
    }

    /// Returns the configured core count.
    pub fn cores(&self) -> usize {
        self.cores
    }

    /// Returns total iterations per chain.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns warmup iterations per chain.
    pub fn warmup(&self) -> usize {
        self.warmup
    }

    /// Returns the split R-hat acceptance threshold.
    pub fn rhat_threshold(&self) -> f64 {
        self.rhat_threshold
    }

    /// Returns the Newton sweep budget.
    pub fn max_sweeps(&self) -> usize {
        self.max_sweeps
    }

    /// Returns the gradient tolerance.
    pub fn grad_tol(&self) -> f64 {
        self.grad_tol
    }

    /// Returns the proposal scale multiplier.
    pub fn proposal_scale(&self) -> f64 {
        self.proposal_scale
    }

    /// Returns the prior standard deviation of the latent trait.
    pub fn trait_prior_sd(&self) -> f64 {
        self.trait_prior_sd
    }

    /// Returns the prior standard deviation of item parameters.
    pub fn item_prior_sd(&self) -> f64 {
        self.item_prior_sd
    }

    /// Returns the innovation standard deviation of the over-time process.
    pub fn evolution_sd(&self) -> f64 {
        self.evolution_sd
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |reason: String| Err(EngineError::InvalidConfig { reason });
        if self.chains == 0 {
            return fail("chains must be >= 1".to_string());
        }
        if self.iterations == 0 || self.warmup >= self.iterations {
            return fail(format!(
                "iterations ({}) must exceed warmup ({})",
                self.iterations, self.warmup
            ));
        }
        for (name, v) in [
            ("rhat_threshold", self.rhat_threshold),
            ("grad_tol", self.grad_tol),
            ("proposal_scale", self.proposal_scale),
            ("trait_prior_sd", self.trait_prior_sd),
            ("item_prior_sd", self.item_prior_sd),
            ("evolution_sd", self.evolution_sd),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return fail(format!("{name} must be finite and positive, got {v}"));
            }
        }
        if self.rhat_threshold <= 1.0 {
            return fail(format!(
                "rhat_threshold must exceed 1.0, got {}",
                self.rhat_threshold
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::new().validate().is_ok());
    }

    #[test]
    fn zero_chains_rejected() {
        let res = EngineConfig::new().with_chains(0).validate();
        assert!(matches!(res, Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn warmup_must_be_below_iterations() {
        let res = EngineConfig::new().with_iterations(100, 100).validate();
        assert!(matches!(res, Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn rhat_threshold_must_exceed_one() {
        let res = EngineConfig::new().with_rhat_threshold(0.9).validate();
        assert!(matches!(res, Err(EngineError::InvalidConfig { .. })));
    }
}
