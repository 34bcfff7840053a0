//! Posterior draws and fit diagnostics.

use ndarray::Array2;

use crate::config::InferenceMode;

/// Posterior draws for every parameter block.
///
/// Trait draws are an iterations × (persons × time-points) matrix; the slot
/// for person `p` at time `t` is `p * n_time + t`. Rows are grouped by
/// chain: the first `draws_per_chain` rows belong to chain 0, and so on.
/// The matrix is unidentified as produced by an engine; the identification
/// step transforms it in place.
#[derive(Debug, Clone)]
pub struct Draws {
    n_person: usize,
    n_time: usize,
    n_item: usize,
    chains: usize,
    draws_per_chain: usize,
    theta: Array2<f64>,
    disc: Array2<f64>,
    diff: Array2<f64>,
    abs_disc: Option<Array2<f64>>,
    abs_diff: Option<Array2<f64>>,
}

impl Draws {
    /// Assembles draws from raw matrices. Rows of every matrix must be
    /// `chains * draws_per_chain`, grouped by chain.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n_person: usize,
        n_time: usize,
        n_item: usize,
        chains: usize,
        draws_per_chain: usize,
        theta: Array2<f64>,
        disc: Array2<f64>,
        diff: Array2<f64>,
        abs_disc: Option<Array2<f64>>,
        abs_diff: Option<Array2<f64>>,
    ) -> Self {
        debug_assert_eq!(theta.nrows(), chains * draws_per_chain);
        debug_assert_eq!(theta.ncols(), n_person * n_time);
        Self {
            n_person,
            n_time,
            n_item,
            chains,
            draws_per_chain,
            theta,
            disc,
            diff,
            abs_disc,
            abs_diff,
        }
    }

    /// Number of persons.
    pub fn n_persons(&self) -> usize {
        self.n_person
    }

    /// Number of time points (1 for static models).
    pub fn n_time(&self) -> usize {
        self.n_time
    }

    /// Number of items.
    pub fn n_items(&self) -> usize {
        self.n_item
    }

    /// Number of chains.
    pub fn chains(&self) -> usize {
        self.chains
    }

    /// Post-warmup draws per chain.
    pub fn draws_per_chain(&self) -> usize {
        self.draws_per_chain
    }

    /// Total number of draws across chains.
    pub fn n_draws(&self) -> usize {
        self.chains * self.draws_per_chain
    }

    /// Column index of person `p` at time `t`.
    pub fn slot(&self, person: usize, time: usize) -> usize {
        person * self.n_time + time
    }

    /// Trait draw matrix, iterations × (persons × time-points).
    pub fn theta(&self) -> &Array2<f64> {
        &self.theta
    }

    /// Mutable trait draw matrix (for the identification transform).
    pub fn theta_mut(&mut self) -> &mut Array2<f64> {
        &mut self.theta
    }

    /// Item discrimination draws (latent-space: item intercepts).
    pub fn disc(&self) -> &Array2<f64> {
        &self.disc
    }

    /// Item difficulty draws (latent-space: item locations).
    pub fn diff(&self) -> &Array2<f64> {
        &self.diff
    }

    /// Absence discrimination draws (inflated variants only).
    pub fn abs_disc(&self) -> Option<&Array2<f64>> {
        self.abs_disc.as_ref()
    }

    /// Absence difficulty draws (inflated variants only).
    pub fn abs_diff(&self) -> Option<&Array2<f64>> {
        self.abs_diff.as_ref()
    }

    /// Posterior mean of every trait slot.
    pub fn posterior_mean_theta(&self) -> Vec<f64> {
        let n = self.n_draws() as f64;
        (0..self.theta.ncols())
            .map(|s| self.theta.column(s).sum() / n)
            .collect()
    }

    /// Per-chain draw vectors for one trait slot, for convergence
    /// diagnostics.
    pub fn theta_chain_vectors(&self, slot: usize) -> Vec<Vec<f64>> {
        (0..self.chains)
            .map(|c| {
                (0..self.draws_per_chain)
                    .map(|d| self.theta[[c * self.draws_per_chain + d, slot]])
                    .collect()
            })
            .collect()
    }
}

/// Convergence diagnostics attached to a fit.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    /// Mode the fit ran under.
    pub mode: InferenceMode,
    /// Whether the engine's own convergence criterion was met.
    pub converged: bool,
    /// Final gradient norm of the mode search (approximate mode).
    pub grad_norm: Option<f64>,
    /// Worst split R-hat across trait parameters (sampling mode).
    pub max_rhat: Option<f64>,
    /// Core count requested in config (informational; built-in engines run
    /// chains sequentially).
    pub cores: usize,
}

/// A completed fit: draws plus diagnostics.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Posterior draws (unidentified).
    pub draws: Draws,
    /// Convergence diagnostics.
    pub diagnostics: Diagnostics,
}
