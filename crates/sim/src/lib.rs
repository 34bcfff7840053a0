//! Synthetic response data for every model variant, with ground truth.
//!
//! The generator draws true traits (static, random-walk, or AR-1 over
//! time), item parameters, and inflation parameters, then emits a
//! [`ResponseData`] in long format together with the values that produced
//! it. Intended for end-to-end tests and the `simulate` subcommand.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Poisson, StandardNormal};
use tracing::debug;

use solon_data::ResponseData;
use solon_model::family::sigmoid;
use solon_model::{ModelType, OutcomeFamily, TimeProcess};

/// Error type for all fallible operations in the solon-sim crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SimError {
    /// Returned when a simulation configuration value is out of range.
    #[error("invalid simulation config: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

/// Simulation configuration.
///
/// # Example
///
/// ```
/// use solon_model::ModelType;
/// use solon_sim::SimConfig;
///
/// let config = SimConfig::new(ModelType::Binary, 20, 10)
///     .with_trait_spread(2.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    model_type: ModelType,
    n_persons: usize,
    n_items: usize,
    time_process: TimeProcess,
    n_time: usize,
    /// Standard deviation of the true trait distribution.
    trait_spread: f64,
    /// Innovation sd of the over-time process.
    evolution_sd: f64,
    /// Residual sd for the normal and lognormal families.
    sigma: f64,
    /// Number of ordinal categories for the rating-scale and GRM families.
    n_categories: usize,
    /// Completely-at-random missingness applied to non-inflated variants.
    mcar_rate: f64,
}

impl SimConfig {
    /// Creates a configuration: static traits, spread 1.0, 4 ordinal
    /// categories, no random missingness.
    pub fn new(model_type: ModelType, n_persons: usize, n_items: usize) -> Self {
        Self {
            model_type,
            n_persons,
            n_items,
            time_process: TimeProcess::Static,
            n_time: 1,
            trait_spread: 1.0,
            evolution_sd: 0.25,
            sigma: 0.5,
            n_categories: 4,
            mcar_rate: 0.0,
        }
    }

    /// Sets the over-time process and time-point count.
    pub fn with_time_process(mut self, time_process: TimeProcess, n_time: usize) -> Self {
        self.time_process = time_process;
        self.n_time = n_time;
        self
    }

    /// Sets the true trait spread.
    pub fn with_trait_spread(mut self, spread: f64) -> Self {
        self.trait_spread = spread;
        self
    }

    /// Sets the innovation sd of the over-time process.
    pub fn with_evolution_sd(mut self, sd: f64) -> Self {
        self.evolution_sd = sd;
        self
    }

    /// Sets the residual sd for the normal families.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    /// Sets the ordinal category count.
    pub fn with_categories(mut self, n: usize) -> Self {
        self.n_categories = n;
        self
    }

    /// Sets a completely-at-random missingness rate for non-inflated
    /// variants.
    pub fn with_mcar_rate(mut self, rate: f64) -> Self {
        self.mcar_rate = rate;
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

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), SimError> {
        let fail = |reason: String| Err(SimError::InvalidConfig { reason });
        if self.n_persons < 2 {
            return fail(format!("need at least 2 persons, got {}", self.n_persons));
        }
        if self.n_items == 0 {
            return fail("need at least 1 item".to_string());
        }
        if self.n_time == 0 {
            return fail("need at least 1 time point".to_string());
        }
        if matches!(self.time_process, TimeProcess::Static) && self.n_time != 1 {
            return fail(format!(
                "static traits admit exactly 1 time point, got {}",
                self.n_time
            ));
        }
        if self.n_categories < 3 {
            return fail(format!(
                "ordinal families need >= 3 categories, got {}",
                self.n_categories
            ));
        }
        if !(0.0..1.0).contains(&self.mcar_rate) {
            return fail(format!("mcar_rate must be in [0, 1), got {}", self.mcar_rate));
        }
        for (name, v) in [
            ("trait_spread", self.trait_spread),
            ("evolution_sd", self.evolution_sd),
            ("sigma", self.sigma),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return fail(format!("{name} must be finite and positive, got {v}"));
            }
        }
        Ok(())
    }
}

/// The parameter values a simulated data set was generated from.
#[derive(Debug, Clone)]
pub struct SimTruth {
    /// True traits, slot layout `person * n_time + time`.
    pub theta: Vec<f64>,
    /// True discriminations (latent-space: intercepts).
    pub disc: Vec<f64>,
    /// True difficulties (latent-space: locations).
    pub diff: Vec<f64>,
    /// True absence discriminations (empty for non-inflated variants).
    pub abs_disc: Vec<f64>,
    /// True absence difficulties (empty for non-inflated variants).
    pub abs_diff: Vec<f64>,
    /// Ordinal cutpoints used (empty for non-ordinal families).
    pub cutpoints: Vec<f64>,
}

impl SimTruth {
    /// True trait of person `p` at time `t`.
    pub fn theta_at(&self, person: usize, n_time: usize, t: usize) -> f64 {
        self.theta[person * n_time + t]
    }
}

/// A simulated data set plus its ground truth.
#[derive(Debug, Clone)]
pub struct SimOutput {
    /// Long-format response data.
    pub data: ResponseData,
    /// The generating parameter values.
    pub truth: SimTruth,
}

/// Simulates a complete response data set.
pub fn simulate(config: &SimConfig, rng: &mut StdRng) -> Result<SimOutput, SimError> {
    config.validate()?;
    let family = config.model_type.family();
    let inflated = config.model_type.inflated();
    let n_time = config.n_time;

    let theta = simulate_traits(config, rng);
    let disc: Vec<f64> = (0..config.n_items)
        .map(|_| match family {
            // Latent-space intercepts sit above zero so some agreement is
            // possible at distance zero.
            OutcomeFamily::LatentSpace => 1.0 + 0.5 * std_normal(rng).abs(),
            _ => 0.5 + std_normal(rng).abs(),
        })
        .collect();
    let diff: Vec<f64> = (0..config.n_items).map(|_| 0.75 * std_normal(rng)).collect();
    let (abs_disc, abs_diff): (Vec<f64>, Vec<f64>) = if inflated {
        (
            (0..config.n_items).map(|_| 0.5 + 0.5 * std_normal(rng).abs()).collect(),
            (0..config.n_items).map(|_| 1.0 + 0.5 * std_normal(rng)).collect(),
        )
    } else {
        (Vec::new(), Vec::new())
    };

    // Evenly spaced cutpoints spanning about two trait spreads.
    let cutpoints: Vec<f64> = if config.model_type.ordinal() {
        let k = config.n_categories - 1;
        (0..k)
            .map(|i| -1.5 + 3.0 * i as f64 / (k - 1).max(1) as f64)
            .collect()
    } else {
        Vec::new()
    };

    let mut person_idx = Vec::new();
    let mut item_idx = Vec::new();
    let mut time_idx = Vec::new();
    let mut outcome = Vec::new();
    let mut missing = Vec::new();

    for p in 0..config.n_persons {
        for t in 0..n_time {
            let th = theta[p * n_time + t];
            for j in 0..config.n_items {
                let is_missing = if inflated {
                    let eta_miss = abs_disc[j] * th - abs_diff[j];
                    rng.random::<f64>() < sigmoid(eta_miss)
                } else {
                    config.mcar_rate > 0.0 && rng.random::<f64>() < config.mcar_rate
                };

                person_idx.push(p);
                item_idx.push(j);
                time_idx.push(t);
                missing.push(is_missing);
                if is_missing {
                    outcome.push(f64::NAN);
                } else {
                    let eta = match family {
                        OutcomeFamily::LatentSpace => disc[j] - (th - diff[j]).abs(),
                        _ => disc[j] * th - diff[j],
                    };
                    outcome.push(draw_outcome(family, eta, &cutpoints, config.sigma, rng));
                }
            }
        }
    }

    let data = ResponseData::from_parts(
        (0..config.n_persons).map(|p| format!("person_{p:03}")).collect(),
        (0..config.n_items).map(|j| format!("item_{j:03}")).collect(),
        vec!["all".to_string()],
        if n_time > 1 { (0..n_time as i64).collect() } else { Vec::new() },
        vec![0; config.n_persons],
        person_idx,
        item_idx,
        time_idx,
        outcome,
        missing,
    )
    .map_err(|e| SimError::InvalidConfig {
        reason: format!("generated data failed validation: {e}"),
    })?;

    debug!(
        rows = data.len(),
        persons = config.n_persons,
        items = config.n_items,
        "simulation complete"
    );
    Ok(SimOutput {
        data,
        truth: SimTruth {
            theta,
            disc,
            diff,
            abs_disc,
            abs_diff,
            cutpoints,
        },
    })
}

/// True trait trajectories under the configured over-time process.
fn simulate_traits(config: &SimConfig, rng: &mut StdRng) -> Vec<f64> {
    let n_time = config.n_time;
    let mut theta = vec![0.0; config.n_persons * n_time];
    for p in 0..config.n_persons {
        match config.time_process {
            TimeProcess::Static => {
                theta[p] = config.trait_spread * std_normal(rng);
            }
            TimeProcess::RandomWalk => {
                let mut x = config.trait_spread * std_normal(rng);
                for t in 0..n_time {
                    theta[p * n_time + t] = x;
                    x += config.evolution_sd * std_normal(rng);
                }
            }
            TimeProcess::Stationary { ar } => {
                let stat_sd = config.evolution_sd / (1.0 - ar * ar).sqrt();
                let center = config.trait_spread * std_normal(rng);
                let mut x = stat_sd * std_normal(rng);
                for t in 0..n_time {
                    theta[p * n_time + t] = center + x;
                    x = ar * x + config.evolution_sd * std_normal(rng);
                }
            }
        }
    }
    theta
}

/// One outcome draw from the configured family at predictor `eta`.
fn draw_outcome(
    family: OutcomeFamily,
    eta: f64,
    cutpoints: &[f64],
    sigma: f64,
    rng: &mut StdRng,
) -> f64 {
    match family {
        OutcomeFamily::Binary | OutcomeFamily::LatentSpace => {
            if rng.random::<f64>() < sigmoid(eta) {
                1.0
            } else {
                0.0
            }
        }
        OutcomeFamily::RatingScale | OutcomeFamily::Grm => {
            // Ordered logit: count how many cutpoints the latent value
            // clears. Categories come out 1-based, as survey data usually is.
            let u = rng.random::<f64>();
            let latent = eta + (u / (1.0 - u)).ln();
            let k = cutpoints.iter().filter(|&&c| latent > c).count();
            (k + 1) as f64
        }
        OutcomeFamily::Poisson => {
            let lambda = eta.clamp(-10.0, 10.0).exp();
            match Poisson::new(lambda) {
                Ok(dist) => dist.sample(rng),
                Err(_) => 0.0,
            }
        }
        OutcomeFamily::Normal => eta + sigma * std_normal(rng),
        OutcomeFamily::Lognormal => (eta + sigma * std_normal(rng)).exp(),
    }
}

fn std_normal(rng: &mut StdRng) -> f64 {
    rng.sample(StandardNormal)
}
