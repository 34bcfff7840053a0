//! Joint posterior evaluation: linear predictors, scores, and conditional
//! log-likelihoods shared by both engines.

use solon_data::ResponseData;
use solon_model::{
    binary_loglik, binary_score, cutpoints_from_counts, inflation_loglik, inflation_score,
    normal_loglik, normal_score, ordinal_loglik, ordinal_score, poisson_loglik, poisson_score,
    ModelSpec, OutcomeFamily, TimeProcess,
};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// One point in parameter space.
#[derive(Debug, Clone)]
pub(crate) struct ParamState {
    /// Latent traits, slot layout `person * n_time + time`.
    pub theta: Vec<f64>,
    /// Item discriminations (latent-space: item intercepts).
    pub disc: Vec<f64>,
    /// Item difficulties (latent-space: item locations).
    pub diff: Vec<f64>,
    /// Absence discriminations (inflated variants; empty otherwise).
    pub abs_disc: Vec<f64>,
    /// Absence difficulties (inflated variants; empty otherwise).
    pub abs_diff: Vec<f64>,
    /// Residual sd for the normal/lognormal families.
    pub sigma: f64,
}

/// Which item parameter a score/update refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemParam {
    Disc,
    Diff,
    AbsDisc,
    AbsDiff,
}

impl ItemParam {
    /// Parameters present for a given inflation setting.
    pub(crate) fn active(inflated: bool) -> &'static [ItemParam] {
        if inflated {
            &[
                ItemParam::Disc,
                ItemParam::Diff,
                ItemParam::AbsDisc,
                ItemParam::AbsDiff,
            ]
        } else {
            &[ItemParam::Disc, ItemParam::Diff]
        }
    }
}

/// Precomputed posterior context: adjusted outcomes, observation indices per
/// trait slot and per item, and ordinal cutpoints.
pub(crate) struct Posterior<'a> {
    pub family: OutcomeFamily,
    pub inflated: bool,
    pub time: TimeProcess,
    pub n_person: usize,
    pub n_time: usize,
    pub n_item: usize,
    /// Row ids contributing to each trait slot (missing rows included only
    /// under inflation, where absence is informative).
    pub rows_by_slot: Vec<Vec<usize>>,
    /// Row ids contributing to each item, same inclusion rule.
    pub rows_by_item: Vec<Vec<usize>>,
    /// Ordered-logit cutpoints per item (empty vectors for non-ordinal).
    pub cutpoints: Vec<Vec<f64>>,
    /// Adjusted outcomes: 0-based categories for ordinal, log scale for
    /// lognormal, 0/1 for binary and latent-space; NaN where missing.
    pub y: Vec<f64>,
    pub data: &'a ResponseData,
    pub cfg: &'a EngineConfig,
}

impl<'a> Posterior<'a> {
    /// Validates the model against the data and builds the context.
    pub(crate) fn new(
        data: &'a ResponseData,
        spec: &ModelSpec,
        cfg: &'a EngineConfig,
    ) -> Result<Self, EngineError> {
        cfg.validate()?;
        spec.validate()?;
        spec.validate_outcomes(data.outcome(), data.missing())?;

        let family = spec.model_type().family();
        let inflated = spec.model_type().inflated();
        let n_person = data.n_persons();
        let n_time = data.n_time();
        let n_item = data.n_items();

        // Adjusted outcomes.
        let mut y: Vec<f64> = vec![f64::NAN; data.len()];
        let observed: Vec<usize> = (0..data.len()).filter(|&i| !data.missing()[i]).collect();
        match family {
            OutcomeFamily::Binary | OutcomeFamily::LatentSpace => {
                for &i in &observed {
                    y[i] = if data.outcome()[i] > 0.5 { 1.0 } else { 0.0 };
                }
            }
            OutcomeFamily::RatingScale | OutcomeFamily::Grm => {
                let k0 = observed
                    .iter()
                    .map(|&i| data.outcome()[i] as i64)
                    .min()
                    .unwrap_or(0);
                for &i in &observed {
                    y[i] = (data.outcome()[i] as i64 - k0) as f64;
                }
            }
            OutcomeFamily::Poisson | OutcomeFamily::Normal => {
                for &i in &observed {
                    y[i] = data.outcome()[i];
                }
            }
            OutcomeFamily::Lognormal => {
                for &i in &observed {
                    y[i] = data.outcome()[i].ln();
                }
            }
        }

        // Ordinal cutpoints: shared for rating scale, per-item for GRM.
        let cutpoints: Vec<Vec<f64>> = if matches!(
            family,
            OutcomeFamily::RatingScale | OutcomeFamily::Grm
        ) {
            let n_cats = observed
                .iter()
                .map(|&i| y[i] as usize)
                .max()
                .unwrap_or(0)
                + 1;
            if family == OutcomeFamily::RatingScale {
                let mut counts = vec![0usize; n_cats];
                for &i in &observed {
                    counts[y[i] as usize] += 1;
                }
                let shared = cutpoints_from_counts(&counts);
                vec![shared; n_item]
            } else {
                (0..n_item)
                    .map(|j| {
                        let mut counts = vec![0usize; n_cats];
                        for &i in &observed {
                            if data.item_idx()[i] == j {
                                counts[y[i] as usize] += 1;
                            }
                        }
                        // An item with no responses at all falls back to the
                        // uniform spacing implied by all-zero counts.
                        cutpoints_from_counts(&counts)
                    })
                    .collect()
            }
        } else {
            vec![Vec::new(); n_item]
        };

        // Observation index lists.
        let mut rows_by_slot: Vec<Vec<usize>> = vec![Vec::new(); n_person * n_time];
        let mut rows_by_item: Vec<Vec<usize>> = vec![Vec::new(); n_item];
        for i in 0..data.len() {
            if data.missing()[i] && !inflated {
                continue;
            }
            let slot = data.person_idx()[i] * n_time + data.time_idx()[i];
            rows_by_slot[slot].push(i);
            rows_by_item[data.item_idx()[i]].push(i);
        }

        Ok(Self {
            family,
            inflated,
            time: spec.time_process(),
            n_person,
            n_time,
            n_item,
            rows_by_slot,
            rows_by_item,
            cutpoints,
            y,
            data,
            cfg,
        })
    }

    /// Number of trait slots.
    pub(crate) fn n_slots(&self) -> usize {
        self.n_person * self.n_time
    }

    /// Deterministic starting state: standardized person mean outcomes for
    /// the traits, unit discriminations, zero difficulties.
    pub(crate) fn initial_state(&self) -> ParamState {
        let means = self.data.person_mean_outcome();
        let finite: Vec<f64> = means.iter().copied().filter(|m| m.is_finite()).collect();
        let center = solon_stats::mean(&finite);
        let spread = solon_stats::sd(&finite).max(1e-6);

        let mut theta = vec![0.0; self.n_slots()];
        for p in 0..self.n_person {
            let z = if means[p].is_finite() {
                ((means[p] - center) / spread).clamp(-3.0, 3.0)
            } else {
                0.0
            };
            for t in 0..self.n_time {
                theta[p * self.n_time + t] = z;
            }
        }

        let sigma = match self.family {
            OutcomeFamily::Normal | OutcomeFamily::Lognormal => {
                let obs: Vec<f64> = self.y.iter().copied().filter(|v| v.is_finite()).collect();
                solon_stats::sd(&obs).max(0.05)
            }
            _ => 1.0,
        };

        let inflate_len = if self.inflated { self.n_item } else { 0 };
        ParamState {
            theta,
            disc: vec![1.0; self.n_item],
            diff: vec![0.0; self.n_item],
            abs_disc: vec![0.5; inflate_len],
            abs_diff: vec![0.0; inflate_len],
            sigma,
        }
    }

    /// Outcome linear predictor of one row.
    fn eta_outcome(&self, row: usize, state: &ParamState) -> f64 {
        let j = self.data.item_idx()[row];
        let slot = self.data.person_idx()[row] * self.n_time + self.data.time_idx()[row];
        let th = state.theta[slot];
        match self.family {
            OutcomeFamily::LatentSpace => state.disc[j] - (th - state.diff[j]).abs(),
            _ => state.disc[j] * th - state.diff[j],
        }
    }

    /// Absence linear predictor of one row (inflated variants).
    fn eta_miss(&self, row: usize, state: &ParamState) -> f64 {
        let j = self.data.item_idx()[row];
        let slot = self.data.person_idx()[row] * self.n_time + self.data.time_idx()[row];
        state.abs_disc[j] * state.theta[slot] - state.abs_diff[j]
    }

    /// Outcome log-likelihood of one observed row at predictor `eta`.
    fn family_loglik(&self, row: usize, eta: f64, state: &ParamState) -> f64 {
        let y = self.y[row];
        let j = self.data.item_idx()[row];
        match self.family {
            OutcomeFamily::Binary | OutcomeFamily::LatentSpace => binary_loglik(y, eta),
            OutcomeFamily::RatingScale | OutcomeFamily::Grm => {
                ordinal_loglik(y as usize, eta, &self.cutpoints[j])
            }
            OutcomeFamily::Poisson => poisson_loglik(y, eta),
            OutcomeFamily::Normal | OutcomeFamily::Lognormal => {
                normal_loglik(y, eta, state.sigma)
            }
        }
    }

    /// Outcome score of one observed row at predictor `eta`.
    fn family_score(&self, row: usize, eta: f64, state: &ParamState) -> (f64, f64) {
        let y = self.y[row];
        let j = self.data.item_idx()[row];
        match self.family {
            OutcomeFamily::Binary | OutcomeFamily::LatentSpace => binary_score(y, eta),
            OutcomeFamily::RatingScale | OutcomeFamily::Grm => {
                ordinal_score(y as usize, eta, &self.cutpoints[j])
            }
            OutcomeFamily::Poisson => poisson_score(y, eta),
            OutcomeFamily::Normal | OutcomeFamily::Lognormal => {
                normal_score(y, eta, state.sigma)
            }
        }
    }

    /// Full log-likelihood contribution of one row.
    pub(crate) fn row_loglik(&self, row: usize, state: &ParamState) -> f64 {
        let missing = self.data.missing()[row];
        let mut ll = 0.0;
        if self.inflated {
            ll += inflation_loglik(missing, self.eta_miss(row, state));
        }
        if !missing {
            ll += self.family_loglik(row, self.eta_outcome(row, state), state);
        }
        ll
    }

    /// Prior log-density factor "owned" by trait slot `(p, t)`: the density
    /// of `x_t` given its predecessor under the configured process.
    fn theta_prior_factor(&self, person: usize, t: usize, state: &ParamState) -> f64 {
        let x = state.theta[person * self.n_time + t];
        match self.time {
            TimeProcess::Static => ln_normal(x, 0.0, self.cfg.trait_prior_sd()),
            TimeProcess::RandomWalk => {
                if t == 0 {
                    ln_normal(x, 0.0, self.cfg.trait_prior_sd())
                } else {
                    let prev = state.theta[person * self.n_time + t - 1];
                    ln_normal(x, prev, self.cfg.evolution_sd())
                }
            }
            TimeProcess::Stationary { ar } => {
                if t == 0 {
                    let stat_sd = self.cfg.evolution_sd() / (1.0 - ar * ar).sqrt();
                    ln_normal(x, 0.0, stat_sd)
                } else {
                    let prev = state.theta[person * self.n_time + t - 1];
                    ln_normal(x, ar * prev, self.cfg.evolution_sd())
                }
            }
        }
    }

    /// Conditional log-posterior of one trait slot: its observations plus
    /// every prior factor that involves it.
    pub(crate) fn theta_conditional_loglik(&self, slot: usize, state: &ParamState) -> f64 {
        let person = slot / self.n_time;
        let t = slot % self.n_time;
        let mut ll = self.theta_prior_factor(person, t, state);
        if t + 1 < self.n_time {
            ll += self.theta_prior_factor(person, t + 1, state);
        }
        for &row in &self.rows_by_slot[slot] {
            ll += self.row_loglik(row, state);
        }
        ll
    }

    /// Gradient and curvature of the conditional log-posterior of one trait
    /// slot.
    pub(crate) fn theta_score(&self, slot: usize, state: &ParamState) -> (f64, f64) {
        let person = slot / self.n_time;
        let t = slot % self.n_time;
        let x = state.theta[slot];
        let ev2 = self.cfg.evolution_sd() * self.cfg.evolution_sd();
        let prior_var = self.cfg.trait_prior_sd() * self.cfg.trait_prior_sd();

        let (mut g, mut h) = match self.time {
            TimeProcess::Static => (-x / prior_var, -1.0 / prior_var),
            TimeProcess::RandomWalk => {
                let (mut g, mut h) = if t == 0 {
                    (-x / prior_var, -1.0 / prior_var)
                } else {
                    let prev = state.theta[slot - 1];
                    (-(x - prev) / ev2, -1.0 / ev2)
                };
                if t + 1 < self.n_time {
                    let next = state.theta[slot + 1];
                    g += (next - x) / ev2;
                    h -= 1.0 / ev2;
                }
                (g, h)
            }
            TimeProcess::Stationary { ar } => {
                let (mut g, mut h) = if t == 0 {
                    let stat_var = ev2 / (1.0 - ar * ar);
                    (-x / stat_var, -1.0 / stat_var)
                } else {
                    let prev = state.theta[slot - 1];
                    (-(x - ar * prev) / ev2, -1.0 / ev2)
                };
                if t + 1 < self.n_time {
                    let next = state.theta[slot + 1];
                    g += ar * (next - ar * x) / ev2;
                    h -= ar * ar / ev2;
                }
                (g, h)
            }
        };

        for &row in &self.rows_by_slot[slot] {
            let j = self.data.item_idx()[row];
            let missing = self.data.missing()[row];

            if !missing {
                let eta = self.eta_outcome(row, state);
                let deta = match self.family {
                    OutcomeFamily::LatentSpace => -sign(x - state.diff[j]),
                    _ => state.disc[j],
                };
                let (d1, d2) = self.family_score(row, eta, state);
                g += d1 * deta;
                h += d2 * deta * deta;
            }
            if self.inflated {
                let (d1, d2) = inflation_score(missing, self.eta_miss(row, state));
                let deta = state.abs_disc[j];
                g += d1 * deta;
                h += d2 * deta * deta;
            }
        }

        (g, h.min(-1e-8))
    }

    /// Conditional log-posterior of one item: its rows plus its parameter
    /// priors.
    pub(crate) fn item_conditional_loglik(&self, item: usize, state: &ParamState) -> f64 {
        let pv = self.cfg.item_prior_sd();
        let mut ll = ln_normal(state.disc[item], 0.0, pv) + ln_normal(state.diff[item], 0.0, pv);
        if self.inflated {
            ll += ln_normal(state.abs_disc[item], 0.0, pv)
                + ln_normal(state.abs_diff[item], 0.0, pv);
        }
        for &row in &self.rows_by_item[item] {
            ll += self.row_loglik(row, state);
        }
        ll
    }

    /// Gradient and curvature for one item parameter.
    pub(crate) fn item_score(
        &self,
        item: usize,
        which: ItemParam,
        state: &ParamState,
    ) -> (f64, f64) {
        let prior_var = self.cfg.item_prior_sd() * self.cfg.item_prior_sd();
        let current = match which {
            ItemParam::Disc => state.disc[item],
            ItemParam::Diff => state.diff[item],
            ItemParam::AbsDisc => state.abs_disc[item],
            ItemParam::AbsDiff => state.abs_diff[item],
        };
        let mut g = -current / prior_var;
        let mut h = -1.0 / prior_var;

        for &row in &self.rows_by_item[item] {
            let slot = self.data.person_idx()[row] * self.n_time + self.data.time_idx()[row];
            let th = state.theta[slot];
            let missing = self.data.missing()[row];

            match which {
                ItemParam::Disc | ItemParam::Diff => {
                    if missing {
                        continue;
                    }
                    let eta = self.eta_outcome(row, state);
                    let deta = match (self.family, which) {
                        (OutcomeFamily::LatentSpace, ItemParam::Disc) => 1.0,
                        (OutcomeFamily::LatentSpace, ItemParam::Diff) => {
                            sign(th - state.diff[item])
                        }
                        (_, ItemParam::Disc) => th,
                        (_, ItemParam::Diff) => -1.0,
                        _ => unreachable!(),
                    };
                    let (d1, d2) = self.family_score(row, eta, state);
                    g += d1 * deta;
                    h += d2 * deta * deta;
                }
                ItemParam::AbsDisc | ItemParam::AbsDiff => {
                    let deta = if which == ItemParam::AbsDisc { th } else { -1.0 };
                    let (d1, d2) = inflation_score(missing, self.eta_miss(row, state));
                    g += d1 * deta;
                    h += d2 * deta * deta;
                }
            }
        }

        (g, h.min(-1e-8))
    }

    /// Re-estimates the residual sd from current predictions (normal and
    /// lognormal families; no-op otherwise).
    pub(crate) fn update_sigma(&self, state: &mut ParamState) {
        if !matches!(
            self.family,
            OutcomeFamily::Normal | OutcomeFamily::Lognormal
        ) {
            return;
        }
        let mut ss = 0.0;
        let mut n = 0usize;
        for row in 0..self.data.len() {
            if self.data.missing()[row] {
                continue;
            }
            let r = self.y[row] - self.eta_outcome(row, state);
            ss += r * r;
            n += 1;
        }
        if n > 0 {
            state.sigma = (ss / n as f64).sqrt().max(0.05);
        }
    }
}

/// Log-density of `N(mean, sd)` at `x`.
fn ln_normal(x: f64, mean: f64, sd: f64) -> f64 {
    let z = (x - mean) / sd;
    -0.5 * z * z - sd.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln()
}

/// Sign with `sign(0) = 0` so the latent-space kink contributes no gradient
/// exactly at the item location.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use solon_data::ResponseData;
    use solon_model::ModelType;

    fn binary_data() -> ResponseData {
        // 3 persons x 2 items, fully observed.
        ResponseData::from_parts(
            vec!["a".into(), "b".into(), "c".into()],
            vec!["v1".into(), "v2".into()],
            vec!["all".into()],
            vec![],
            vec![0, 0, 0],
            vec![0, 0, 1, 1, 2, 2],
            vec![0, 1, 0, 1, 0, 1],
            vec![0; 6],
            vec![1.0, 1.0, 0.0, 1.0, 0.0, 0.0],
            vec![false; 6],
        )
        .unwrap()
    }

    #[test]
    fn theta_score_matches_numeric_gradient() {
        let data = binary_data();
        let cfg = EngineConfig::new();
        let spec = ModelSpec::new(ModelType::Binary);
        let post = Posterior::new(&data, &spec, &cfg).unwrap();
        let state = post.initial_state();

        for slot in 0..post.n_slots() {
            let (g, h) = post.theta_score(slot, &state);
            let hstep = 1e-6;
            let mut plus = state.clone();
            plus.theta[slot] += hstep;
            let mut minus = state.clone();
            minus.theta[slot] -= hstep;
            let num = (post.theta_conditional_loglik(slot, &plus)
                - post.theta_conditional_loglik(slot, &minus))
                / (2.0 * hstep);
            assert_relative_eq!(g, num, epsilon = 1e-4);
            assert!(h < 0.0);
        }
    }

    #[test]
    fn item_score_matches_numeric_gradient() {
        let data = binary_data();
        let cfg = EngineConfig::new();
        let spec = ModelSpec::new(ModelType::Binary);
        let post = Posterior::new(&data, &spec, &cfg).unwrap();
        let state = post.initial_state();

        for item in 0..post.n_item {
            for &which in ItemParam::active(false) {
                let (g, _) = post.item_score(item, which, &state);
                let hstep = 1e-6;
                let mut plus = state.clone();
                let mut minus = state.clone();
                match which {
                    ItemParam::Disc => {
                        plus.disc[item] += hstep;
                        minus.disc[item] -= hstep;
                    }
                    ItemParam::Diff => {
                        plus.diff[item] += hstep;
                        minus.diff[item] -= hstep;
                    }
                    _ => unreachable!(),
                }
                let num = (post.item_conditional_loglik(item, &plus)
                    - post.item_conditional_loglik(item, &minus))
                    / (2.0 * hstep);
                assert_relative_eq!(g, num, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn missing_rows_excluded_unless_inflated() {
        let data = ResponseData::from_parts(
            vec!["a".into(), "b".into()],
            vec!["v1".into()],
            vec!["all".into()],
            vec![],
            vec![0, 0],
            vec![0, 1],
            vec![0, 0],
            vec![0, 0],
            vec![1.0, f64::NAN],
            vec![false, true],
        )
        .unwrap();
        let cfg = EngineConfig::new();

        let plain = Posterior::new(&data, &ModelSpec::new(ModelType::Binary), &cfg).unwrap();
        assert_eq!(plain.rows_by_slot[1].len(), 0);

        let inflated =
            Posterior::new(&data, &ModelSpec::new(ModelType::BinaryInflated), &cfg).unwrap();
        assert_eq!(inflated.rows_by_slot[1].len(), 1);
        let state = inflated.initial_state();
        assert_eq!(state.abs_disc.len(), 1);
        // The missing row still contributes likelihood under inflation.
        assert!(inflated.row_loglik(1, &state) < 0.0);
    }

    #[test]
    fn ordinal_outcomes_rebased_to_zero() {
        // Categories coded 1..=3 must become 0..=2.
        let data = ResponseData::from_parts(
            vec!["a".into(), "b".into(), "c".into()],
            vec!["v1".into()],
            vec!["all".into()],
            vec![],
            vec![0, 0, 0],
            vec![0, 1, 2],
            vec![0, 0, 0],
            vec![0, 0, 0],
            vec![1.0, 2.0, 3.0],
            vec![false; 3],
        )
        .unwrap();
        let cfg = EngineConfig::new();
        let post =
            Posterior::new(&data, &ModelSpec::new(ModelType::RatingScale), &cfg).unwrap();
        assert_eq!(post.y, vec![0.0, 1.0, 2.0]);
        assert_eq!(post.cutpoints[0].len(), 2);
    }

    #[test]
    fn lognormal_moves_to_log_scale() {
        let data = ResponseData::from_parts(
            vec!["a".into(), "b".into(), "c".into()],
            vec!["v1".into()],
            vec!["all".into()],
            vec![],
            vec![0, 0, 0],
            vec![0, 1, 2],
            vec![0, 0, 0],
            vec![0, 0, 0],
            vec![1.0, std::f64::consts::E, 10.0],
            vec![false; 3],
        )
        .unwrap();
        let cfg = EngineConfig::new();
        let post = Posterior::new(&data, &ModelSpec::new(ModelType::Lognormal), &cfg).unwrap();
        assert_relative_eq!(post.y[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(post.y[1], 1.0, epsilon = 1e-12);
    }
}
