//! Pure conversion functions: TOML config structs -> crate API config types,
//! plus the bridge between in-memory draws and their Parquet table form.

use anyhow::{bail, Result};
use ndarray::Array2;

use solon_data::{DrawsTable, ReaderConfig, ResponseData};
use solon_engine::{Draws, EngineConfig, InferenceMode};
use solon_identify::{AnchorPair, AnchorTargets, IdentifyConfig};
use solon_model::{ModelSpec, ModelType, TimeProcess};
use solon_sim::SimConfig;

use crate::config::{DataToml, EngineToml, IdentifyToml, ModelToml, SimToml};

/// Parses a time-process name into the corresponding enum variant.
pub fn parse_time_process(s: &str, ar: f64) -> Result<TimeProcess> {
    match s.to_lowercase().as_str() {
        "static" => Ok(TimeProcess::Static),
        "random_walk" => Ok(TimeProcess::RandomWalk),
        "stationary" => Ok(TimeProcess::Stationary { ar }),
        other => bail!("unknown time process: {other:?}"),
    }
}

/// Parses an inference mode name into the corresponding enum variant.
pub fn parse_mode(s: &str) -> Result<InferenceMode> {
    match s.to_lowercase().as_str() {
        "approximate" => Ok(InferenceMode::Approximate),
        "sampling" => Ok(InferenceMode::Sampling),
        other => bail!("unknown inference mode: {other:?}"),
    }
}

/// Builds a [`ModelSpec`] from the TOML model configuration.
pub fn build_model_spec(model: &ModelToml) -> Result<ModelSpec> {
    let model_type = ModelType::from_code(model.model_code)?;
    let time = parse_time_process(&model.time_process, model.ar)?;
    let spec = ModelSpec::new(model_type).with_time_process(time);
    spec.validate()?;
    Ok(spec)
}

/// Builds a [`ReaderConfig`] from the TOML data configuration.
pub fn build_reader_config(data: &DataToml) -> ReaderConfig {
    let mut cfg = ReaderConfig::new()
        .with_person_col(&data.person_col)
        .with_item_col(&data.item_col)
        .with_outcome_col(&data.outcome_col);
    if let Some(ref col) = data.time_col {
        cfg = cfg.with_time_col(col);
    }
    if let Some(ref col) = data.group_col {
        cfg = cfg.with_group_col(col);
    }
    if let Some(ref sentinel) = data.missing_sentinel {
        cfg = cfg.with_missing_sentinel(sentinel);
    }
    cfg
}

/// Builds an [`EngineConfig`] from the TOML engine configuration.
pub fn build_engine_config(engine: &EngineToml) -> Result<EngineConfig> {
    let mode = parse_mode(&engine.mode)?;
    let mut cfg = EngineConfig::new()
        .with_mode(mode)
        .with_chains(engine.chains)
        .with_cores(engine.cores)
        .with_iterations(engine.iterations, engine.warmup)
        .with_rhat_threshold(engine.rhat_threshold);
    if let Some(sd) = engine.evolution_sd {
        cfg = cfg.with_evolution_sd(sd);
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Builds an [`IdentifyConfig`] from the TOML identification configuration,
/// resolving anchor person names against the data.
pub fn build_identify_config(
    identify: &IdentifyToml,
    data: &ResponseData,
) -> Result<IdentifyConfig> {
    let mut cfg = IdentifyConfig::new()
        .with_epsilon(identify.epsilon)
        .with_max_attempts(identify.max_attempts);
    if let Some(cap) = identify.variance_cap {
        cfg = cfg.with_variance_cap(cap);
    }

    match (&identify.high_anchor, &identify.low_anchor) {
        (Some(high), Some(low)) => {
            let high_idx = resolve_person(data, high)?;
            let low_idx = resolve_person(data, low)?;
            cfg = cfg.with_anchors(AnchorPair::new(high_idx, low_idx)?);
        }
        (None, None) => {}
        _ => bail!("[identify] needs both high_anchor and low_anchor, or neither"),
    }
    match (identify.high_target, identify.low_target) {
        (Some(high), Some(low)) => {
            cfg = cfg.with_targets(AnchorTargets::new(high, low)?);
        }
        (None, None) => {}
        _ => bail!("[identify] needs both high_target and low_target, or neither"),
    }

    cfg.validate()?;
    Ok(cfg)
}

fn resolve_person(data: &ResponseData, name: &str) -> Result<usize> {
    data.person_index(name)
        .ok_or_else(|| anyhow::anyhow!("anchor person {name:?} not found in data"))
}

/// Builds a [`SimConfig`] from the TOML simulation configuration.
pub fn build_sim_config(sim: &SimToml) -> Result<SimConfig> {
    let model_type = ModelType::from_code(sim.model_code)?;
    let time = parse_time_process(&sim.time_process, sim.ar)?;
    let cfg = SimConfig::new(model_type, sim.n_persons, sim.n_items)
        .with_time_process(time, sim.n_time)
        .with_trait_spread(sim.trait_spread)
        .with_mcar_rate(sim.mcar_rate)
        .with_categories(sim.categories);
    cfg.validate()?;
    Ok(cfg)
}

/// Flattens in-memory draws into the long-format Parquet table.
pub fn draws_to_table(draws: &Draws) -> DrawsTable {
    let mut table = DrawsTable::default();
    let per_chain = draws.draws_per_chain();
    for row in 0..draws.n_draws() {
        let chain = (row / per_chain) as u32;
        let draw = (row % per_chain) as u32;
        for p in 0..draws.n_persons() {
            for t in 0..draws.n_time() {
                let value = draws.theta()[[row, draws.slot(p, t)]];
                table.push(chain, draw, "theta", p as u32, t as u32, value);
            }
        }
        for j in 0..draws.n_items() {
            table.push(chain, draw, "disc", j as u32, 0, draws.disc()[[row, j]]);
            table.push(chain, draw, "diff", j as u32, 0, draws.diff()[[row, j]]);
            if let (Some(ad), Some(af)) = (draws.abs_disc(), draws.abs_diff()) {
                table.push(chain, draw, "absence_disc", j as u32, 0, ad[[row, j]]);
                table.push(chain, draw, "absence_diff", j as u32, 0, af[[row, j]]);
            }
        }
    }
    table
}

/// Rebuilds in-memory draws from the long-format table, inferring shape from
/// the index columns.
pub fn table_to_draws(table: &DrawsTable) -> Result<Draws> {
    if table.is_empty() {
        bail!("draws table is empty");
    }

    let chains = table.chain.iter().max().copied().unwrap_or(0) as usize + 1;
    let per_chain = table.draw.iter().max().copied().unwrap_or(0) as usize + 1;
    let n_rows = chains * per_chain;

    let mut n_person = 0usize;
    let mut n_time = 0usize;
    let mut n_item = 0usize;
    let mut inflated = false;
    for i in 0..table.len() {
        let index = table.index[i] as usize;
        match table.param[i].as_str() {
            "theta" => {
                n_person = n_person.max(index + 1);
                n_time = n_time.max(table.time[i] as usize + 1);
            }
            "disc" | "diff" => n_item = n_item.max(index + 1),
            "absence_disc" | "absence_diff" => {
                inflated = true;
                n_item = n_item.max(index + 1);
            }
            other => bail!("unknown parameter block {other:?} in draws table"),
        }
    }
    if n_person == 0 || n_item == 0 {
        bail!("draws table is missing the theta or item parameter blocks");
    }

    let mut theta = Array2::zeros((n_rows, n_person * n_time));
    let mut disc = Array2::zeros((n_rows, n_item));
    let mut diff = Array2::zeros((n_rows, n_item));
    let mut abs_disc = inflated.then(|| Array2::zeros((n_rows, n_item)));
    let mut abs_diff = inflated.then(|| Array2::zeros((n_rows, n_item)));

    for i in 0..table.len() {
        let row = table.chain[i] as usize * per_chain + table.draw[i] as usize;
        let index = table.index[i] as usize;
        let value = table.value[i];
        match table.param[i].as_str() {
            "theta" => theta[[row, index * n_time + table.time[i] as usize]] = value,
            "disc" => disc[[row, index]] = value,
            "diff" => diff[[row, index]] = value,
            "absence_disc" => {
                if let Some(ad) = abs_disc.as_mut() {
                    ad[[row, index]] = value;
                }
            }
            "absence_diff" => {
                if let Some(af) = abs_diff.as_mut() {
                    af[[row, index]] = value;
                }
            }
            _ => unreachable!("validated above"),
        }
    }

    Ok(Draws::new(
        n_person, n_time, n_item, chains, per_chain, theta, disc, diff, abs_disc, abs_diff,
    ))
}
