use std::fs;
use std::io::Write as _;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use solon_data::ResponseData;
use solon_sim::simulate;

use crate::cli::SimulateArgs;
use crate::config::SolonConfig;
use crate::convert;

/// Simulate a synthetic data set and write it as CSV, with the generating
/// truth alongside as JSON.
pub fn run(args: SimulateArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read config: {}", args.config.display()))?;
    let config: SolonConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config: {}", args.config.display()))?;
    let sim_cfg = convert::build_sim_config(&config.sim)?;

    let seed = args.seed.or(config.seed).unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    info!(seed, model_code = config.sim.model_code, "simulating");
    let out = simulate(&sim_cfg, &mut rng)?;
    info!(
        rows = out.data.len(),
        persons = out.data.n_persons(),
        items = out.data.n_items(),
        "simulation complete"
    );

    write_csv(&args.output, &out.data)
        .with_context(|| format!("failed to write CSV: {}", args.output.display()))?;
    info!(path = %args.output.display(), "data written");

    let truth_path = args.output.with_extension("truth.json");
    let truth = serde_json::json!({
        "theta": out.truth.theta,
        "disc": out.truth.disc,
        "diff": out.truth.diff,
        "absence_disc": out.truth.abs_disc,
        "absence_diff": out.truth.abs_diff,
        "cutpoints": out.truth.cutpoints,
    });
    fs::write(&truth_path, serde_json::to_string_pretty(&truth)?)
        .with_context(|| format!("failed to write truth: {}", truth_path.display()))?;
    info!(path = %truth_path.display(), "ground truth written");

    Ok(())
}

/// Writes a response data set in the long CSV layout the reader expects,
/// with missing cells recorded as `NA`.
fn write_csv(path: &std::path::Path, data: &ResponseData) -> Result<()> {
    let mut file = std::io::BufWriter::new(fs::File::create(path)?);
    let timed = data.n_time() > 1;
    if timed {
        writeln!(file, "person,item,time,outcome")?;
    } else {
        writeln!(file, "person,item,outcome")?;
    }
    for i in 0..data.len() {
        let person = &data.person_names()[data.person_idx()[i]];
        let item = &data.item_names()[data.item_idx()[i]];
        let outcome = if data.missing()[i] {
            "NA".to_string()
        } else {
            format!("{}", data.outcome()[i])
        };
        if timed {
            writeln!(file, "{person},{item},{},{outcome}", data.time_idx()[i])?;
        } else {
            writeln!(file, "{person},{item},{outcome}")?;
        }
    }
    Ok(())
}
