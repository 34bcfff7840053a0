use std::fs;

use anyhow::{bail, Context, Result};
use tracing::info;

use solon_data::{read_draws, write_draws};
use solon_identify::{identify_draws, AnchorPair, AnchorTargets, IdentifyConfig};

use crate::cli::IdentifyArgs;
use crate::config::SolonConfig;
use crate::convert;

/// Re-identify an existing draws file with explicit anchors.
pub fn run(args: IdentifyArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read config: {}", args.config.display()))?;
    let config: SolonConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config: {}", args.config.display()))?;
    let time = convert::parse_time_process(&config.model.time_process, config.model.ar)?;

    info!(path = %args.input.display(), "reading draws");
    let table = read_draws(&args.input)
        .with_context(|| format!("failed to read draws: {}", args.input.display()))?;
    let mut draws = convert::table_to_draws(&table)?;
    info!(
        persons = draws.n_persons(),
        time_points = draws.n_time(),
        draws = draws.n_draws(),
        "draws loaded"
    );

    let mut identify_cfg = IdentifyConfig::new()
        .with_epsilon(config.identify.epsilon)
        .with_max_attempts(config.identify.max_attempts);
    if let Some(cap) = config.identify.variance_cap {
        identify_cfg = identify_cfg.with_variance_cap(cap);
    }
    match (args.high, args.low) {
        (Some(high), Some(low)) => {
            identify_cfg = identify_cfg.with_anchors(AnchorPair::new(high, low)?);
        }
        (None, None) => {}
        _ => bail!("--high and --low must be given together"),
    }
    match (args.target_high, args.target_low) {
        (Some(high), Some(low)) => {
            identify_cfg = identify_cfg.with_targets(AnchorTargets::new(high, low)?);
        }
        (None, None) => {}
        _ => bail!("--target-high and --target-low must be given together"),
    }

    let report = identify_draws(&mut draws, time, &identify_cfg)?;
    info!(
        high = report.anchors.high,
        low = report.anchors.low,
        flipped_draws = report.affine.flipped_draws,
        "identification complete"
    );

    let out_table = convert::draws_to_table(&draws);
    write_draws(&args.output, &out_table)
        .with_context(|| format!("failed to write draws: {}", args.output.display()))?;
    info!(path = %args.output.display(), "identified draws written");

    Ok(())
}
