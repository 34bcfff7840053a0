use std::fs;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use solon_data::{read_csv, write_draws};
use solon_engine::{InferenceMode, LaplaceEngine, McmcEngine};
use solon_identify::resolve;
use solon_summary::{summarize, ParamClass};

use crate::cli::EstimateArgs;
use crate::config::SolonConfig;
use crate::convert;

/// Run the full pipeline: read data, fit, identify, write draws and
/// summaries.
pub fn run(args: EstimateArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read config: {}", args.config.display()))?;
    let config: SolonConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config: {}", args.config.display()))?;

    // Step 1: Resolve paths
    let input = config.data.input.as_ref().ok_or_else(|| {
        anyhow!("no input path: set [data].input in config")
    })?;
    let output = args
        .output
        .or_else(|| config.data.draws_output.clone())
        .ok_or_else(|| {
            anyhow!("no draws output path: set [data].draws_output in config or use --output")
        })?;

    // Step 2: Build configs from TOML
    let reader_cfg = convert::build_reader_config(&config.data);
    let spec = convert::build_model_spec(&config.model)?;
    let engine_cfg = convert::build_engine_config(&config.engine)?;

    // Step 3: Read response data
    info!(path = %input.display(), "reading response data");
    let data = read_csv(input, &reader_cfg)
        .with_context(|| format!("failed to read CSV: {}", input.display()))?;
    info!(
        persons = data.n_persons(),
        items = data.n_items(),
        time_points = data.n_time(),
        rows = data.len(),
        "response data loaded"
    );

    let identify_cfg = convert::build_identify_config(&config.identify, &data)?;

    // Step 4: Fit and identify
    let seed = args.seed.or(config.seed).unwrap_or_else(rand::random);
    info!(
        seed,
        model_code = config.model.model_code,
        mode = %config.engine.mode,
        "fitting model"
    );
    let (draws, report) = match engine_cfg.mode() {
        InferenceMode::Approximate => resolve(
            &LaplaceEngine::new(),
            &data,
            &spec,
            &engine_cfg,
            &identify_cfg,
            seed,
        )?,
        InferenceMode::Sampling => resolve(
            &McmcEngine::new(),
            &data,
            &spec,
            &engine_cfg,
            &identify_cfg,
            seed,
        )?,
    };
    info!(
        attempts = report.attempts,
        high = %data.person_names()[report.anchors.high],
        low = %data.person_names()[report.anchors.low],
        flipped_draws = report.affine.flipped_draws,
        "identification complete"
    );
    if let Some(max_rhat) = report.diagnostics.as_ref().and_then(|d| d.max_rhat) {
        info!(max_rhat, "convergence diagnostics");
    }

    // Step 5: Write draws
    let table = convert::draws_to_table(&draws);
    write_draws(&output, &table)
        .with_context(|| format!("failed to write draws: {}", output.display()))?;
    info!(path = %output.display(), rows = table.len(), "draws written");

    // Step 6: Summaries
    let person_groups = config
        .data
        .group_col
        .is_some()
        .then(|| data.person_group_names());
    let mut tables = Vec::new();
    for class_name in &config.summary.classes {
        let class: ParamClass = class_name
            .parse()
            .map_err(|e: String| anyhow!(e))?;
        let (labels, groups) = match class {
            ParamClass::Persons => (data.person_names().to_vec(), person_groups.as_deref()),
            ParamClass::Discrimination | ParamClass::Difficulty => {
                (data.item_names().to_vec(), None)
            }
        };
        tables.push(summarize(&draws, class, &labels, groups)?);
    }
    if let Some(ref path) = config.summary.output {
        let json = serde_json::to_string_pretty(&tables).context("serializing summaries")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write summaries: {}", path.display()))?;
        info!(path = %path.display(), tables = tables.len(), "summaries written");
    }

    Ok(())
}
