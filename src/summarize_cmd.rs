use std::fs;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use solon_data::{read_csv, read_draws};
use solon_summary::{summarize, ParamClass};

use crate::cli::SummarizeArgs;
use crate::config::SolonConfig;
use crate::convert;

/// Summarize one parameter class of a draws file.
pub fn run(args: SummarizeArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read config: {}", args.config.display()))?;
    let config: SolonConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config: {}", args.config.display()))?;

    info!(path = %args.input.display(), "reading draws");
    let table = read_draws(&args.input)
        .with_context(|| format!("failed to read draws: {}", args.input.display()))?;
    let draws = convert::table_to_draws(&table)?;

    let class: ParamClass = args.class.parse().map_err(|e: String| anyhow!(e))?;

    // Labels come from the data file when the config points at one;
    // otherwise fall back to positional names. Group labels ride along
    // only when the config maps a group column.
    let (labels, groups) = match config.data.input {
        Some(ref input) => {
            let reader_cfg = convert::build_reader_config(&config.data);
            let data = read_csv(input, &reader_cfg)
                .with_context(|| format!("failed to read CSV: {}", input.display()))?;
            match class {
                ParamClass::Persons => (
                    data.person_names().to_vec(),
                    config
                        .data
                        .group_col
                        .is_some()
                        .then(|| data.person_group_names()),
                ),
                ParamClass::Discrimination | ParamClass::Difficulty => {
                    (data.item_names().to_vec(), None)
                }
            }
        }
        None => match class {
            ParamClass::Persons => (
                (0..draws.n_persons()).map(|p| format!("person_{p:03}")).collect(),
                None,
            ),
            ParamClass::Discrimination | ParamClass::Difficulty => (
                (0..draws.n_items()).map(|j| format!("item_{j:03}")).collect(),
                None,
            ),
        },
    };

    let summary = summarize(&draws, class, &labels, groups.as_deref())?;
    let json = summary.to_json()?;
    match args.output {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("failed to write summary: {}", path.display()))?;
            info!(path = %path.display(), rows = summary.rows.len(), "summary written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
