use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Solon ideal-point estimation pipeline.
#[derive(Parser)]
#[command(
    name = "solon",
    version,
    about = "Ideal-point estimation with post-hoc identification"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline: read data, fit, identify, summarize.
    Estimate(EstimateArgs),
    /// Re-identify an existing draws file with explicit anchors.
    Identify(IdentifyArgs),
    /// Simulate a synthetic data set with known ground truth.
    Simulate(SimulateArgs),
    /// Summarize an identified draws file.
    Summarize(SummarizeArgs),
}

/// Arguments for the `estimate` subcommand.
#[derive(clap::Args)]
pub struct EstimateArgs {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "solon.toml")]
    pub config: PathBuf,

    /// Override draws output Parquet path from config.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override global RNG seed from config.
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// Arguments for the `identify` subcommand.
#[derive(clap::Args)]
pub struct IdentifyArgs {
    /// Path to input draws Parquet file.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Path for identified output Parquet file.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Path to TOML configuration file (for the time process).
    #[arg(short, long, default_value = "solon.toml")]
    pub config: PathBuf,

    /// High anchor person index.
    #[arg(long)]
    pub high: Option<usize>,

    /// Low anchor person index.
    #[arg(long)]
    pub low: Option<usize>,

    /// Target value for the high anchor.
    #[arg(long = "target-high")]
    pub target_high: Option<f64>,

    /// Target value for the low anchor.
    #[arg(long = "target-low")]
    pub target_low: Option<f64>,
}

/// Arguments for the `simulate` subcommand.
#[derive(clap::Args)]
pub struct SimulateArgs {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "solon.toml")]
    pub config: PathBuf,

    /// Path for the simulated CSV data set.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Override global RNG seed from config.
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// Arguments for the `summarize` subcommand.
#[derive(clap::Args)]
pub struct SummarizeArgs {
    /// Path to input draws Parquet file.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Parameter class to summarize (persons, discrimination, difficulty).
    #[arg(long, default_value = "persons")]
    pub class: String,

    /// Path for summary JSON output (stdout when omitted).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to TOML configuration file (for person and item labels).
    #[arg(short, long, default_value = "solon.toml")]
    pub config: PathBuf,
}
