use std::path::PathBuf;

use serde::Deserialize;

/// Top-level solon configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolonConfig {
    /// Global RNG seed.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Data ingestion settings.
    #[serde(default)]
    pub data: DataToml,

    /// Model settings.
    #[serde(default)]
    pub model: ModelToml,

    /// Inference engine settings.
    #[serde(default)]
    pub engine: EngineToml,

    /// Identification settings.
    #[serde(default)]
    pub identify: IdentifyToml,

    /// Summary settings.
    #[serde(default)]
    pub summary: SummaryToml,

    /// Simulation settings.
    #[serde(default)]
    pub sim: SimToml,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DataToml {
    pub input: Option<PathBuf>,
    pub draws_output: Option<PathBuf>,
    #[serde(default = "default_person_col")]
    pub person_col: String,
    #[serde(default = "default_item_col")]
    pub item_col: String,
    #[serde(default = "default_outcome_col")]
    pub outcome_col: String,
    #[serde(default)]
    pub time_col: Option<String>,
    #[serde(default)]
    pub group_col: Option<String>,
    #[serde(default)]
    pub missing_sentinel: Option<String>,
}

fn default_person_col() -> String {
    "person".to_string()
}
fn default_item_col() -> String {
    "item".to_string()
}
fn default_outcome_col() -> String {
    "outcome".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelToml {
    /// Model variant code, 1 through 14 (even codes are inflated).
    #[serde(default = "default_model_code")]
    pub model_code: u8,
    /// Over-time process: "static", "random_walk", or "stationary".
    #[serde(default = "default_time_process")]
    pub time_process: String,
    /// AR(1) coefficient for the stationary process.
    #[serde(default = "default_ar")]
    pub ar: f64,
}

impl Default for ModelToml {
    fn default() -> Self {
        Self {
            model_code: default_model_code(),
            time_process: default_time_process(),
            ar: default_ar(),
        }
    }
}

fn default_model_code() -> u8 {
    1
}
fn default_time_process() -> String {
    "static".to_string()
}
fn default_ar() -> f64 {
    0.5
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineToml {
    /// Inference mode: "approximate" or "sampling".
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_chains")]
    pub chains: usize,
    #[serde(default = "default_cores")]
    pub cores: usize,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_warmup")]
    pub warmup: usize,
    #[serde(default = "default_rhat_threshold")]
    pub rhat_threshold: f64,
    #[serde(default)]
    pub evolution_sd: Option<f64>,
}

impl Default for EngineToml {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            chains: default_chains(),
            cores: default_cores(),
            iterations: default_iterations(),
            warmup: default_warmup(),
            rhat_threshold: default_rhat_threshold(),
            evolution_sd: None,
        }
    }
}

fn default_mode() -> String {
    "approximate".to_string()
}
fn default_chains() -> usize {
    2
}
fn default_cores() -> usize {
    1
}
fn default_iterations() -> usize {
    1000
}
fn default_warmup() -> usize {
    500
}
fn default_rhat_threshold() -> f64 {
    1.1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentifyToml {
    /// High anchor person, by name in the data.
    #[serde(default)]
    pub high_anchor: Option<String>,
    /// Low anchor person, by name in the data.
    #[serde(default)]
    pub low_anchor: Option<String>,
    #[serde(default)]
    pub high_target: Option<f64>,
    #[serde(default)]
    pub low_target: Option<f64>,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default)]
    pub variance_cap: Option<f64>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for IdentifyToml {
    fn default() -> Self {
        Self {
            high_anchor: None,
            low_anchor: None,
            high_target: None,
            low_target: None,
            epsilon: default_epsilon(),
            variance_cap: None,
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_epsilon() -> f64 {
    1e-6
}
fn default_max_attempts() -> usize {
    3
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryToml {
    /// Parameter classes to summarize after estimation.
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,
    /// Path for the summary JSON.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl Default for SummaryToml {
    fn default() -> Self {
        Self {
            classes: default_classes(),
            output: None,
        }
    }
}

fn default_classes() -> Vec<String> {
    vec!["persons".to_string()]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimToml {
    #[serde(default = "default_model_code")]
    pub model_code: u8,
    #[serde(default = "default_n_persons")]
    pub n_persons: usize,
    #[serde(default = "default_n_items")]
    pub n_items: usize,
    #[serde(default = "default_time_process")]
    pub time_process: String,
    #[serde(default = "default_ar")]
    pub ar: f64,
    #[serde(default = "default_n_time")]
    pub n_time: usize,
    #[serde(default = "default_trait_spread")]
    pub trait_spread: f64,
    #[serde(default)]
    pub mcar_rate: f64,
    #[serde(default = "default_categories")]
    pub categories: usize,
}

impl Default for SimToml {
    fn default() -> Self {
        Self {
            model_code: default_model_code(),
            n_persons: default_n_persons(),
            n_items: default_n_items(),
            time_process: default_time_process(),
            ar: default_ar(),
            n_time: default_n_time(),
            trait_spread: default_trait_spread(),
            mcar_rate: 0.0,
            categories: default_categories(),
        }
    }
}

fn default_n_persons() -> usize {
    50
}
fn default_n_items() -> usize {
    20
}
fn default_n_time() -> usize {
    1
}
fn default_trait_spread() -> f64 {
    1.0
}
fn default_categories() -> usize {
    4
}
