//! Posterior summaries of identified draws.
//!
//! One table per parameter class: posterior mean, sd, and the 5/50/95
//! percent quantiles for every parameter, serialized to pretty JSON.

use serde::Serialize;
use solon_engine::Draws;

/// Error type for all fallible operations in the solon-summary crate.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    /// Returned when the label vector does not match the parameter count.
    #[error("expected {expected} labels for {class}, got {got}")]
    LabelCountMismatch {
        /// Parameter class being summarized.
        class: String,
        /// Number of parameters in the draws.
        expected: usize,
        /// Number of labels supplied.
        got: usize,
    },

    /// Returned when the group vector does not match the person count.
    #[error("expected {expected} group labels, got {got}")]
    GroupCountMismatch {
        /// Number of persons in the draws.
        expected: usize,
        /// Number of group labels supplied.
        got: usize,
    },

    /// Wraps a JSON serialization failure.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Which parameter block to summarize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamClass {
    /// Person traits (one row per person and time point).
    Persons,
    /// Item discriminations.
    Discrimination,
    /// Item difficulties.
    Difficulty,
}

impl ParamClass {
    /// Stable lowercase name used in output and errors.
    pub fn name(&self) -> &'static str {
        match self {
            ParamClass::Persons => "persons",
            ParamClass::Discrimination => "discrimination",
            ParamClass::Difficulty => "difficulty",
        }
    }
}

impl std::str::FromStr for ParamClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "persons" => Ok(ParamClass::Persons),
            "discrimination" => Ok(ParamClass::Discrimination),
            "difficulty" => Ok(ParamClass::Difficulty),
            other => Err(format!(
                "unknown parameter class {other:?}, expected persons, discrimination or difficulty"
            )),
        }
    }
}

/// Posterior summary of one parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSummary {
    /// Label (person or item name).
    pub label: String,
    /// Group label of the person (persons class with group data; `None`
    /// otherwise).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Time-point index (persons in time-varying fits; `None` otherwise).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<usize>,
    /// Posterior mean.
    pub mean: f64,
    /// Posterior standard deviation.
    pub sd: f64,
    /// 5 percent quantile.
    pub q05: f64,
    /// Posterior median.
    pub median: f64,
    /// 95 percent quantile.
    pub q95: f64,
}

/// A summary table for one parameter class.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryTable {
    /// Parameter class name.
    pub class: String,
    /// Number of posterior draws the summary is based on.
    pub n_draws: usize,
    /// Per-parameter rows.
    pub rows: Vec<ParamSummary>,
}

impl SummaryTable {
    /// Serializes the table to pretty JSON.
    pub fn to_json(&self) -> Result<String, SummaryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Summarizes one parameter class of a draw matrix.
///
/// `labels` must carry one entry per person (for [`ParamClass::Persons`]) or
/// per item (for the item classes). Person rows expand to one row per time
/// point when the fit is time-varying. `groups`, when given, tags each
/// person row with its group label (one entry per person; ignored for the
/// item classes).
pub fn summarize(
    draws: &Draws,
    class: ParamClass,
    labels: &[String],
    groups: Option<&[String]>,
) -> Result<SummaryTable, SummaryError> {
    let expected = match class {
        ParamClass::Persons => draws.n_persons(),
        ParamClass::Discrimination | ParamClass::Difficulty => draws.n_items(),
    };
    if labels.len() != expected {
        return Err(SummaryError::LabelCountMismatch {
            class: class.name().to_string(),
            expected,
            got: labels.len(),
        });
    }
    if let (ParamClass::Persons, Some(groups)) = (class, groups) {
        if groups.len() != draws.n_persons() {
            return Err(SummaryError::GroupCountMismatch {
                expected: draws.n_persons(),
                got: groups.len(),
            });
        }
    }

    let mut rows = Vec::new();
    match class {
        ParamClass::Persons => {
            for p in 0..draws.n_persons() {
                for t in 0..draws.n_time() {
                    let column: Vec<f64> =
                        draws.theta().column(draws.slot(p, t)).iter().copied().collect();
                    rows.push(row(
                        labels[p].clone(),
                        groups.map(|g| g[p].clone()),
                        (draws.n_time() > 1).then_some(t),
                        column,
                    ));
                }
            }
        }
        ParamClass::Discrimination => {
            for j in 0..draws.n_items() {
                let column: Vec<f64> = draws.disc().column(j).iter().copied().collect();
                rows.push(row(labels[j].clone(), None, None, column));
            }
        }
        ParamClass::Difficulty => {
            for j in 0..draws.n_items() {
                let column: Vec<f64> = draws.diff().column(j).iter().copied().collect();
                rows.push(row(labels[j].clone(), None, None, column));
            }
        }
    }

    Ok(SummaryTable {
        class: class.name().to_string(),
        n_draws: draws.n_draws(),
        rows,
    })
}

fn row(
    label: String,
    group: Option<String>,
    time: Option<usize>,
    mut column: Vec<f64>,
) -> ParamSummary {
    let mean = solon_stats::mean(&column);
    let sd = solon_stats::sd(&column);
    column.sort_by(|a, b| a.total_cmp(b));
    ParamSummary {
        label,
        group,
        time,
        mean,
        sd,
        q05: solon_stats::quantile_type7(&column, 0.05),
        median: solon_stats::median(&column),
        q95: solon_stats::quantile_type7(&column, 0.95),
    }
}
