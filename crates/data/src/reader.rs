//! Long-format CSV ingestion.
//!
//! The input is one row per person × item × optional time point, with
//! configurable column names and a missing-value sentinel. Columns are cast
//! to strings after Arrow schema inference so that numeric person or item
//! codes and quoted labels read identically.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::DataType;
use tracing::debug;

use crate::error::DataError;
use crate::response::ResponseData;

/// Configuration for reading a long-format response table.
///
/// # Example
///
/// ```
/// use solon_data::ReaderConfig;
///
/// let config = ReaderConfig::new()
///     .with_person_col("legislator")
///     .with_item_col("bill")
///     .with_outcome_col("vote")
///     .with_missing_sentinel("NA");
/// ```
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    person_col: String,
    item_col: String,
    outcome_col: String,
    time_col: Option<String>,
    group_col: Option<String>,
    missing_sentinel: Option<String>,
}

impl ReaderConfig {
    /// Creates a configuration with default column names
    /// (`person`, `item`, `outcome`; no time, group, or sentinel).
    pub fn new() -> Self {
        Self {
            person_col: "person".to_string(),
            item_col: "item".to_string(),
            outcome_col: "outcome".to_string(),
            time_col: None,
            group_col: None,
            missing_sentinel: None,
        }
    }

    /// Sets the person column name.
    pub fn with_person_col(mut self, name: impl Into<String>) -> Self {
        self.person_col = name.into();
        self
    }

    /// Sets the item column name.
    pub fn with_item_col(mut self, name: impl Into<String>) -> Self {
        self.item_col = name.into();
        self
    }

    /// Sets the outcome column name.
    pub fn with_outcome_col(mut self, name: impl Into<String>) -> Self {
        self.outcome_col = name.into();
        self
    }

    /// Sets the optional time column name.
    pub fn with_time_col(mut self, name: impl Into<String>) -> Self {
        self.time_col = Some(name.into());
        self
    }

    /// Sets the optional group column name.
    pub fn with_group_col(mut self, name: impl Into<String>) -> Self {
        self.group_col = Some(name.into());
        self
    }

    /// Sets the missing-value sentinel. When set, the sentinel must occur at
    /// least once in the outcome column or reading fails.
    pub fn with_missing_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.missing_sentinel = Some(sentinel.into());
        self
    }

    /// Returns the outcome column name.
    pub fn outcome_col(&self) -> &str {
        &self.outcome_col
    }

    /// Returns the configured sentinel, if any.
    pub fn missing_sentinel(&self) -> Option<&str> {
        self.missing_sentinel.as_deref()
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One parsed input row, prior to index assignment.
struct RawRow {
    person: String,
    item: String,
    group: Option<String>,
    time: Option<i64>,
    outcome: f64,
    missing: bool,
}

/// Reads a long-format CSV file into a [`ResponseData`].
///
/// # Errors
///
/// All configuration problems surface here, before any sampling begins:
/// [`DataError::MissingColumn`] for unknown column names,
/// [`DataError::SentinelNotFound`] when a configured sentinel never appears
/// in the outcome column, [`DataError::InvalidOutcome`] for cells that are
/// neither numeric nor the sentinel, and [`DataError::EmptyTable`] for a
/// header-only file.
pub fn read_csv(path: &Path, config: &ReaderConfig) -> Result<ResponseData, DataError> {
    if !path.exists() {
        return Err(DataError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = File::open(path).map_err(|e| DataError::Csv {
        reason: e.to_string(),
    })?;
    let format = Format::default().with_header(true);
    let (schema, _) = format.infer_schema(&mut file, None)?;
    file.rewind().map_err(|e| DataError::Csv {
        reason: e.to_string(),
    })?;

    let col = |name: &str| {
        schema
            .index_of(name)
            .map_err(|_| DataError::MissingColumn {
                name: name.to_string(),
            })
    };
    let person_i = col(&config.person_col)?;
    let item_i = col(&config.item_col)?;
    let outcome_i = col(&config.outcome_col)?;
    let time_i = config.time_col.as_deref().map(col).transpose()?;
    let group_i = config.group_col.as_deref().map(col).transpose()?;

    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_format(format)
        .build(file)?;

    let mut rows: Vec<RawRow> = Vec::new();
    let mut sentinel_seen = false;
    let mut row = 0usize;

    for batch in reader {
        let batch = batch?;
        let persons = as_strings(batch.column(person_i))?;
        let items = as_strings(batch.column(item_i))?;
        let outcomes = as_strings(batch.column(outcome_i))?;
        let times = time_i.map(|i| as_strings(batch.column(i))).transpose()?;
        let groups = group_i.map(|i| as_strings(batch.column(i))).transpose()?;

        for i in 0..batch.num_rows() {
            let person = required(&persons, i, &config.person_col, row)?;
            let item = required(&items, i, &config.item_col, row)?;

            let (outcome, missing) = if outcomes.is_null(i) {
                return Err(DataError::EmptyValue {
                    column: config.outcome_col.clone(),
                    row,
                });
            } else {
                let raw = outcomes.value(i).trim().to_string();
                if config.missing_sentinel.as_deref() == Some(raw.as_str()) {
                    sentinel_seen = true;
                    (f64::NAN, true)
                } else {
                    let v: f64 = raw.parse().map_err(|_| DataError::InvalidOutcome {
                        value: raw.clone(),
                        row,
                    })?;
                    (v, false)
                }
            };

            let time = match &times {
                None => None,
                Some(t) => {
                    let raw = required(t, i, config.time_col.as_deref().unwrap_or(""), row)?;
                    Some(raw.trim().parse::<i64>().map_err(|_| {
                        DataError::InvalidTime {
                            value: raw.clone(),
                            row,
                        }
                    })?)
                }
            };

            let group = match &groups {
                None => None,
                Some(g) => Some(required(
                    g,
                    i,
                    config.group_col.as_deref().unwrap_or(""),
                    row,
                )?),
            };

            rows.push(RawRow {
                person,
                item,
                group,
                time,
                outcome,
                missing,
            });
            row += 1;
        }
    }

    if rows.is_empty() {
        return Err(DataError::EmptyTable);
    }
    if let Some(sentinel) = &config.missing_sentinel {
        if !sentinel_seen {
            return Err(DataError::SentinelNotFound {
                sentinel: sentinel.clone(),
                column: config.outcome_col.clone(),
            });
        }
    }

    debug!(rows = rows.len(), "parsed long-format table");
    index_rows(rows)
}

/// Casts an Arrow column to Utf8 and hands back the string view.
fn as_strings(column: &arrow::array::ArrayRef) -> Result<StringArray, DataError> {
    let utf8 = cast(column, &DataType::Utf8)?;
    match utf8.as_any().downcast_ref::<StringArray>() {
        Some(strings) => Ok(strings.clone()),
        None => Err(DataError::Csv {
            reason: "cast to Utf8 did not produce a string column".to_string(),
        }),
    }
}

/// Fetches a non-null string cell or reports which column/row was empty.
fn required(
    array: &StringArray,
    i: usize,
    column: &str,
    row: usize,
) -> Result<String, DataError> {
    if array.is_null(i) || array.value(i).trim().is_empty() {
        return Err(DataError::EmptyValue {
            column: column.to_string(),
            row,
        });
    }
    Ok(array.value(i).trim().to_string())
}

/// Assigns person/item/group indices (first-appearance order) and time
/// indices (sorted unique values), then builds the `ResponseData`.
fn index_rows(rows: Vec<RawRow>) -> Result<ResponseData, DataError> {
    let mut person_names: Vec<String> = Vec::new();
    let mut person_map: BTreeMap<String, usize> = BTreeMap::new();
    let mut item_names: Vec<String> = Vec::new();
    let mut item_map: BTreeMap<String, usize> = BTreeMap::new();
    let mut group_names: Vec<String> = Vec::new();
    let mut group_map: BTreeMap<String, usize> = BTreeMap::new();

    let mut time_values: Vec<i64> = rows.iter().filter_map(|r| r.time).collect();
    time_values.sort_unstable();
    time_values.dedup();

    let mut person_idx = Vec::with_capacity(rows.len());
    let mut item_idx = Vec::with_capacity(rows.len());
    let mut time_idx = Vec::with_capacity(rows.len());
    let mut outcome = Vec::with_capacity(rows.len());
    let mut missing = Vec::with_capacity(rows.len());
    let mut person_group_map: BTreeMap<usize, usize> = BTreeMap::new();

    for r in &rows {
        let p = *person_map.entry(r.person.clone()).or_insert_with(|| {
            person_names.push(r.person.clone());
            person_names.len() - 1
        });
        let j = *item_map.entry(r.item.clone()).or_insert_with(|| {
            item_names.push(r.item.clone());
            item_names.len() - 1
        });
        let t = match r.time {
            None => 0,
            // time_values was collected from exactly these rows, so the
            // lookup cannot miss.
            Some(v) => time_values
                .binary_search(&v)
                .expect("time value present in the sorted unique set"),
        };
        if let Some(g) = &r.group {
            let gi = *group_map.entry(g.clone()).or_insert_with(|| {
                group_names.push(g.clone());
                group_names.len() - 1
            });
            person_group_map.entry(p).or_insert(gi);
        }

        person_idx.push(p);
        item_idx.push(j);
        time_idx.push(t);
        outcome.push(r.outcome);
        missing.push(r.missing);
    }

    if group_names.is_empty() {
        group_names.push("all".to_string());
    }
    let person_group: Vec<usize> = (0..person_names.len())
        .map(|p| person_group_map.get(&p).copied().unwrap_or(0))
        .collect();

    ResponseData::from_parts(
        person_names,
        item_names,
        group_names,
        time_values,
        person_group,
        person_idx,
        item_idx,
        time_idx,
        outcome,
        missing,
    )
}
