//! Long-format Parquet storage for posterior draws.
//!
//! One row per (chain, draw, parameter, index, time) cell. The `estimate`
//! stage writes this file; `identify` and `summarize` read it back, so the
//! layout is the contract between pipeline stages.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, Float64Array, RecordBatch, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Float64Type, Schema, UInt32Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::DataError;

/// Columnar long-format posterior draws.
///
/// `param` names the parameter block (`theta`, `disc`, `diff`,
/// `absence_disc`, `absence_diff`); `index` is the person or item index and
/// `time` the time-point index (0 for untimed blocks).
#[derive(Debug, Clone, Default)]
pub struct DrawsTable {
    /// Chain id of each row.
    pub chain: Vec<u32>,
    /// Within-chain draw number of each row.
    pub draw: Vec<u32>,
    /// Parameter block name of each row.
    pub param: Vec<String>,
    /// Person or item index of each row.
    pub index: Vec<u32>,
    /// Time-point index of each row.
    pub time: Vec<u32>,
    /// Sampled value of each row.
    pub value: Vec<f64>,
}

impl DrawsTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Appends one cell.
    pub fn push(&mut self, chain: u32, draw: u32, param: &str, index: u32, time: u32, value: f64) {
        self.chain.push(chain);
        self.draw.push(draw);
        self.param.push(param.to_string());
        self.index.push(index);
        self.time.push(time);
        self.value.push(value);
    }
}

/// Arrow schema of the draws file.
fn draws_schema() -> Schema {
    Schema::new(vec![
        Field::new("chain", DataType::UInt32, false),
        Field::new("draw", DataType::UInt32, false),
        Field::new("param", DataType::Utf8, false),
        Field::new("index", DataType::UInt32, false),
        Field::new("time", DataType::UInt32, false),
        Field::new("value", DataType::Float64, false),
    ])
}

/// Writes a [`DrawsTable`] to a Parquet file (snappy-compressed).
///
/// # Errors
///
/// Returns [`DataError::Parquet`] if file creation, batch writing, or file
/// finalisation fails.
pub fn write_draws(path: &Path, table: &DrawsTable) -> Result<(), DataError> {
    let schema = draws_schema();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from(table.chain.clone())),
        Arc::new(UInt32Array::from(table.draw.clone())),
        Arc::new(StringArray::from(table.param.clone())),
        Arc::new(UInt32Array::from(table.index.clone())),
        Arc::new(UInt32Array::from(table.time.clone())),
        Arc::new(Float64Array::from(table.value.clone())),
    ];
    let batch =
        RecordBatch::try_new(Arc::new(schema.clone()), columns).map_err(|e| DataError::Parquet {
            reason: e.to_string(),
        })?;

    let file = std::fs::File::create(path).map_err(|e| DataError::Parquet {
        reason: e.to_string(),
    })?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, Arc::new(schema), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Reads a draws Parquet file back into a [`DrawsTable`].
///
/// # Errors
///
/// Returns [`DataError::FileNotFound`] for a missing path,
/// [`DataError::Parquet`] for unreadable files, and
/// [`DataError::Validation`] for a file whose schema does not match the
/// draws layout.
pub fn read_draws(path: &Path) -> Result<DrawsTable, DataError> {
    if !path.exists() {
        return Err(DataError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let file = std::fs::File::open(path).map_err(|e| DataError::Parquet {
        reason: e.to_string(),
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let expected = draws_schema();
    let mut table = DrawsTable::default();

    for batch in reader {
        let batch = batch.map_err(|e| DataError::Parquet {
            reason: e.to_string(),
        })?;

        // Both names and types must match; a file written by another tool
        // with, say, an Int64 chain column is a validation error, not a
        // downcast panic.
        let batch_schema = batch.schema();
        let got: Vec<(&str, &DataType)> = batch_schema
            .fields()
            .iter()
            .map(|f| (f.name().as_str(), f.data_type()))
            .collect();
        let wanted: Vec<(&str, &DataType)> = expected
            .fields()
            .iter()
            .map(|f| (f.name().as_str(), f.data_type()))
            .collect();
        if got != wanted {
            return Err(DataError::Validation {
                count: 1,
                details: format!("draws schema mismatch: expected {wanted:?}, got {got:?}"),
            });
        }

        let chain = batch.column(0).as_primitive::<UInt32Type>();
        let draw = batch.column(1).as_primitive::<UInt32Type>();
        let param = batch
            .column(2)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| DataError::Validation {
                count: 1,
                details: "param column is not Utf8".to_string(),
            })?;
        let index = batch.column(3).as_primitive::<UInt32Type>();
        let time = batch.column(4).as_primitive::<UInt32Type>();
        let value = batch.column(5).as_primitive::<Float64Type>();

        for i in 0..batch.num_rows() {
            table.push(
                chain.value(i),
                draw.value(i),
                param.value(i),
                index.value(i),
                time.value(i),
                value.value(i),
            );
        }
    }

    if table.is_empty() {
        return Err(DataError::EmptyTable);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_columns() {
        let s = draws_schema();
        assert_eq!(s.fields().len(), 6);
        assert_eq!(s.field(0).name(), "chain");
        assert_eq!(s.field(2).name(), "param");
        assert_eq!(s.field(5).name(), "value");
    }

    #[test]
    fn push_and_len() {
        let mut t = DrawsTable::default();
        assert!(t.is_empty());
        t.push(0, 0, "theta", 3, 1, -0.25);
        assert_eq!(t.len(), 1);
        assert_eq!(t.param[0], "theta");
        assert_eq!(t.time[0], 1);
    }
}
