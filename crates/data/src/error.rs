//! Error types for the solon-data crate.

use std::path::PathBuf;

/// Error type for all fallible operations in the solon-data crate.
///
/// Covers file-level I/O failures, CSV/Parquet format errors, and the
/// configuration checks that must fail before any sampling begins (missing
/// columns, absent missing-value sentinel, malformed outcome cells).
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when a required file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path that could not be found.
        path: PathBuf,
    },

    /// Wraps an error originating from the Arrow CSV reader.
    #[error("csv error: {reason}")]
    Csv {
        /// Description of the underlying CSV failure.
        reason: String,
    },

    /// Wraps an error originating from the Parquet library.
    #[error("parquet error: {reason}")]
    Parquet {
        /// Description of the underlying Parquet failure.
        reason: String,
    },

    /// Returned when a configured column name is not present in the table.
    #[error("column '{name}' not found in input table")]
    MissingColumn {
        /// The configured column name.
        name: String,
    },

    /// Returned when a configured missing-value sentinel never appears in the
    /// outcome column. Almost always a misconfigured sentinel, so it is
    /// reported before sampling rather than silently treating the data as
    /// fully observed.
    #[error("missing-value sentinel '{sentinel}' not present in outcome column '{column}'")]
    SentinelNotFound {
        /// The configured sentinel string.
        sentinel: String,
        /// The outcome column name.
        column: String,
    },

    /// Returned when an outcome cell is neither numeric nor the sentinel.
    #[error("invalid outcome '{value}' at row {row} (not numeric, not the sentinel)")]
    InvalidOutcome {
        /// The offending cell content.
        value: String,
        /// Zero-based data row index.
        row: usize,
    },

    /// Returned when a person/item/group/time cell is empty or null.
    #[error("empty value in column '{column}' at row {row}")]
    EmptyValue {
        /// The column name.
        column: String,
        /// Zero-based data row index.
        row: usize,
    },

    /// Returned when a time cell cannot be parsed as an integer.
    #[error("invalid time value '{value}' at row {row} (must be an integer)")]
    InvalidTime {
        /// The offending cell content.
        value: String,
        /// Zero-based data row index.
        row: usize,
    },

    /// Returned when the table contains no data rows.
    #[error("input table is empty")]
    EmptyTable,

    /// Returned when index vectors passed to a constructor are inconsistent.
    #[error("{count} validation error(s): {details}")]
    Validation {
        /// Number of accumulated validation failures.
        count: usize,
        /// Human-readable summary of the failures.
        details: String,
    },
}

impl From<arrow::error::ArrowError> for DataError {
    fn from(e: arrow::error::ArrowError) -> Self {
        DataError::Csv {
            reason: e.to_string(),
        }
    }
}

impl From<parquet::errors::ParquetError> for DataError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        DataError::Parquet {
            reason: e.to_string(),
        }
    }
}
