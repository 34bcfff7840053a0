//! Data ingestion and on-disk storage for the solon pipeline.
//!
//! Reads a long-format response table (one row per person × item × optional
//! time point) from CSV into a normalized [`ResponseData`], and owns the
//! long-format Parquet layout used to persist posterior draws between the
//! `estimate`, `identify`, and `summarize` stages.

pub mod draws_table;
pub mod error;
pub mod reader;
pub mod response;

pub use draws_table::{DrawsTable, read_draws, write_draws};
pub use error::DataError;
pub use reader::{ReaderConfig, read_csv};
pub use response::ResponseData;
