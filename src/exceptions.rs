//! ## Errors for Taxi Summary
//!
//! All fallible operations in the crate return a [`TaxiSummaryResult`], whose error side is the
//! [`TaxiSummaryError`] enum. Errors coming from DataFusion, Arrow, Parquet, file I/O and glob
//! patterns are wrapped with `#[from]` so they can be propagated with `?`.
//!
//! Load-time and query-time errors are fatal for a job run. Values that cannot be cast to a
//! numeric or timestamp type are not errors: they become nulls and the row is filtered out.
//!
//! ### Example
//!
//! ```rust
//! use taxi_summary::exceptions::{TaxiSummaryError, TaxiSummaryResult};
//!
//! fn check_year(year: i32) -> TaxiSummaryResult<()> {
//!     Err(TaxiSummaryError::InvalidParameter(format!("unsupported year {}", year)))
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Errors specific to the Taxi Summary job.
#[derive(Debug, Error)]
pub enum TaxiSummaryError {
    /// Wraps underlying I/O errors.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Wraps errors from Parquet.
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// An input pattern is not a valid glob.
    #[error("Invalid input pattern: {0}")]
    PatternError(#[from] glob::PatternError),

    /// Indicates that an invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates that an input file has an extension the loader cannot read.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Indicates that the specified column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A source file's header does not carry every required trip column.
    #[error("Schema mismatch in {}: missing required columns {missing:?}", path.display())]
    SchemaMismatch { path: PathBuf, missing: Vec<String> },

    /// None of the input patterns matched a file.
    #[error("No input files matched: {0}")]
    NoInputFiles(String),

    /// A serialized quantile sketch could not be decoded or merged.
    #[error("Corrupt sketch: {0}")]
    CorruptSketch(String),

    /// A pipeline step failed; `stage` is the name it was registered under.
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<TaxiSummaryError>,
    },
}

/// A convenient result type for Taxi Summary operations.
pub type TaxiSummaryResult<T> = std::result::Result<T, TaxiSummaryError>;
