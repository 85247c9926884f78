//! # Taxi Summary
//!
//! A batch job, built on Apache DataFusion, that reads NYC Yellow Taxi trip CSV files, keeps the
//! trips of one pickup year, derives duration and calendar columns, and writes three summary
//! tables as Parquet:
//!
//! - `monthly_payment_summary`: trips and mean fare, tip, distance and duration per month and
//!   payment type,
//! - `tip_quantile_by_month`: the approximate 99th percentile tip per month,
//! - `trips_by_weekday`: average number of trips per day for each weekday.
//!
//! ```rust,no_run
//! use taxi_summary::job::TaxiSummaryJob;
//! use taxi_summary::settings::JobConfig;
//!
//! # async fn run() -> taxi_summary::exceptions::TaxiSummaryResult<()> {
//! let config = JobConfig::default()
//!     .with_inputs(["data/yellow_tripdata_2010-*.csv.gz"])
//!     .with_output_dir("output");
//! let report = TaxiSummaryJob::new(config)?.run().await?;
//! println!("{} trips summarized", report.trip_rows);
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod exceptions;
pub mod job;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod schema;
pub mod settings;
pub mod sink;
pub mod sketch;
pub mod transformers;
pub mod udaf;
