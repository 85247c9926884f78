//! ## Taxi summary job
//!
//! [`TaxiSummaryJob`] wires the stages together:
//!
//! 1. [`load`](TaxiSummaryJob::load) the trip files into a raw text table,
//! 2. [`prepare`](TaxiSummaryJob::prepare) it through the cast, filter and feature steps, cache
//!    the result in memory and register it as [`TRIPS_TABLE`],
//! 3. [`summarize`](TaxiSummaryJob::summarize) it into the three summary tables,
//! 4. [`write`](TaxiSummaryJob::write) each summary to the output directory.
//!
//! [`run`](TaxiSummaryJob::run) performs all four steps. Any failure aborts the run.

use crate::aggregation::{
    self, MONTHLY_PAYMENT_SUMMARY, TIP_QUANTILE_BY_MONTH, TRIPS_BY_WEEKDAY, TRIPS_TABLE,
};
use crate::exceptions::TaxiSummaryResult;
use crate::loader;
use crate::make_pipeline;
use crate::pipeline::Pipeline;
use crate::settings::JobConfig;
use crate::sink;
use crate::transformers::cleaning::{TripCaster, TripFilter};
use crate::transformers::trip_features::TripFeatures;
use crate::udaf::sketch_quantile_udaf;
use datafusion::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// The three summary tables of a run, not yet executed.
pub struct SummaryTables {
    pub monthly_payment: DataFrame,
    pub tip_quantile_by_month: DataFrame,
    pub trips_by_weekday: DataFrame,
}

impl SummaryTables {
    /// (table name, frame) pairs in output order.
    pub fn into_named(self) -> Vec<(&'static str, DataFrame)> {
        vec![
            (MONTHLY_PAYMENT_SUMMARY, self.monthly_payment),
            (TIP_QUANTILE_BY_MONTH, self.tip_quantile_by_month),
            (TRIPS_BY_WEEKDAY, self.trips_by_weekday),
        ]
    }
}

/// Outcome of [`TaxiSummaryJob::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    /// Rows surviving cleaning, i.e. the size of the registered trip table.
    pub trip_rows: usize,
    pub written: Vec<PathBuf>,
}

pub struct TaxiSummaryJob {
    config: JobConfig,
    ctx: SessionContext,
}

impl TaxiSummaryJob {
    /// Validates `config` and sets up a session with the `sketch_quantile` aggregate registered.
    pub fn new(config: JobConfig) -> TaxiSummaryResult<Self> {
        config.validate()?;
        let ctx = SessionContext::new();
        ctx.register_udaf(sketch_quantile_udaf(
            config.tip_quantile,
            config.relative_accuracy,
        )?);
        Ok(Self { config, ctx })
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// The cleaning and feature steps, in order.
    pub fn pipeline(&self) -> Pipeline {
        make_pipeline!(
            false,
            ("cast", TripCaster::new()),
            ("filter", TripFilter::new(self.config.target_year)),
            ("features", TripFeatures::new(self.config.negative_durations)),
        )
    }

    pub async fn load(&self) -> TaxiSummaryResult<DataFrame> {
        loader::load_trips(&self.ctx, &self.config.input_patterns).await
    }

    /// Cleans and derives `raw`, materializes the result and registers it as [`TRIPS_TABLE`].
    pub async fn prepare(&self, raw: DataFrame) -> TaxiSummaryResult<DataFrame> {
        let trips = self.pipeline().apply(raw)?.cache().await?;
        aggregation::register_trips(&self.ctx, trips.clone())?;
        Ok(trips)
    }

    /// Builds the summaries of a prepared trip table. The SQL summaries read [`TRIPS_TABLE`].
    pub async fn summarize(&self, trips: DataFrame) -> TaxiSummaryResult<SummaryTables> {
        Ok(SummaryTables {
            monthly_payment: aggregation::monthly_payment_summary(trips)?,
            tip_quantile_by_month: aggregation::tip_quantile_by_month(&self.ctx).await?,
            trips_by_weekday: aggregation::trips_by_weekday(&self.ctx).await?,
        })
    }

    /// Writes every summary to the configured output directory.
    pub async fn write(&self, tables: SummaryTables) -> TaxiSummaryResult<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (name, df) in tables.into_named() {
            written.push(sink::write_table(df, &self.config.output_dir, name).await?);
        }
        Ok(written)
    }

    pub async fn run(&self) -> TaxiSummaryResult<JobReport> {
        let start = Instant::now();
        let raw = self.load().await?;
        let trips = self.prepare(raw).await?;
        let trip_rows = trips.clone().count().await?;
        info!(
            "Prepared {} trips for {} in table '{}'",
            trip_rows, self.config.target_year, TRIPS_TABLE
        );
        let tables = self.summarize(trips).await?;
        let written = self.write(tables).await?;
        info!("Job finished in {:?}", start.elapsed());
        Ok(JobReport { trip_rows, written })
    }
}
