//! ## Transformer for derived trip features
//!
//! [`TripFeatures`] appends the columns the summaries group and average on:
//!
//! - `trip_minutes`: (dropoff - pickup) in seconds, divided by 60.
//! - `year`, `month`, `hour`: extracted from the pickup timestamp.
//! - `weekday`: day of week of the pickup, 0 = Sunday.
//! - `pickup_date`: calendar date of the pickup.
//!
//! All features are row-local. Trips whose dropoff precedes their pickup are handled according
//! to the configured [`NegativeDurationPolicy`].

use crate::exceptions::{TaxiSummaryError, TaxiSummaryResult};
use crate::schema::{DROPOFF_DATETIME, PICKUP_DATETIME};
use crate::settings::NegativeDurationPolicy;
use datafusion::arrow::datatypes::DataType;
use datafusion::prelude::*;
use datafusion_expr::{cast, col, lit, when, Expr};
use datafusion_functions::datetime::{date_part, to_unixtime};

pub const TRIP_MINUTES: &str = "trip_minutes";
pub const YEAR: &str = "year";
pub const MONTH: &str = "month";
pub const HOUR: &str = "hour";
pub const WEEKDAY: &str = "weekday";
pub const PICKUP_DATE: &str = "pickup_date";

/// Validates that a column exists and is of a datetime type (Timestamp, Date32, or Date64).
fn validate_datetime_column(df: &DataFrame, col_name: &str) -> TaxiSummaryResult<()> {
    let field = df.schema().field_with_name(None, col_name).map_err(|_| {
        TaxiSummaryError::MissingColumn(format!("Column '{}' not found", col_name))
    })?;
    match field.data_type() {
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => Ok(()),
        dt => Err(TaxiSummaryError::InvalidParameter(format!(
            "Column '{}' must be a datetime type (Timestamp, Date32, or Date64), but found {:?}",
            col_name, dt
        ))),
    }
}

/// Difference between two datetime expressions in minutes, via Unix seconds.
fn minutes_between(later: Expr, earlier: Expr) -> Expr {
    let later_sec = to_unixtime().call(vec![later]);
    let earlier_sec = to_unixtime().call(vec![earlier]);
    cast(later_sec - earlier_sec, DataType::Float64) / lit(60.0)
}

fn pickup_part(part: &str) -> Expr {
    cast(
        date_part().call(vec![lit(part), col(PICKUP_DATETIME)]),
        DataType::Int32,
    )
}

/// Appends duration and calendar features computed from the pickup and dropoff timestamps.
#[derive(Debug, Clone, Default)]
pub struct TripFeatures {
    pub negative_durations: NegativeDurationPolicy,
}

impl TripFeatures {
    pub fn new(negative_durations: NegativeDurationPolicy) -> Self {
        Self { negative_durations }
    }

    pub fn validate(&self, df: &DataFrame) -> TaxiSummaryResult<()> {
        validate_datetime_column(df, PICKUP_DATETIME)?;
        validate_datetime_column(df, DROPOFF_DATETIME)
    }

    /// Returns a new DataFrame with the original columns plus `trip_minutes`, `year`, `month`,
    /// `hour`, `weekday` and `pickup_date`.
    pub fn transform(&self, df: DataFrame) -> TaxiSummaryResult<DataFrame> {
        self.validate(&df)?;
        let mut exprs: Vec<Expr> = df.schema().fields().iter().map(|f| col(f.name())).collect();

        let minutes = minutes_between(col(DROPOFF_DATETIME), col(PICKUP_DATETIME));
        let minutes = match self.negative_durations {
            NegativeDurationPolicy::Clamp => when(minutes.clone().lt(lit(0.0)), lit(0.0))
                .otherwise(minutes)
                .map_err(TaxiSummaryError::from)?,
            NegativeDurationPolicy::Keep | NegativeDurationPolicy::Drop => minutes,
        };
        exprs.push(minutes.alias(TRIP_MINUTES));
        exprs.push(pickup_part("year").alias(YEAR));
        exprs.push(pickup_part("month").alias(MONTH));
        exprs.push(pickup_part("hour").alias(HOUR));
        exprs.push(pickup_part("dow").alias(WEEKDAY));
        exprs.push(cast(col(PICKUP_DATETIME), DataType::Date32).alias(PICKUP_DATE));

        let derived = df.select(exprs)?;
        match self.negative_durations {
            NegativeDurationPolicy::Drop => derived
                .filter(col(TRIP_MINUTES).gt_eq(lit(0.0)))
                .map_err(TaxiSummaryError::from),
            NegativeDurationPolicy::Keep | NegativeDurationPolicy::Clamp => Ok(derived),
        }
    }
}
