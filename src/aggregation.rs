//! ## Summary aggregates
//!
//! Three summaries are computed from the cleaned, derived trip table:
//!
//! - [`monthly_payment_summary`]: trip count and mean fare, tip, distance and duration per
//!   (month, payment type), built with the DataFrame API.
//! - [`tip_quantile_by_month`]: the approximate tip quantile per month, from SQL.
//! - [`trips_by_weekday`]: average number of trips per calendar day for each weekday, from SQL.
//!
//! The SQL statements run against the table registered as [`TRIPS_TABLE`]. Every result is
//! ordered by its group key so output is reproducible.

use crate::exceptions::{TaxiSummaryError, TaxiSummaryResult};
use crate::schema::{FARE_AMOUNT, PAYMENT_TYPE, TIP_AMOUNT, TRIP_DISTANCE};
use crate::transformers::cleaning::validate_columns;
use crate::transformers::trip_features::{MONTH, TRIP_MINUTES};
use datafusion::functions_aggregate::expr_fn::{avg, count};
use datafusion::prelude::*;
use datafusion_expr::{col, lit};
use tracing::debug;

/// Logical name the derived trip table is registered under for SQL.
pub const TRIPS_TABLE: &str = "trips";

pub const MONTHLY_PAYMENT_SUMMARY: &str = "monthly_payment_summary";
pub const TIP_QUANTILE_BY_MONTH: &str = "tip_quantile_by_month";
pub const TRIPS_BY_WEEKDAY: &str = "trips_by_weekday";

/// Tip quantile per month. `sketch_quantile` is registered by [`crate::udaf`].
pub const TIP_QUANTILE_BY_MONTH_SQL: &str = "\
SELECT month, \
       COUNT(*) AS trips, \
       sketch_quantile(tip_amount) AS tip_quantile \
FROM trips \
GROUP BY month \
ORDER BY month";

/// Trips per weekday divided by the number of distinct dates falling on that weekday.
pub const TRIPS_BY_WEEKDAY_SQL: &str = "\
SELECT weekday, \
       CASE weekday \
           WHEN 0 THEN 'Sun' WHEN 1 THEN 'Mon' WHEN 2 THEN 'Tue' WHEN 3 THEN 'Wed' \
           WHEN 4 THEN 'Thu' WHEN 5 THEN 'Fri' ELSE 'Sat' \
       END AS weekday_name, \
       COUNT(*) AS trips, \
       COUNT(DISTINCT pickup_date) AS days, \
       CAST(COUNT(*) AS DOUBLE) / CAST(COUNT(DISTINCT pickup_date) AS DOUBLE) AS avg_trips_per_day \
FROM trips \
GROUP BY weekday \
ORDER BY weekday";

/// Registers the derived trip DataFrame as [`TRIPS_TABLE`], replacing any earlier registration.
pub fn register_trips(ctx: &SessionContext, trips: DataFrame) -> TaxiSummaryResult<()> {
    ctx.deregister_table(TRIPS_TABLE)?;
    ctx.register_table(TRIPS_TABLE, trips.into_view())?;
    debug!("Registered table '{}'", TRIPS_TABLE);
    Ok(())
}

/// Groups by (month, payment_type) and computes count and means, ordered by month then payment
/// type.
pub fn monthly_payment_summary(trips: DataFrame) -> TaxiSummaryResult<DataFrame> {
    validate_columns(
        &trips,
        &[MONTH, PAYMENT_TYPE, FARE_AMOUNT, TIP_AMOUNT, TRIP_DISTANCE, TRIP_MINUTES],
    )?;
    trips
        .aggregate(
            vec![col(MONTH), col(PAYMENT_TYPE)],
            vec![
                count(lit(1)).alias("trips"),
                avg(col(FARE_AMOUNT)).alias("avg_fare"),
                avg(col(TIP_AMOUNT)).alias("avg_tip"),
                avg(col(TRIP_DISTANCE)).alias("avg_distance"),
                avg(col(TRIP_MINUTES)).alias("avg_minutes"),
            ],
        )?
        .sort(vec![
            col(MONTH).sort(true, false),
            col(PAYMENT_TYPE).sort(true, false),
        ])
        .map_err(TaxiSummaryError::from)
}

/// Runs [`TIP_QUANTILE_BY_MONTH_SQL`] against the registered trip table.
pub async fn tip_quantile_by_month(ctx: &SessionContext) -> TaxiSummaryResult<DataFrame> {
    ctx.sql(TIP_QUANTILE_BY_MONTH_SQL)
        .await
        .map_err(TaxiSummaryError::from)
}

/// Runs [`TRIPS_BY_WEEKDAY_SQL`] against the registered trip table.
pub async fn trips_by_weekday(ctx: &SessionContext) -> TaxiSummaryResult<DataFrame> {
    ctx.sql(TRIPS_BY_WEEKDAY_SQL)
        .await
        .map_err(TaxiSummaryError::from)
}
