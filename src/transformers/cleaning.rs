//! ## Transformers for cleaning trip records
//!
//! This module implements the two cleaning stages of the job:
//!
//! - **TripCaster:** Casts the raw text columns to their canonical types and normalizes
//!   `payment_type` to `card`, `cash` or `other`. Values that cannot be cast become null.
//! - **TripFilter:** Keeps only trips picked up in the target year whose key fields are present
//!   and valid (`fare_amount >= 0`, `tip_amount >= 0`, `trip_distance > 0`).
//!
//! Rows are dropped silently; there is no partial-success reporting.

use crate::exceptions::{TaxiSummaryError, TaxiSummaryResult};
use crate::schema::{
    trip_column, ColumnKind, DROPOFF_DATETIME, FARE_AMOUNT, PAYMENT_TYPE, PICKUP_DATETIME,
    TIP_AMOUNT, TRIP_COLUMNS, TRIP_DISTANCE,
};
use datafusion::arrow::datatypes::DataType;
use datafusion::prelude::*;
use datafusion_expr::{col, lit, try_cast, when, Expr};
use datafusion_functions::datetime::date_part;
use datafusion_functions::string::expr_fn::{btrim, upper};

/// Raw payment codes read as a card payment (compared after trimming and upper-casing).
pub const CARD_CODES: &[&str] = &["CRD", "CRE", "CREDIT", "CARD"];
/// Raw payment codes read as a cash payment.
pub const CASH_CODES: &[&str] = &["CAS", "CSH", "CASH"];

/// Validates that every column in `target_cols` exists in the DataFrame.
pub(crate) fn validate_columns(df: &DataFrame, target_cols: &[&str]) -> TaxiSummaryResult<()> {
    let schema = df.schema();
    for col_name in target_cols {
        if schema.field_with_name(None, col_name).is_err() {
            return Err(TaxiSummaryError::MissingColumn(format!(
                "Column '{}' not found in DataFrame",
                col_name
            )));
        }
    }
    Ok(())
}

/// Validates that a column exists and has a numeric type.
fn validate_numeric_column(df: &DataFrame, col_name: &str) -> TaxiSummaryResult<()> {
    let field = df.schema().field_with_name(None, col_name).map_err(|_| {
        TaxiSummaryError::MissingColumn(format!("Column '{}' not found", col_name))
    })?;
    if !field.data_type().is_numeric() {
        return Err(TaxiSummaryError::InvalidParameter(format!(
            "Column '{}' must be numeric, but found {:?}",
            col_name,
            field.data_type()
        )));
    }
    Ok(())
}

fn payment_category(raw: Expr) -> TaxiSummaryResult<Expr> {
    let code = upper(btrim(vec![raw]));
    let codes = |list: &[&str]| list.iter().map(|c| lit(*c)).collect::<Vec<_>>();
    when(code.clone().in_list(codes(CARD_CODES), false), lit("card"))
        .when(code.in_list(codes(CASH_CODES), false), lit("cash"))
        .otherwise(lit("other"))
        .map_err(TaxiSummaryError::from)
}

/// Casts the raw trip columns to their canonical types.
///
/// Timestamps become `Timestamp(Nanosecond)`, `passenger_count` becomes `Int32` and the
/// amounts, distances and coordinates become `Float64`. All casts are `TRY_CAST`s.
/// Columns outside the canonical layout are passed through unchanged.
#[derive(Debug, Default, Clone)]
pub struct TripCaster;

impl TripCaster {
    pub fn new() -> Self {
        Self
    }

    /// Checks that every canonical column is present.
    pub fn validate(&self, df: &DataFrame) -> TaxiSummaryResult<()> {
        let names: Vec<&str> = TRIP_COLUMNS.iter().map(|c| c.name).collect();
        validate_columns(df, &names)
    }

    pub fn transform(&self, df: DataFrame) -> TaxiSummaryResult<DataFrame> {
        let mut exprs = Vec::with_capacity(df.schema().fields().len());
        for field in df.schema().fields() {
            let name = field.name();
            let expr = match trip_column(name) {
                Some(column) if column.name == PAYMENT_TYPE => {
                    payment_category(col(name))?.alias(name)
                }
                Some(column) if column.kind != ColumnKind::Text => {
                    try_cast(col(name), column.kind.data_type()).alias(name)
                }
                _ => col(name),
            };
            exprs.push(expr);
        }
        df.select(exprs).map_err(TaxiSummaryError::from)
    }
}

/// Drops trips outside the target year and trips with missing or invalid key fields.
#[derive(Debug, Clone)]
pub struct TripFilter {
    pub target_year: i32,
}

impl TripFilter {
    pub fn new(target_year: i32) -> Self {
        Self { target_year }
    }

    /// The combined row predicate applied by [`Self::transform`].
    pub fn predicate(&self) -> Expr {
        let pickup_year = date_part().call(vec![lit("year"), col(PICKUP_DATETIME)]);
        col(PICKUP_DATETIME)
            .is_not_null()
            .and(col(DROPOFF_DATETIME).is_not_null())
            .and(col(FARE_AMOUNT).is_not_null())
            .and(col(TIP_AMOUNT).is_not_null())
            .and(col(TRIP_DISTANCE).is_not_null())
            .and(pickup_year.eq(lit(self.target_year)))
            .and(col(FARE_AMOUNT).gt_eq(lit(0.0)))
            .and(col(TIP_AMOUNT).gt_eq(lit(0.0)))
            .and(col(TRIP_DISTANCE).gt(lit(0.0)))
    }

    /// Checks that the key columns exist and have already been cast.
    pub fn validate(&self, df: &DataFrame) -> TaxiSummaryResult<()> {
        let field = df
            .schema()
            .field_with_name(None, PICKUP_DATETIME)
            .map_err(|_| {
                TaxiSummaryError::MissingColumn(format!("Column '{}' not found", PICKUP_DATETIME))
            })?;
        if !matches!(field.data_type(), DataType::Timestamp(_, _)) {
            return Err(TaxiSummaryError::InvalidParameter(format!(
                "Column '{}' must be a timestamp, but found {:?}",
                PICKUP_DATETIME,
                field.data_type()
            )));
        }
        validate_columns(df, &[DROPOFF_DATETIME])?;
        for name in [FARE_AMOUNT, TIP_AMOUNT, TRIP_DISTANCE] {
            validate_numeric_column(df, name)?;
        }
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> TaxiSummaryResult<DataFrame> {
        df.filter(self.predicate()).map_err(TaxiSummaryError::from)
    }
}
