//! ## `sketch_quantile` aggregate function
//!
//! Exposes [`QuantileSketch`] to DataFusion as a user-defined aggregate so the tip quantile
//! can be computed from SQL. The quantile and the relative accuracy are fixed when the
//! function is created; SQL calls it with a single `Float64` argument:
//!
//! ```sql
//! SELECT month, sketch_quantile(tip_amount) FROM trips GROUP BY month
//! ```
//!
//! Partial aggregates exchange serialized sketches (one `Binary` state column), so results
//! keep the sketch's error bound no matter how DataFusion partitions the input.

use crate::exceptions::{TaxiSummaryError, TaxiSummaryResult};
use crate::sketch::QuantileSketch;
use datafusion::arrow::array::{Array, ArrayRef};
use datafusion::arrow::datatypes::DataType;
use datafusion::common::cast::{as_binary_array, as_float64_array};
use datafusion::error::{DataFusionError, Result as DFResult};
use datafusion::logical_expr::{create_udaf, Accumulator, AggregateUDF, Volatility};
use datafusion::scalar::ScalarValue;
use std::sync::Arc;

/// Name the aggregate is registered under.
pub const SKETCH_QUANTILE: &str = "sketch_quantile";

fn to_df_error(err: TaxiSummaryError) -> DataFusionError {
    DataFusionError::Execution(err.to_string())
}

/// Accumulates one group's values into a [`QuantileSketch`].
#[derive(Debug)]
pub struct QuantileAccumulator {
    quantile: f64,
    sketch: QuantileSketch,
}

impl QuantileAccumulator {
    pub fn new(quantile: f64, relative_accuracy: f64) -> TaxiSummaryResult<Self> {
        if !(0.0..=1.0).contains(&quantile) {
            return Err(TaxiSummaryError::InvalidParameter(format!(
                "Quantile {} must be between 0 and 1",
                quantile
            )));
        }
        Ok(Self {
            quantile,
            sketch: QuantileSketch::new(relative_accuracy)?,
        })
    }
}

impl Accumulator for QuantileAccumulator {
    fn update_batch(&mut self, values: &[ArrayRef]) -> DFResult<()> {
        let values = as_float64_array(&values[0])?;
        values.iter().flatten().for_each(|v| self.sketch.insert(v));
        Ok(())
    }

    fn evaluate(&mut self) -> DFResult<ScalarValue> {
        let estimate = self.sketch.quantile(self.quantile).map_err(to_df_error)?;
        Ok(ScalarValue::Float64(estimate))
    }

    fn size(&self) -> usize {
        std::mem::size_of_val(self) + self.sketch.bucket_count() * 32
    }

    fn state(&mut self) -> DFResult<Vec<ScalarValue>> {
        Ok(vec![ScalarValue::Binary(Some(self.sketch.to_bytes()))])
    }

    fn merge_batch(&mut self, states: &[ArrayRef]) -> DFResult<()> {
        let sketches = as_binary_array(&states[0])?;
        for i in 0..sketches.len() {
            if sketches.is_null(i) {
                continue;
            }
            let other = QuantileSketch::from_bytes(sketches.value(i)).map_err(to_df_error)?;
            self.sketch.merge(&other).map_err(to_df_error)?;
        }
        Ok(())
    }
}

/// Builds the `sketch_quantile` aggregate for the given quantile and relative accuracy.
pub fn sketch_quantile_udaf(quantile: f64, relative_accuracy: f64) -> TaxiSummaryResult<AggregateUDF> {
    // Fail on bad parameters here rather than at the first group.
    QuantileAccumulator::new(quantile, relative_accuracy)?;
    Ok(create_udaf(
        SKETCH_QUANTILE,
        vec![DataType::Float64],
        Arc::new(DataType::Float64),
        Volatility::Immutable,
        Arc::new(move |_| {
            let acc = QuantileAccumulator::new(quantile, relative_accuracy).map_err(to_df_error)?;
            Ok(Box::new(acc) as Box<dyn Accumulator>)
        }),
        Arc::new(vec![DataType::Binary]),
    ))
}
