//! ## Trip Pipeline
//!
//! This module provides the abstractions used to chain the cleaning and feature stages of the
//! job.
//!
//! ### Overview
//!
//! - The [`Transformer`] trait is the common interface of a stage: `validate` checks that the
//!   input DataFrame has the columns (and types) the stage needs, `transform` returns a new
//!   DataFrame whose logical plan includes the stage.
//! - The [`Pipeline`] struct runs a sequence of named transformers, each one's output being the
//!   next one's input. Errors are tagged with the name of the failing step.
//! - Macros [`crate::impl_transformer`] and [`crate::make_pipeline`] remove the boilerplate of
//!   implementing the trait and boxing the steps.
//!
//! Transformations only extend the DataFrame's logical plan; nothing is executed until the
//! caller collects (or caches) the final DataFrame.

use crate::exceptions::{TaxiSummaryError, TaxiSummaryResult};
use datafusion::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Trait for the stages of the trip pipeline.
pub trait Transformer {
    /// Checks that the input DataFrame can be transformed by this stage.
    ///
    /// # Returns
    ///
    /// * `TaxiSummaryResult<()>` - Ok if the input is usable, otherwise the reason it is not
    ///   (typically [`TaxiSummaryError::MissingColumn`]).
    fn validate(&self, df: &DataFrame) -> TaxiSummaryResult<()>;

    /// Transforms the input DataFrame, returning a new DataFrame with the stage applied.
    fn transform(&self, df: DataFrame) -> TaxiSummaryResult<DataFrame>;
}

/// Macro to implement the [`Transformer`] trait for a stage type.
///
/// The type must already have inherent methods:
/// - `fn validate(&self, &DataFrame) -> TaxiSummaryResult<()>`
/// - `fn transform(&self, DataFrame) -> TaxiSummaryResult<DataFrame>`
///
/// # Example
///
/// ```rust,no_run
/// use taxi_summary::exceptions::TaxiSummaryResult;
/// use taxi_summary::impl_transformer;
/// use datafusion::prelude::DataFrame;
///
/// pub struct Passthrough;
///
/// impl Passthrough {
///     pub fn validate(&self, _df: &DataFrame) -> TaxiSummaryResult<()> {
///         Ok(())
///     }
///
///     pub fn transform(&self, df: DataFrame) -> TaxiSummaryResult<DataFrame> {
///         Ok(df)
///     }
/// }
///
/// impl_transformer!(Passthrough);
/// ```
#[macro_export]
macro_rules! impl_transformer {
    ($ty:ty) => {
        impl $crate::pipeline::Transformer for $ty {
            fn validate(
                &self,
                df: &datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::TaxiSummaryResult<()> {
                <$ty>::validate(self, df)
            }
            fn transform(
                &self,
                df: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::TaxiSummaryResult<datafusion::prelude::DataFrame> {
                <$ty>::transform(self, df)
            }
        }
    };
}

/// A boxed pipeline step.
pub type Step = Box<dyn Transformer + Send + Sync>;

/// A pipeline that chains a sequence of transformers.
pub struct Pipeline {
    steps: Vec<(String, Step)>,
    verbose: bool,
}

impl Pipeline {
    /// Creates a new pipeline.
    ///
    /// # Arguments
    ///
    /// * `steps` - A vector of (name, transformer) pairs (each transformer is already boxed).
    /// * `verbose` - If true, logs each step at `INFO` level instead of `DEBUG`.
    pub fn new(steps: Vec<(String, Step)>, verbose: bool) -> Self {
        Self { steps, verbose }
    }

    /// Names of the steps, in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Validates and applies each step in order.
    pub fn apply(&self, df: DataFrame) -> TaxiSummaryResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(TaxiSummaryError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let mut current_df = df;
        for (name, step) in self.steps.iter() {
            let start = Instant::now();
            let tag = |source: TaxiSummaryError| TaxiSummaryError::StageFailed {
                stage: name.clone(),
                source: Box::new(source),
            };
            step.validate(&current_df).map_err(tag)?;
            current_df = step.transform(current_df).map_err(tag)?;
            if self.verbose {
                info!("Step '{}' planned in {:?}", name, start.elapsed());
            } else {
                debug!("Step '{}' planned in {:?}", name, start.elapsed());
            }
        }
        Ok(current_df)
    }
}

/// Macro to simplify pipeline creation by automatically boxing transformers.
///
/// # Example
///
/// ```rust,no_run
/// use taxi_summary::make_pipeline;
/// use taxi_summary::transformers::cleaning::{TripCaster, TripFilter};
///
/// let pipeline = make_pipeline!(false,
///     ("cast", TripCaster::new()),
///     ("filter", TripFilter::new(2010)),
/// );
/// ```
#[macro_export]
macro_rules! make_pipeline {
    ($verbose:expr, $(($name:expr, $transformer:expr)),+ $(,)?) => {
        {
            let steps: Vec<(String, $crate::pipeline::Step)> = vec![
                $(
                    ($name.to_string(), Box::new($transformer)),
                )+
            ];
            $crate::pipeline::Pipeline::new(steps, $verbose)
        }
    };
}
