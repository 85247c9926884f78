//! ## Job Settings
//!
//! [`JobConfig`] holds the execution parameters of a run: which files to read, which pickup
//! year to keep, where to write the summary tables, and how the tip quantile is estimated.
//! The defaults are the hard-coded parameters of the job; the binary may override a few of
//! them from the environment through [`JobConfig::from_env`].

use crate::exceptions::{TaxiSummaryError, TaxiSummaryResult};
use std::path::PathBuf;

/// First and last year of trip files read by default.
pub const DEFAULT_FIRST_YEAR: i32 = 2006;
pub const DEFAULT_LAST_YEAR: i32 = 2010;

/// Pickup year kept by the cleaning stage by default.
pub const DEFAULT_TARGET_YEAR: i32 = 2010;

/// Environment variables read by [`JobConfig::from_env`].
pub const ENV_INPUT: &str = "TAXI_SUMMARY_INPUT";
pub const ENV_OUTPUT_DIR: &str = "TAXI_SUMMARY_OUTPUT_DIR";
pub const ENV_YEAR: &str = "TAXI_SUMMARY_YEAR";

/// What to do with trips whose dropoff precedes their pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegativeDurationPolicy {
    /// Leave `trip_minutes` negative.
    #[default]
    Keep,
    /// Replace negative `trip_minutes` with zero.
    Clamp,
    /// Remove the row.
    Drop,
}

/// Parameters of a single job run.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    /// File paths or glob patterns of the source CSV files.
    pub input_patterns: Vec<String>,
    /// Only trips picked up in this year survive cleaning.
    pub target_year: i32,
    /// Directory receiving one Parquet file per summary table.
    pub output_dir: PathBuf,
    /// Quantile of `tip_amount` reported per month (0.99 for the 99th percentile).
    pub tip_quantile: f64,
    /// Relative error bound of the quantile estimate.
    pub relative_accuracy: f64,
    pub negative_durations: NegativeDurationPolicy,
}

impl Default for JobConfig {
    fn default() -> Self {
        let input_patterns = (DEFAULT_FIRST_YEAR..=DEFAULT_LAST_YEAR)
            .map(|year| format!("data/yellow_tripdata_{}*.csv*", year))
            .collect();
        Self {
            input_patterns,
            target_year: DEFAULT_TARGET_YEAR,
            output_dir: PathBuf::from("output"),
            tip_quantile: 0.99,
            relative_accuracy: 0.01,
            negative_durations: NegativeDurationPolicy::Keep,
        }
    }
}

impl JobConfig {
    /// Builds the default configuration and applies the `TAXI_SUMMARY_*` overrides that are set.
    pub fn from_env() -> TaxiSummaryResult<Self> {
        let mut config = Self::default();
        if let Ok(inputs) = std::env::var(ENV_INPUT) {
            config.input_patterns = inputs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(dir) = std::env::var(ENV_OUTPUT_DIR) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(year) = std::env::var(ENV_YEAR) {
            config.target_year = year.trim().parse().map_err(|_| {
                TaxiSummaryError::InvalidParameter(format!(
                    "{} must be an integer year, got '{}'",
                    ENV_YEAR, year
                ))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_inputs<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target_year(mut self, year: i32) -> Self {
        self.target_year = year;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_tip_quantile(mut self, quantile: f64) -> Self {
        self.tip_quantile = quantile;
        self
    }

    pub fn with_relative_accuracy(mut self, accuracy: f64) -> Self {
        self.relative_accuracy = accuracy;
        self
    }

    pub fn with_negative_durations(mut self, policy: NegativeDurationPolicy) -> Self {
        self.negative_durations = policy;
        self
    }

    /// Checks that every parameter is usable before any file is opened.
    pub fn validate(&self) -> TaxiSummaryResult<()> {
        if self.input_patterns.is_empty() {
            return Err(TaxiSummaryError::InvalidParameter(
                "At least one input pattern is required".to_string(),
            ));
        }
        if !(1900..=2100).contains(&self.target_year) {
            return Err(TaxiSummaryError::InvalidParameter(format!(
                "Target year {} is out of range",
                self.target_year
            )));
        }
        if !(0.0..=1.0).contains(&self.tip_quantile) {
            return Err(TaxiSummaryError::InvalidParameter(format!(
                "Tip quantile {} must be between 0 and 1",
                self.tip_quantile
            )));
        }
        if !(self.relative_accuracy > 0.0 && self.relative_accuracy < 1.0) {
            return Err(TaxiSummaryError::InvalidParameter(format!(
                "Relative accuracy {} must be strictly between 0 and 1",
                self.relative_accuracy
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_covers_2006_to_2010() {
        let config = JobConfig::default();
        assert_eq!(config.input_patterns.len(), 5);
        assert!(config.input_patterns[0].contains("2006"));
        assert!(config.input_patterns[4].contains("2010"));
        assert_eq!(config.target_year, 2010);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders_override_defaults() {
        let config = JobConfig::default()
            .with_inputs(["a.csv", "b.csv.gz"])
            .with_target_year(2009)
            .with_output_dir("/tmp/summaries")
            .with_negative_durations(NegativeDurationPolicy::Clamp);
        assert_eq!(config.input_patterns, vec!["a.csv", "b.csv.gz"]);
        assert_eq!(config.target_year, 2009);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/summaries"));
        assert_eq!(config.negative_durations, NegativeDurationPolicy::Clamp);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let empty: [&str; 0] = [];
        assert!(JobConfig::default().with_inputs(empty).validate().is_err());
        assert!(JobConfig::default().with_tip_quantile(-0.1).validate().is_err());
        assert!(JobConfig::default().with_relative_accuracy(1.0).validate().is_err());
        assert!(JobConfig::default().with_target_year(10).validate().is_err());
    }

    // Only this test touches the TAXI_SUMMARY_* variables, so it runs all cases in sequence.
    #[test]
    fn test_from_env_applies_overrides() {
        std::env::set_var(ENV_INPUT, "a.csv, trips/*.csv.gz ,,");
        std::env::set_var(ENV_OUTPUT_DIR, "/tmp/summaries");
        std::env::set_var(ENV_YEAR, " 2009 ");
        let config = JobConfig::from_env().unwrap();
        assert_eq!(config.input_patterns, vec!["a.csv", "trips/*.csv.gz"]);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/summaries"));
        assert_eq!(config.target_year, 2009);
        assert_eq!(config.tip_quantile, 0.99);

        std::env::set_var(ENV_YEAR, "twenty-ten");
        assert!(matches!(
            JobConfig::from_env(),
            Err(TaxiSummaryError::InvalidParameter(_))
        ));

        std::env::set_var(ENV_YEAR, "2010");
        std::env::set_var(ENV_INPUT, " , ");
        assert!(matches!(
            JobConfig::from_env(),
            Err(TaxiSummaryError::InvalidParameter(_))
        ));

        std::env::remove_var(ENV_INPUT);
        std::env::remove_var(ENV_OUTPUT_DIR);
        std::env::remove_var(ENV_YEAR);
        assert_eq!(JobConfig::from_env().unwrap(), JobConfig::default());
    }
}
