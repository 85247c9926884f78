//! # Transformer Implementations
//!
//! The submodules contain the stages chained by [`crate::pipeline::Pipeline`].

pub mod cleaning;
pub mod trip_features;

crate::impl_transformer!(cleaning::TripCaster);
crate::impl_transformer!(cleaning::TripFilter);
crate::impl_transformer!(trip_features::TripFeatures);
