//! Feature analyzers.
//!
//! Each analyzer consumes one toolkit product (point process, pitch
//! contour, formant grid) and yields a [`FeatureSet`](crate::features::FeatureSet)
//! covering its slice of the output schema. Analyzers never error: any
//! value they cannot compute is recorded as missing, so the union of all
//! analyzer outputs always fills the schema.

pub mod formant_stats;
pub mod jitter;
pub mod pitch_stats;
pub mod tremor;
