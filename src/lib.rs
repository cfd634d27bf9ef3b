//! Batch vocal-biomarker feature extraction.
//!
//! Converts speech recordings into a fixed set of 43 scalar features (pitch
//! statistics, jitter, formants, tremor) for downstream modeling.
//!
//! ## Architecture
//!
//! ```text
//! label table (CSV) ──> participant ids
//!                              |
//!                              v
//!   audio dir ──match──> [(file, id), ...] ──> BatchRunner
//!                                                   |
//!                                     per file:     v
//!                                decode ──> AcousticToolkit
//!                                                   |
//!                          +------------+-----------+-----------+
//!                          v            v           v           v
//!                       Jitter       Pitch       Formant     Tremor
//!                          |            |           |           |
//!                          +------------+-----+-----+-----------+
//!                                             v
//!                                    FeatureRecord (43 keys)
//!                                             |
//!                                             v
//!                                   FeatureTable ──> CSV
//! ```
//!
//! Every per-file failure degrades to missing values at the narrowest scope;
//! the output table always has one complete row per requested id.

pub mod analyzers;
pub mod audio;
pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod labels;
pub mod pipeline;
pub mod toolkit;

pub use batch::{BatchRunner, MemoryMonitor};
pub use config::ExtractionConfig;
pub use error::ExtractError;
pub use features::{FeatureRecord, FeatureTable, FEATURE_NAMES};
pub use pipeline::FeatureExtractionPipeline;
pub use toolkit::{AcousticToolkit, DspToolkit, Waveform};
