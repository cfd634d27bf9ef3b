//! Error taxonomy for the extraction pipeline.
//!
//! Three failure classes matter downstream: a decode failure blanks the whole
//! record, toolkit and insufficient-data failures blank only the features that
//! depend on the failing structure. All of them surface as missing values in
//! the output table; none of them aborts the batch.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Audio file could not be opened or decoded. Whole record goes missing.
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// A toolkit routine (pitch tracking, pulse detection, formant
    /// estimation) failed for this file.
    #[error("toolkit failure: {0}")]
    Toolkit(String),

    /// Too little voiced material to compute a feature.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Label table missing or unreadable. The only fatal pre-loop condition.
    #[error("label table error: {0}")]
    Label(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
