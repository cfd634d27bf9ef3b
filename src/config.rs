use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extraction configuration
///
/// All analysis parameters in one place. Defaults reproduce the reference
/// parameter set: 75-500 Hz pitch search, 10 ms analysis step, 5 formants up
/// to 5500 Hz with a 25 ms window, jitter periods bounded to [0.1 ms, 20 ms]
/// with a 1.3 maximum period ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub schema_version: u32,

    // Pitch tracking
    pub pitch_floor_hz: f64,
    pub pitch_ceiling_hz: f64,
    pub time_step_s: f64,

    // Jitter period filtering
    pub shortest_period_s: f64,
    pub longest_period_s: f64,
    pub max_period_ratio: f64,

    // Formant estimation
    pub max_formants: usize,
    pub formant_ceiling_hz: f64,
    pub formant_window_s: f64,
    pub pre_emphasis_hz: f64,

    // Tremor band
    pub tremor_band_low_hz: f64,
    pub tremor_band_high_hz: f64,
    pub tremor_min_voiced_frames: usize,

    // Batch behavior
    pub memory_threshold_percent: f64,
    pub workers: usize,
    pub progress_interval: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            pitch_floor_hz: 75.0,
            pitch_ceiling_hz: 500.0,
            time_step_s: 0.01,
            shortest_period_s: 0.0001,
            longest_period_s: 0.02,
            max_period_ratio: 1.3,
            max_formants: 5,
            formant_ceiling_hz: 5500.0,
            formant_window_s: 0.025,
            pre_emphasis_hz: 50.0,
            tremor_band_low_hz: 1.5,
            tremor_band_high_hz: 15.0,
            tremor_min_voiced_frames: 30,
            memory_threshold_percent: 80.0,
            workers: 1,
            progress_interval: 20,
        }
    }
}

impl ExtractionConfig {
    /// Load config from file, or fall back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            serde_json::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")
    }
}
