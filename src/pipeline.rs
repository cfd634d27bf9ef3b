//! Single-file extraction pipeline.
//!
//! One pipeline run takes a recording from decoded samples to a complete
//! [`FeatureRecord`]. Every stage is firewalled: a failed decode yields an
//! all-missing record, a failed toolkit product leaves only its dependent
//! features missing, and the record always carries the full schema.

use std::path::Path;

use crate::analyzers::{formant_stats, jitter, pitch_stats, tremor};
use crate::analyzers::jitter::JitterParams;
use crate::analyzers::tremor::TremorParams;
use crate::audio;
use crate::config::ExtractionConfig;
use crate::features::{FeatureRecord, FeatureSet, ParticipantId};
use crate::toolkit::{AcousticToolkit, FormantParams, PitchParams, Waveform};

pub struct FeatureExtractionPipeline<T: AcousticToolkit> {
    toolkit: T,
    config: ExtractionConfig,
}

impl<T: AcousticToolkit> FeatureExtractionPipeline<T> {
    pub fn new(toolkit: T, config: ExtractionConfig) -> Self {
        Self { toolkit, config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract the full feature record for one recording.
    ///
    /// Never fails: an undecodable file logs a warning and yields an
    /// all-missing record under the participant's id.
    pub fn extract_file(&self, path: &Path, id: ParticipantId) -> FeatureRecord {
        match audio::decode(path) {
            Ok(wave) => self.extract_waveform(&wave, id),
            Err(e) => {
                tracing::warn!(participant = id, error = %e, "decode failed, emitting empty record");
                FeatureRecord::all_missing(id)
            }
        }
    }

    /// Extract features from an already-decoded waveform.
    pub fn extract_waveform(&self, wave: &Waveform, id: ParticipantId) -> FeatureRecord {
        let mut set = FeatureSet::new();
        set.merge(self.jitter_features(wave, id));
        set.merge(self.pitch_features(wave, id));
        set.merge(self.formant_features(wave, id));
        FeatureRecord::from_set(id, set)
    }

    fn pitch_params(&self) -> PitchParams {
        PitchParams {
            floor_hz: self.config.pitch_floor_hz,
            ceiling_hz: self.config.pitch_ceiling_hz,
            time_step_s: self.config.time_step_s,
        }
    }

    fn jitter_features(&self, wave: &Waveform, id: ParticipantId) -> FeatureSet {
        match self.toolkit.point_process(wave, &self.pitch_params()) {
            Ok(pp) => {
                let params = JitterParams {
                    shortest_period_s: self.config.shortest_period_s,
                    longest_period_s: self.config.longest_period_s,
                    max_period_ratio: self.config.max_period_ratio,
                };
                jitter::analyze(&pp, &params)
            }
            Err(e) => {
                tracing::warn!(participant = id, error = %e, "pulse detection failed");
                FeatureSet::new()
            }
        }
    }

    fn pitch_features(&self, wave: &Waveform, id: ParticipantId) -> FeatureSet {
        match self.toolkit.pitch_contour(wave, &self.pitch_params()) {
            Ok(contour) => {
                let mut set = pitch_stats::analyze(&contour);
                let params = TremorParams {
                    band_low_hz: self.config.tremor_band_low_hz,
                    band_high_hz: self.config.tremor_band_high_hz,
                    min_voiced_frames: self.config.tremor_min_voiced_frames,
                };
                set.merge(tremor::analyze(&contour.voiced(), &params));
                set
            }
            Err(e) => {
                tracing::warn!(participant = id, error = %e, "pitch tracking failed");
                FeatureSet::new()
            }
        }
    }

    fn formant_features(&self, wave: &Waveform, id: ParticipantId) -> FeatureSet {
        let params = FormantParams {
            time_step_s: self.config.time_step_s,
            max_formants: self.config.max_formants,
            ceiling_hz: self.config.formant_ceiling_hz,
            window_s: self.config.formant_window_s,
            pre_emphasis_hz: self.config.pre_emphasis_hz,
        };
        match self.toolkit.formant_grid(wave, &params) {
            Ok(grid) => formant_stats::analyze(&grid, wave.duration()),
            Err(e) => {
                tracing::warn!(participant = id, error = %e, "formant estimation failed");
                FeatureSet::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::features::FEATURE_NAMES;
    use crate::toolkit::{FormantGrid, FormantPoint, PitchContour, PointProcess};

    /// Deterministic toolkit: steady 100 Hz voice with fixed formants.
    struct FakeToolkit {
        fail_pitch: bool,
        fail_pulses: bool,
        fail_formants: bool,
    }

    impl FakeToolkit {
        fn working() -> Self {
            Self {
                fail_pitch: false,
                fail_pulses: false,
                fail_formants: false,
            }
        }
    }

    impl AcousticToolkit for FakeToolkit {
        fn pitch_contour(
            &self,
            wave: &Waveform,
            params: &PitchParams,
        ) -> Result<PitchContour, ExtractError> {
            if self.fail_pitch {
                return Err(ExtractError::Toolkit("pitch unavailable".into()));
            }
            let frames = (wave.duration() / params.time_step_s) as usize;
            Ok(PitchContour {
                times: (0..frames).map(|i| i as f64 * params.time_step_s).collect(),
                frequencies: vec![100.0; frames],
                time_step_s: params.time_step_s,
            })
        }

        fn point_process(
            &self,
            wave: &Waveform,
            _params: &PitchParams,
        ) -> Result<PointProcess, ExtractError> {
            if self.fail_pulses {
                return Err(ExtractError::Toolkit("pulses unavailable".into()));
            }
            let count = (wave.duration() * 100.0) as usize;
            Ok(PointProcess {
                times: (0..count).map(|i| i as f64 * 0.01).collect(),
            })
        }

        fn formant_grid(
            &self,
            wave: &Waveform,
            params: &FormantParams,
        ) -> Result<FormantGrid, ExtractError> {
            if self.fail_formants {
                return Err(ExtractError::Toolkit("formants unavailable".into()));
            }
            let frames = (wave.duration() / params.time_step_s) as usize;
            let frame = vec![
                FormantPoint {
                    frequency_hz: 700.0,
                    bandwidth_hz: 80.0,
                },
                FormantPoint {
                    frequency_hz: 1200.0,
                    bandwidth_hz: 110.0,
                },
                FormantPoint {
                    frequency_hz: 2600.0,
                    bandwidth_hz: 190.0,
                },
            ];
            Ok(FormantGrid {
                times: (0..frames).map(|i| i as f64 * params.time_step_s).collect(),
                frames: vec![frame; frames],
            })
        }
    }

    fn one_second_wave() -> Waveform {
        Waveform::new(vec![0.0; 16_000], 16_000)
    }

    fn pipeline(toolkit: FakeToolkit) -> FeatureExtractionPipeline<FakeToolkit> {
        FeatureExtractionPipeline::new(toolkit, ExtractionConfig::default())
    }

    #[test]
    fn test_full_record_from_working_toolkit() {
        let record = pipeline(FakeToolkit::working()).extract_waveform(&one_second_wave(), 5);

        assert_eq!(record.id, 5);
        assert_eq!(record.get("pitch_mean"), Some(100.0));
        assert_eq!(record.get("pitch_std"), Some(0.0));
        // The fake's 10 ms grid carries float rounding into the periods.
        assert!(record.get("jitter_local_mean").unwrap().abs() < 1e-12);
        assert!((record.get("f1_frequency_mean").unwrap() - 700.0).abs() < 1e-9);
        assert!(record.get("vocal_tremor").is_some());
        assert_eq!(record.get("pitch_linear_regression_slope"), Some(0.0));
        // A perfectly steady contour has zero variance, so the shape
        // moments are undefined; everything else is numeric.
        assert_eq!(record.get("pitch_skewness"), None);
        assert_eq!(record.get("pitch_kurtosis"), None);
        assert_eq!(record.computed_count(), FEATURE_NAMES.len() - 2);
    }

    #[test]
    fn test_pitch_failure_spares_other_features() {
        let record = pipeline(FakeToolkit {
            fail_pitch: true,
            ..FakeToolkit::working()
        })
        .extract_waveform(&one_second_wave(), 5);

        // The 24 pitch stats and tremor are gone, jitter and formants remain.
        assert_eq!(record.get("pitch_mean"), None);
        assert_eq!(record.get("vocal_tremor"), None);
        assert!(record.get("jitter_local_mean").unwrap().abs() < 1e-12);
        assert!(record.get("f2_bandwidth_mean").is_some());
    }

    #[test]
    fn test_pulse_failure_spares_other_features() {
        let record = pipeline(FakeToolkit {
            fail_pulses: true,
            ..FakeToolkit::working()
        })
        .extract_waveform(&one_second_wave(), 5);

        assert_eq!(record.get("jitter_local_mean"), None);
        assert_eq!(record.get("ddp_jitter"), None);
        assert_eq!(record.get("pitch_mean"), Some(100.0));
    }

    #[test]
    fn test_all_failures_still_complete_schema() {
        let record = pipeline(FakeToolkit {
            fail_pitch: true,
            fail_pulses: true,
            fail_formants: true,
        })
        .extract_waveform(&one_second_wave(), 9);

        assert_eq!(record.id, 9);
        assert_eq!(record.computed_count(), 0);
        for name in FEATURE_NAMES {
            assert_eq!(record.get(name), None, "{name} should be missing");
        }
    }

    #[test]
    fn test_undecodable_file_yields_all_missing() {
        let record = pipeline(FakeToolkit::working())
            .extract_file(Path::new("/nonexistent/voice.wav"), 3);

        assert_eq!(record.id, 3);
        assert_eq!(record.computed_count(), 0);
    }
}
