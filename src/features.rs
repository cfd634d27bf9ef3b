//! Feature schema, records, and the output table.
//!
//! The 43 feature names are a fixed contract with downstream modeling code.
//! A [`FeatureRecord`] is always complete: every name maps to a value or an
//! explicit missing, no extras, no omissions, regardless of which failure
//! path produced it.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ExtractError;

/// Participant identifier from the label table.
pub type ParticipantId = i64;

/// The fixed output schema, in its canonical column order. Do not rename or
/// reorder.
pub const FEATURE_NAMES: [&str; 43] = [
    "ddp_jitter",
    "f0_range",
    "f1_bandwidth_mean",
    "f1_bandwidth_sd",
    "f1_frequency_mean",
    "f1_frequency_sd",
    "f2_bandwidth_mean",
    "f2_bandwidth_sd",
    "f2_frequency_mean",
    "f2_frequency_sd",
    "f3_bandwidth_mean",
    "f3_bandwidth_sd",
    "f3_frequency_mean",
    "f3_frequency_sd",
    "jitter_local_mean",
    "jitter_local_sd",
    "local_absolute_jitter",
    "pitch_coefficient_of_variation",
    "pitch_first_quartile",
    "pitch_kurtosis",
    "pitch_linear_regression_mse",
    "pitch_linear_regression_offset",
    "pitch_linear_regression_slope",
    "pitch_max",
    "pitch_mean",
    "pitch_min",
    "pitch_percentile_1",
    "pitch_percentile_20",
    "pitch_percentile_20_80_range",
    "pitch_percentile_80",
    "pitch_percentile_99",
    "pitch_percentile_1_99_range",
    "pitch_q2_q1_range",
    "pitch_q3_q1_range",
    "pitch_q3_q2_range",
    "pitch_range",
    "pitch_second_quartile",
    "pitch_skewness",
    "pitch_std",
    "pitch_third_quartile",
    "ppq5_jitter",
    "rap_jitter",
    "vocal_tremor",
];

/// Partial output of one analyzer: computed values and explicit missings.
///
/// Analyzers insert `None` when a sub-feature fails, exactly like they insert
/// numbers when it succeeds, so merging never has to distinguish the two.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    values: BTreeMap<&'static str, Option<f64>>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, value: Option<f64>) {
        debug_assert!(
            FEATURE_NAMES.contains(&name),
            "unknown feature name: {name}"
        );
        self.values.insert(name, value);
    }

    /// Absorb another analyzer's output. Analyzers own disjoint subsets of
    /// the schema, so collisions cannot occur in practice.
    pub fn merge(&mut self, other: FeatureSet) {
        self.values.extend(other.values);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One participant's complete 43-feature row.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub id: ParticipantId,
    values: BTreeMap<&'static str, Option<f64>>,
}

impl FeatureRecord {
    /// Build a record from merged analyzer output, filling every absent
    /// schema key with missing.
    pub fn from_set(id: ParticipantId, mut set: FeatureSet) -> Self {
        let mut values = BTreeMap::new();
        for name in FEATURE_NAMES {
            values.insert(name, set.values.remove(name).flatten());
        }
        Self { id, values }
    }

    /// Record with all 43 features missing, id preserved.
    pub fn all_missing(id: ParticipantId) -> Self {
        Self::from_set(id, FeatureSet::new())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    /// Values in schema order; always exactly 43 entries.
    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        FEATURE_NAMES.iter().map(|name| self.values[name])
    }

    /// Number of features carrying a numeric value.
    pub fn computed_count(&self) -> usize {
        self.values.values().filter(|v| v.is_some()).count()
    }
}

/// Ordered collection of records for one run.
#[derive(Debug, Default)]
pub struct FeatureTable {
    records: Vec<FeatureRecord>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: FeatureRecord) {
        self.records.push(record);
    }

    pub fn sort_by_id(&mut self) {
        self.records.sort_by_key(|r| r.id);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    /// Persist as CSV: `id,<43 names>`, missing as an empty field.
    pub fn write_csv(&self, path: &Path) -> Result<(), ExtractError> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = Vec::with_capacity(FEATURE_NAMES.len() + 1);
        header.push("id");
        header.extend(FEATURE_NAMES);
        writer.write_record(&header)?;

        for record in &self.records {
            let mut row = Vec::with_capacity(FEATURE_NAMES.len() + 1);
            row.push(record.id.to_string());
            for value in record.values() {
                match value {
                    Some(v) if v.is_finite() => row.push(v.to_string()),
                    _ => row.push(String::new()),
                }
            }
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }
}
