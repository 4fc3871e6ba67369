//! HRV feature extraction.
//!
//! Pure functions from a window snapshot (raw RR/HR series plus summed
//! motion channels) to a named feature vector in one of two fixed schemas.

pub mod frequency;
pub mod nonlinear;
pub mod time_domain;

use std::collections::HashMap;

use crate::buffer::WindowSnapshot;
use crate::error::EmotionError;

use frequency::spectral_powers;
use nonlinear::{dfa_alpha1, sample_entropy, sd1_sd2_ratio, SAMPEN_M, SAMPEN_R_FACTOR};
use time_domain::{hr_mean, mean_rr, pnn50, rmssd, sdnn};

/// Physiologically plausible RR interval range, milliseconds.
pub const RR_MIN_MS: f64 = 300.0;
pub const RR_MAX_MS: f64 = 2000.0;
/// Maximum step from the previously retained RR value; larger jumps are
/// treated as ectopic/artifact beats.
pub const RR_MAX_DELTA_MS: f64 = 250.0;

/// Canonical 14-descriptor schema, in classifier input order.
pub const CANONICAL_FEATURES: [&str; 14] = [
    "RMSSD",
    "Mean_RR",
    "HRV_SDNN",
    "pNN50",
    "HRV_HF",
    "HRV_LF",
    "HRV_HF_nu",
    "HRV_LF_nu",
    "HRV_LFHF",
    "HRV_TP",
    "HRV_SD1SD2",
    "HRV_Sampen",
    "HRV_DFA_alpha1",
    "HR",
];

/// Legacy 5-descriptor schema kept for older models.
pub const LEGACY_FEATURES: [&str; 5] = ["hr_mean", "sdnn", "rmssd", "pnn50", "mean_rr"];

/// Which feature set a classifier declares as its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSchema {
    Legacy5,
    Canonical14,
}

impl FeatureSchema {
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            FeatureSchema::Legacy5 => &LEGACY_FEATURES,
            FeatureSchema::Canonical14 => &CANONICAL_FEATURES,
        }
    }

    /// Matches a classifier's declared input names against the known
    /// schemas. Name set and order must match exactly.
    pub fn from_declared(names: &[String]) -> Option<Self> {
        let matches = |schema: &[&str]| {
            names.len() == schema.len() && names.iter().zip(schema).all(|(a, b)| a == b)
        };
        if matches(&CANONICAL_FEATURES) {
            Some(FeatureSchema::Canonical14)
        } else if matches(&LEGACY_FEATURES) {
            Some(FeatureSchema::Legacy5)
        } else {
            None
        }
    }

    /// Name of the feature `hr_baseline` subtraction applies to.
    pub fn hr_feature(&self) -> &'static str {
        match self {
            FeatureSchema::Legacy5 => "hr_mean",
            FeatureSchema::Canonical14 => "HR",
        }
    }
}

/// Named numeric vector with a stable insertion order, so the classifier
/// sees its declared input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    order: Vec<String>,
    values: HashMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        if !self.values.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn set(&mut self, name: &str, value: f64) {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.order
            .iter()
            .map(move |name| (name.as_str(), self.values[name]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        self.values.clone()
    }
}

/// Single left-to-right artifact-rejection scan.
///
/// Drops RR values outside the plausible range, and values jumping more
/// than `RR_MAX_DELTA_MS` from the previously *retained* value; a rejected
/// value does not update the reference.
pub fn clean_rr(rr: &[f64]) -> Vec<f64> {
    let mut cleaned: Vec<f64> = Vec::with_capacity(rr.len());
    for &value in rr {
        if !(RR_MIN_MS..=RR_MAX_MS).contains(&value) {
            continue;
        }
        if let Some(&previous) = cleaned.last() {
            if (value - previous).abs() > RR_MAX_DELTA_MS {
                continue;
            }
        }
        cleaned.push(value);
    }
    cleaned
}

/// Caller-level RR-count check. The one place `TooFewRR` is raised; the
/// engine itself resolves the same condition to an empty cycle instead.
pub fn require_rr_count(rr: &[f64], need: usize) -> Result<(), EmotionError> {
    if rr.len() < need {
        return Err(EmotionError::TooFewRR {
            got: rr.len(),
            need,
        });
    }
    Ok(())
}

/// Extracts the configured schema from a window snapshot. Motion channel
/// sums are merged verbatim after the schema features, in sorted channel
/// order so the vector layout stays deterministic.
pub fn extract_features(
    schema: FeatureSchema,
    snapshot: &WindowSnapshot,
) -> Result<FeatureVector, EmotionError> {
    let cleaned = clean_rr(&snapshot.rr_intervals_ms);

    let mean_rr_ms = mean_rr(&cleaned);
    let sdnn_ms = sdnn(&cleaned);
    let rmssd_ms = rmssd(&cleaned);
    let pnn50_pct = pnn50(&cleaned);
    let hr = effective_hr(&snapshot.hr_series, mean_rr_ms);

    let mut features = FeatureVector::new();
    match schema {
        FeatureSchema::Legacy5 => {
            features.insert("hr_mean", hr);
            features.insert("sdnn", sdnn_ms);
            features.insert("rmssd", rmssd_ms);
            features.insert("pnn50", pnn50_pct);
            features.insert("mean_rr", mean_rr_ms);
        }
        FeatureSchema::Canonical14 => {
            let powers = spectral_powers(&snapshot.rr_intervals_ms);
            let sampen = sample_entropy(&cleaned, SAMPEN_M, SAMPEN_R_FACTOR * sdnn_ms);

            features.insert("RMSSD", rmssd_ms);
            features.insert("Mean_RR", mean_rr_ms);
            features.insert("HRV_SDNN", sdnn_ms);
            features.insert("pNN50", pnn50_pct);
            features.insert("HRV_HF", powers.hf);
            features.insert("HRV_LF", powers.lf);
            features.insert("HRV_HF_nu", powers.hf_nu);
            features.insert("HRV_LF_nu", powers.lf_nu);
            features.insert("HRV_LFHF", powers.lf_hf_ratio);
            features.insert("HRV_TP", powers.total_power);
            features.insert("HRV_SD1SD2", sd1_sd2_ratio(&cleaned, sdnn_ms));
            features.insert("HRV_Sampen", sampen);
            features.insert("HRV_DFA_alpha1", dfa_alpha1(&cleaned));
            features.insert("HR", hr);
        }
    }

    let mut channels: Vec<&String> = snapshot.motion_sums.keys().collect();
    channels.sort();
    for channel in channels {
        features.insert(channel.clone(), snapshot.motion_sums[channel]);
    }

    if let Some((name, value)) = features.iter().find(|(_, v)| !v.is_finite()) {
        return Err(EmotionError::extraction(format!(
            "feature '{name}' is not finite ({value})"
        )));
    }
    Ok(features)
}

fn effective_hr(hr_series: &[f64], mean_rr_ms: f64) -> f64 {
    if !hr_series.is_empty() {
        hr_mean(hr_series)
    } else if mean_rr_ms > 0.0 {
        60_000.0 / mean_rr_ms
    } else {
        0.0
    }
}

/// Z-scores every feature matched in both maps; unmatched features pass
/// through unchanged. A zero sigma maps to 0 instead of dividing.
pub fn normalize_features(
    features: &FeatureVector,
    mu: &HashMap<String, f64>,
    sigma: &HashMap<String, f64>,
) -> FeatureVector {
    let mut normalized = FeatureVector::new();
    for (name, value) in features.iter() {
        let scaled = match (mu.get(name), sigma.get(name)) {
            (Some(m), Some(s)) => {
                if *s == 0.0 {
                    0.0
                } else {
                    (value - m) / s
                }
            }
            _ => value,
        };
        normalized.insert(name, scaled);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(rr: Vec<f64>, hr: Vec<f64>) -> WindowSnapshot {
        WindowSnapshot {
            rr_intervals_ms: rr,
            hr_series: hr,
            motion_sums: HashMap::new(),
        }
    }

    #[test]
    fn cleaning_drops_out_of_range_values() {
        let cleaned = clean_rr(&[250.0, 800.0, 2100.0, 820.0]);
        assert_eq!(cleaned, vec![800.0, 820.0]);
    }

    #[test]
    fn cleaning_rejects_jumps_without_moving_reference() {
        // 1100 jumps 300 from 800 and is dropped; 840 is then compared
        // against 800, not 1100.
        let cleaned = clean_rr(&[800.0, 1100.0, 840.0]);
        assert_eq!(cleaned, vec![800.0, 840.0]);
    }

    #[test]
    fn schema_matching_is_exact() {
        let canonical: Vec<String> = CANONICAL_FEATURES.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            FeatureSchema::from_declared(&canonical),
            Some(FeatureSchema::Canonical14)
        );

        let legacy: Vec<String> = LEGACY_FEATURES.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            FeatureSchema::from_declared(&legacy),
            Some(FeatureSchema::Legacy5)
        );

        let mut reordered = canonical.clone();
        reordered.swap(0, 1);
        assert_eq!(FeatureSchema::from_declared(&reordered), None);
        assert_eq!(FeatureSchema::from_declared(&canonical[..13].to_vec()), None);
    }

    #[test]
    fn canonical_extraction_emits_all_fourteen_in_order() {
        let rr: Vec<f64> = (0..120)
            .map(|i| 800.0 + 30.0 * ((i as f64) * 0.7).sin())
            .collect();
        let features =
            extract_features(FeatureSchema::Canonical14, &snapshot(rr, vec![70.0, 72.0])).unwrap();

        let names: Vec<&str> = features.names().collect();
        assert_eq!(names, CANONICAL_FEATURES.to_vec());
        assert!((features.get("HR").unwrap() - 71.0).abs() < 1e-12);
        assert!(features.get("RMSSD").unwrap() > 0.0);
    }

    #[test]
    fn legacy_extraction_emits_five() {
        let rr = vec![800.0, 820.0, 810.0, 830.0];
        let features = extract_features(FeatureSchema::Legacy5, &snapshot(rr, vec![])).unwrap();
        let names: Vec<&str> = features.names().collect();
        assert_eq!(names, LEGACY_FEATURES.to_vec());
        // No HR series: falls back to 60000 / Mean_RR
        let mean = features.get("mean_rr").unwrap();
        assert!((features.get("hr_mean").unwrap() - 60_000.0 / mean).abs() < 1e-9);
    }

    #[test]
    fn motion_sums_merge_after_schema_features() {
        let mut snap = snapshot(vec![800.0, 820.0, 810.0], vec![70.0]);
        snap.motion_sums.insert("motion_y".into(), 2.0);
        snap.motion_sums.insert("motion_x".into(), 1.0);

        let features = extract_features(FeatureSchema::Legacy5, &snap).unwrap();
        let names: Vec<&str> = features.names().collect();
        assert_eq!(&names[5..], &["motion_x", "motion_y"]);
    }

    #[test]
    fn all_zero_features_from_unusable_series() {
        // Everything outside the plausible range cleans to an empty series.
        let features =
            extract_features(FeatureSchema::Canonical14, &snapshot(vec![100.0; 12], vec![]))
                .unwrap();
        for name in CANONICAL_FEATURES {
            assert_eq!(features.get(name), Some(0.0), "{name} should be 0");
        }
    }

    #[test]
    fn normalization_z_scores_matched_features() {
        let mut features = FeatureVector::new();
        features.insert("hr_mean", 80.0);
        features.insert("sdnn", 50.0);

        let mu = HashMap::from([("hr_mean".to_string(), 70.0), ("sdnn".to_string(), 40.0)]);
        let sigma = HashMap::from([("hr_mean".to_string(), 10.0), ("sdnn".to_string(), 5.0)]);

        let normalized = normalize_features(&features, &mu, &sigma);
        assert!((normalized.get("hr_mean").unwrap() - 1.0).abs() < 1e-12);
        assert!((normalized.get("sdnn").unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn normalization_zero_sigma_yields_zero() {
        let mut features = FeatureVector::new();
        features.insert("sdnn", 50.0);
        let mu = HashMap::from([("sdnn".to_string(), 40.0)]);
        let sigma = HashMap::from([("sdnn".to_string(), 0.0)]);

        let normalized = normalize_features(&features, &mu, &sigma);
        assert_eq!(normalized.get("sdnn"), Some(0.0));
    }

    #[test]
    fn normalization_passes_unmatched_through() {
        let mut features = FeatureVector::new();
        features.insert("rmssd", 33.0);
        let normalized = normalize_features(&features, &HashMap::new(), &HashMap::new());
        assert_eq!(normalized.get("rmssd"), Some(33.0));
    }

    #[test]
    fn require_rr_count_raises_too_few() {
        let err = require_rr_count(&[800.0], 30).unwrap_err();
        assert!(matches!(err, EmotionError::TooFewRR { got: 1, need: 30 }));
        assert!(require_rr_count(&[800.0; 30], 30).is_ok());
    }
}
