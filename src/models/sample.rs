//! Sample data model and ingestion validation.
//!
//! Represents a single heart-rate reading pushed into the engine, carrying
//! the RR intervals observed since the previous reading.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

/// Physiological HR bounds in BPM; anything outside is sensor garbage.
pub const HR_MIN_BPM: f64 = 30.0;
pub const HR_MAX_BPM: f64 = 300.0;

/// A single heart-rate reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// Instantaneous heart rate, beats per minute.
    pub hr: f64,
    /// RR intervals since the previous reading, milliseconds, in order.
    pub rr_intervals_ms: Vec<f64>,
    /// Optional per-sample motion channels (e.g. accelerometer magnitudes),
    /// summed across the window and merged into the feature map verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<HashMap<String, f64>>,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, hr: f64, rr_intervals_ms: Vec<f64>) -> Self {
        Self {
            timestamp,
            hr,
            rr_intervals_ms,
            motion: None,
        }
    }

    pub fn with_motion(mut self, motion: HashMap<String, f64>) -> Self {
        self.motion = Some(motion);
        self
    }

    pub fn rr_count(&self) -> usize {
        self.rr_intervals_ms.len()
    }
}

/// Gate for physiologically impossible input. Rejection is logged and
/// silent; the ingestion caller never sees an error. Per-RR outlier
/// filtering happens later, during feature extraction.
pub fn validate_sample(hr: f64, rr_intervals_ms: &[f64]) -> bool {
    if !(HR_MIN_BPM..=HR_MAX_BPM).contains(&hr) {
        warn!("rejecting sample: hr {hr} outside [{HR_MIN_BPM},{HR_MAX_BPM}] bpm");
        return false;
    }
    if rr_intervals_ms.is_empty() {
        warn!("rejecting sample: empty RR interval list");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_in_range_sample() {
        assert!(validate_sample(72.0, &[830.0, 845.0]));
        assert!(validate_sample(30.0, &[2000.0]));
        assert!(validate_sample(300.0, &[200.0]));
    }

    #[test]
    fn rejects_out_of_range_hr() {
        assert!(!validate_sample(350.0, &[800.0]));
        assert!(!validate_sample(29.9, &[800.0]));
        assert!(!validate_sample(f64::NAN, &[800.0]));
    }

    #[test]
    fn rejects_empty_rr_list() {
        assert!(!validate_sample(72.0, &[]));
    }

    #[test]
    fn sample_serde_round_trip() {
        let sample = Sample::new(Utc::now(), 71.0, vec![840.0, 850.0])
            .with_motion(HashMap::from([("motion_x".to_string(), 0.12)]));
        let json = serde_json::to_string(&sample).unwrap();
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hr, 71.0);
        assert_eq!(back.rr_intervals_ms, vec![840.0, 850.0]);
        assert_eq!(back.motion.unwrap()["motion_x"], 0.12);
    }
}
