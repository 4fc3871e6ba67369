use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Engine parameters with tunable thresholds.
///
/// Immutable once the engine is built; hosts that want different values
/// construct a new engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Identifier of the model this engine feeds.
    pub model_id: String,

    /// Sliding window length in seconds.
    pub window_secs: i64,

    /// Minimum spacing between two emissions, in seconds.
    pub step_secs: i64,

    /// Minimum total RR-interval count across the window before inference.
    pub min_rr_count: usize,

    /// Keep the full probability distribution in results; when false only
    /// the top label is retained.
    pub return_all_probas: bool,

    /// Resting-HR baseline subtracted from the HR-bearing feature.
    pub hr_baseline: Option<f64>,

    /// Per-label prior weights applied before top-label selection.
    pub priors: Option<HashMap<String, f64>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            window_secs: 120,
            step_secs: 60,
            min_rr_count: 30,
            return_all_probas: true,
            hr_baseline: None,
            priors: None,
        }
    }
}

impl EngineConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Self::default()
        }
    }

    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs.max(1))
    }

    pub fn step(&self) -> Duration {
        Duration::seconds(self.step_secs.max(1))
    }
}
