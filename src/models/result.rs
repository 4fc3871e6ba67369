//! Inference outcome model.
//!
//! An `EmotionResult` is created once per successful consume cycle and
//! handed to the caller with no further mutation. The serde shape is the
//! persistence contract: `{ timestamp, emotion, confidence, probabilities,
//! features, model }`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One emission of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionResult {
    pub timestamp: DateTime<Utc>,
    /// Label with the highest (prior-weighted) probability.
    pub emotion: String,
    /// Probability of `emotion`, clamped to [0,1].
    pub confidence: f64,
    /// Label distribution; need not sum to 1.
    pub probabilities: HashMap<String, f64>,
    /// The feature vector the classifier saw.
    pub features: HashMap<String, f64>,
    /// Model metadata as declared by the classifier.
    pub model: HashMap<String, serde_json::Value>,
}

/// Turns a raw label→probability map into an immutable result record.
///
/// Applies the configured label priors (weight-then-renormalize) before
/// picking the top label, then honors the `return_all_probas` switch.
#[derive(Debug, Clone)]
pub struct ResultBuilder {
    priors: Option<HashMap<String, f64>>,
    return_all_probas: bool,
}

impl ResultBuilder {
    pub fn new(priors: Option<HashMap<String, f64>>, return_all_probas: bool) -> Self {
        Self {
            priors,
            return_all_probas,
        }
    }

    /// Builds the result, or `None` when the classifier returned an empty
    /// or all-zero distribution.
    pub fn build(
        &self,
        timestamp: DateTime<Utc>,
        raw_probabilities: HashMap<String, f64>,
        features: HashMap<String, f64>,
        model: HashMap<String, serde_json::Value>,
    ) -> Option<EmotionResult> {
        if raw_probabilities.is_empty() {
            return None;
        }

        let weighted = self.apply_priors(raw_probabilities);

        let (top_label, top_probability) = weighted
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(label, p)| (label.clone(), *p))?;

        let probabilities = if self.return_all_probas {
            weighted
        } else {
            HashMap::from([(top_label.clone(), top_probability)])
        };

        Some(EmotionResult {
            timestamp,
            emotion: top_label,
            confidence: top_probability.clamp(0.0, 1.0),
            probabilities,
            features,
            model,
        })
    }

    fn apply_priors(&self, probabilities: HashMap<String, f64>) -> HashMap<String, f64> {
        let Some(priors) = &self.priors else {
            return probabilities;
        };

        let weighted: HashMap<String, f64> = probabilities
            .into_iter()
            .map(|(label, p)| {
                let prior = priors.get(&label).copied().unwrap_or(1.0);
                (label, p * prior)
            })
            .collect();

        let total: f64 = weighted.values().sum();
        if total > 0.0 {
            weighted
                .into_iter()
                .map(|(label, p)| (label, p / total))
                .collect()
        } else {
            weighted
        }
    }
}
