//! Inference scheduler.
//!
//! Owns the sliding window buffer and the emission clock, and runs the
//! accumulate → extract → infer → emit cycle. Pull-style: hosts poll
//! `consume` (or `consume_async`) and receive either a singleton result or
//! nothing; only logging differentiates *why* a cycle produced nothing.
//!
//! Buffer and emission clock are engine-private mutable state with no
//! internal locking. Concurrent `push`/`consume` from multiple execution
//! contexts is unsafe unless the host serializes access (a single-threaded
//! loop, or an external mutex as the monitor does).

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::buffer::{BufferStats, SlidingWindowBuffer};
use crate::classifier::{ClassifierHandle, ModelMetadata};
use crate::config::EngineConfig;
use crate::error::EmotionError;
use crate::features::{extract_features, FeatureSchema, FeatureVector};
use crate::models::{validate_sample, EmotionResult, ResultBuilder, Sample};

/// Where the engine currently sits in its emission cycle. Derived from
/// buffer and clock state; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineStatus {
    Idle,
    Accumulating,
    Ready,
    Emitted,
}

/// The windowed HRV-to-emotion inference engine.
pub struct EmotionEngine {
    config: EngineConfig,
    buffer: SlidingWindowBuffer,
    classifier: Option<ClassifierHandle>,
    schema: Option<FeatureSchema>,
    last_emission: Option<DateTime<Utc>>,
}

impl EmotionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let buffer = SlidingWindowBuffer::new(config.window());
        Self {
            config,
            buffer,
            classifier: None,
            schema: None,
            last_emission: None,
        }
    }

    /// Attaches a classifier, selecting the extractor schema from its
    /// declared input names. A declaration matching neither known schema is
    /// `ModelIncompatible`, the one fatal error in this module.
    pub fn attach_classifier(&mut self, handle: ClassifierHandle) -> Result<(), EmotionError> {
        let metadata = handle.metadata();
        let schema = FeatureSchema::from_declared(&metadata.input_features).ok_or_else(|| {
            EmotionError::ModelIncompatible {
                model_id: metadata.model_id.clone(),
                message: format!(
                    "declared input features {:?} match neither the legacy-5 nor the canonical-14 schema",
                    metadata.input_features
                ),
            }
        })?;

        debug!(
            "attached classifier '{}' using {:?} schema",
            metadata.model_id, schema
        );
        self.classifier = Some(handle);
        self.schema = Some(schema);
        Ok(())
    }

    pub fn classifier_metadata(&self) -> Option<ModelMetadata> {
        self.classifier.as_ref().map(ClassifierHandle::metadata)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validates and ingests one sample, then trims the expired prefix
    /// using the sample's own timestamp as the clock. Never suspends and
    /// never blocks on inference. Returns whether the sample was accepted;
    /// rejection is logged, not raised.
    pub fn push(&mut self, sample: Sample) -> bool {
        let now = sample.timestamp;
        self.push_at(sample, now)
    }

    /// `push` against an explicit clock.
    pub fn push_at(&mut self, sample: Sample, now: DateTime<Utc>) -> bool {
        if !validate_sample(sample.hr, &sample.rr_intervals_ms) {
            return false;
        }
        self.buffer.push(sample);
        self.buffer.trim(now);
        true
    }

    /// Non-suspending consume cycle against the wall clock.
    pub fn consume(&mut self) -> Result<Vec<EmotionResult>, EmotionError> {
        self.consume_at(Utc::now())
    }

    /// Non-suspending consume cycle. Returns an empty list (never raises)
    /// when the attached classifier requires suspension.
    pub fn consume_at(&mut self, now: DateTime<Utc>) -> Result<Vec<EmotionResult>, EmotionError> {
        let Some(classifier) = self.classifier.clone() else {
            return Ok(Vec::new());
        };
        let ClassifierHandle::Blocking(classifier) = classifier else {
            warn!("consume called with a suspending classifier attached; use consume_async");
            return Ok(Vec::new());
        };

        let Some(features) = self.prepare_cycle(now) else {
            return Ok(Vec::new());
        };

        match classifier.predict(&features) {
            Ok(probabilities) => Ok(self.emit(now, probabilities, features)),
            Err(err) => self.absorb_prediction_error(err).map(|()| Vec::new()),
        }
    }

    /// Suspending consume cycle against the wall clock.
    pub async fn consume_async(&mut self) -> Result<Vec<EmotionResult>, EmotionError> {
        self.consume_async_at(Utc::now()).await
    }

    /// Suspending consume cycle; identical throttling and window semantics
    /// to `consume_at`, usable with either capability variant.
    pub async fn consume_async_at(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<EmotionResult>, EmotionError> {
        let Some(classifier) = self.classifier.clone() else {
            return Ok(Vec::new());
        };

        let Some(features) = self.prepare_cycle(now) else {
            return Ok(Vec::new());
        };

        let prediction = match &classifier {
            ClassifierHandle::Blocking(c) => c.predict(&features),
            ClassifierHandle::Suspending(c) => c.predict(&features).await,
        };

        match prediction {
            Ok(probabilities) => Ok(self.emit(now, probabilities, features)),
            Err(err) => self.absorb_prediction_error(err).map(|()| Vec::new()),
        }
    }

    /// Steps 2–6 of the cycle: throttle, sample count, window completeness,
    /// RR count, extraction, baseline subtraction. `None` means "no result
    /// this cycle" with the reason logged.
    fn prepare_cycle(&mut self, now: DateTime<Utc>) -> Option<FeatureVector> {
        if let Some(last) = self.last_emission {
            if now - last < self.config.step() {
                debug!("consume throttled: step not yet elapsed");
                return None;
            }
        }

        if self.buffer.len() < 2 {
            debug!("consume skipped: fewer than 2 buffered samples");
            return None;
        }

        if !self.buffer.is_window_complete(now) {
            debug!("consume skipped: window not yet complete");
            return None;
        }

        let rr_count = self.buffer.rr_count();
        if rr_count < self.config.min_rr_count {
            warn!(
                "consume skipped: {rr_count} RR intervals buffered, {} required",
                self.config.min_rr_count
            );
            return None;
        }

        let schema = self.schema?;
        let mut features = match extract_features(schema, &self.buffer.snapshot()) {
            Ok(features) => features,
            Err(err) => {
                warn!("feature extraction failed, skipping cycle: {err}");
                return None;
            }
        };

        if let Some(baseline) = self.config.hr_baseline {
            let name = schema.hr_feature();
            if let Some(hr) = features.get(name) {
                features.set(name, hr - baseline);
            }
        }

        Some(features)
    }

    /// Step 8: build the result and reset the emission clock.
    fn emit(
        &mut self,
        now: DateTime<Utc>,
        probabilities: std::collections::HashMap<String, f64>,
        features: FeatureVector,
    ) -> Vec<EmotionResult> {
        let builder = ResultBuilder::new(
            self.config.priors.clone(),
            self.config.return_all_probas,
        );
        let model = self
            .classifier_metadata()
            .map(|m| m.to_map())
            .unwrap_or_default();

        match builder.build(now, probabilities, features.to_map(), model) {
            Some(result) => {
                self.last_emission = Some(now);
                vec![result]
            }
            None => {
                warn!("classifier returned an empty distribution, skipping cycle");
                Vec::new()
            }
        }
    }

    /// Uniform failure policy for classifier calls: recoverable errors are
    /// swallowed and logged; only `ModelIncompatible` propagates.
    fn absorb_prediction_error(&self, err: EmotionError) -> Result<(), EmotionError> {
        if err.is_recoverable() {
            warn!("classifier call failed, skipping cycle: {err}");
            Ok(())
        } else {
            Err(err)
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> EngineStatus {
        if self.buffer.is_empty() {
            return EngineStatus::Idle;
        }
        if let Some(last) = self.last_emission {
            if now - last < self.config.step() {
                return EngineStatus::Emitted;
            }
        }
        if self.buffer.is_window_complete(now) {
            EngineStatus::Ready
        } else {
            EngineStatus::Accumulating
        }
    }

    pub fn stats(&self) -> BufferStats {
        self.buffer.stats()
    }

    /// Empties the buffer and resets the throttle clock, so a subsequent
    /// ready window can emit immediately.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.last_emission = None;
    }
}
