//! Lifecycle management for the background monitor.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::engine::EmotionEngine;
use crate::models::{EmotionResult, Sample};

use super::worker::monitor_loop;

const SAMPLE_CHANNEL_CAPACITY: usize = 64;
const RESULT_CHANNEL_CAPACITY: usize = 16;

/// Channel endpoints handed to the host when a monitor run starts.
pub struct MonitorRun {
    /// Feed ingested samples here; `push` semantics apply (invalid samples
    /// are dropped with a log line).
    pub samples: mpsc::Sender<Sample>,
    /// Emissions arrive here, one per successful consume cycle.
    pub results: mpsc::Receiver<EmotionResult>,
}

/// Owns the polling task wrapped around an engine.
///
/// The engine is shared behind `Arc<tokio::sync::Mutex<_>>`; that mutex is
/// the required host-side serialization of `push`/`consume`, since the
/// engine itself is single-owner and lock-free.
pub struct MonitorController {
    engine: Arc<Mutex<EmotionEngine>>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl MonitorController {
    pub fn new(engine: EmotionEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            handle: None,
            cancel_token: None,
        }
    }

    /// Shared handle to the engine, for stats/status queries while the
    /// monitor runs.
    pub fn engine(&self) -> Arc<Mutex<EmotionEngine>> {
        Arc::clone(&self.engine)
    }

    /// Spawns the polling loop. `poll_interval` is how often the loop calls
    /// `consume_async`; the engine's own step throttle governs emission
    /// spacing, so polling faster than the step only costs empty cycles.
    pub fn start(&mut self, poll_interval: Duration) -> Result<MonitorRun> {
        if self.handle.is_some() {
            bail!("monitor already active");
        }

        let run_id = Uuid::new_v4().to_string();
        info!("starting monitor run {run_id}");

        let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        let (result_tx, result_rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(monitor_loop(
            run_id,
            Arc::clone(&self.engine),
            sample_rx,
            result_tx,
            poll_interval,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(MonitorRun {
            samples: sample_tx,
            results: result_rx,
        })
    }

    /// Cancels the loop and waits for it to finish. Idempotent.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("monitor loop task failed to join")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, ClassifierHandle, ModelMetadata};
    use crate::config::EngineConfig;
    use crate::error::EmotionError;
    use crate::features::{FeatureVector, LEGACY_FEATURES};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::collections::HashMap;

    struct StubClassifier;

    impl Classifier for StubClassifier {
        fn metadata(&self) -> ModelMetadata {
            ModelMetadata::new(
                "monitor-stub",
                LEGACY_FEATURES.iter().map(|s| s.to_string()).collect(),
                vec!["calm".into(), "stress".into()],
            )
        }

        fn predict(
            &self,
            _features: &FeatureVector,
        ) -> Result<HashMap<String, f64>, EmotionError> {
            Ok(HashMap::from([("calm".to_string(), 0.8)]))
        }
    }

    fn ready_engine() -> EmotionEngine {
        let mut engine = EmotionEngine::new(EngineConfig::default());
        engine
            .attach_classifier(ClassifierHandle::Blocking(Arc::new(StubClassifier)))
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn monitor_emits_once_window_fills() {
        let mut controller = MonitorController::new(ready_engine());
        let mut run = controller.start(Duration::from_millis(10)).unwrap();

        // A window's worth of history ending now, so the first poll finds
        // a complete window.
        let now = Utc::now();
        for i in 0..26 {
            let timestamp = now - ChronoDuration::seconds(125 - i * 5);
            let sample =
                crate::models::Sample::new(timestamp, 72.0, vec![830.0, 850.0, 840.0]);
            run.samples.send(sample).await.unwrap();
        }

        let result = tokio::time::timeout(Duration::from_secs(2), run.results.recv())
            .await
            .expect("monitor did not emit in time")
            .expect("result channel closed");
        assert_eq!(result.emotion, "calm");

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_twice_is_an_error() {
        let mut controller = MonitorController::new(ready_engine());
        let _run = controller.start(Duration::from_millis(50)).unwrap();
        assert!(controller.start(Duration::from_millis(50)).is_err());
        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_is_ok() {
        let mut controller = MonitorController::new(ready_engine());
        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_samples_do_not_kill_the_loop() {
        let mut controller = MonitorController::new(ready_engine());
        let run = controller.start(Duration::from_millis(10)).unwrap();

        let bad = crate::models::Sample::new(Utc::now(), 350.0, vec![800.0]);
        run.samples.send(bad).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let stats = controller.engine().lock().await.stats();
        assert_eq!(stats.count, 0);

        controller.stop().await.unwrap();
    }
}
