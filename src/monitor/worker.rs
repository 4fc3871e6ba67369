//! Background polling loop driving an engine.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::engine::EmotionEngine;
use crate::models::{EmotionResult, Sample};

/// Runs until cancelled: ingests samples from the channel, polls
/// `consume_async` on every tick, forwards emissions.
///
/// The engine lives behind a mutex so ingestion and consumption are
/// serialized; the engine itself has no internal locking. A slow
/// classifier simply delays the next tick; in-flight calls are never
/// cancelled and failed cycles are never retried.
pub(crate) async fn monitor_loop(
    run_id: String,
    engine: Arc<Mutex<EmotionEngine>>,
    mut sample_rx: mpsc::Receiver<Sample>,
    result_tx: mpsc::Sender<EmotionResult>,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let cycle = {
                    let mut engine = engine.lock().await;
                    engine.consume_async().await
                };

                match cycle {
                    Ok(results) => {
                        for result in results {
                            debug!("monitor {run_id}: emitting '{}' ({:.3})", result.emotion, result.confidence);
                            if result_tx.send(result).await.is_err() {
                                info!("monitor {run_id}: result receiver dropped, shutting down");
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        // Only fatal incompatibilities propagate out of consume.
                        error!("monitor {run_id}: fatal engine error, shutting down: {err}");
                        return;
                    }
                }
            }
            sample = sample_rx.recv() => {
                match sample {
                    Some(sample) => {
                        let mut engine = engine.lock().await;
                        if !engine.push(sample) {
                            warn!("monitor {run_id}: sample rejected");
                        }
                    }
                    None => {
                        info!("monitor {run_id}: sample channel closed, shutting down");
                        return;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!("monitor {run_id}: shutting down");
                return;
            }
        }
    }
}
