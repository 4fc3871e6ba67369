//! On-device emotion inference from heart-rate and RR-interval streams.
//!
//! Samples flow `push → validate → buffer → trim`; results flow
//! `consume → throttle/completeness checks → HRV feature extraction →
//! classifier → result`. The classifier itself is a pluggable collaborator
//! (see [`classifier`]); the windowing, artifact cleaning, canonical HRV
//! descriptors, and scheduling live here.
//!
//! The engine is pull-style and single-owner: poll [`EmotionEngine::consume`]
//! (or [`EmotionEngine::consume_async`]) from one execution context, or let
//! a [`MonitorController`] own the engine and do the polling. Logging goes
//! through the `log` facade; initialize a logger (e.g. `env_logger`) in the
//! host to see why cycles come back empty.

pub mod buffer;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod models;
pub mod monitor;

pub use buffer::{BufferStats, SlidingWindowBuffer, WindowSnapshot, WINDOW_TOLERANCE_SECS};
pub use classifier::{AsyncClassifier, Classifier, ClassifierHandle, ModelMetadata};
pub use config::EngineConfig;
pub use engine::{EmotionEngine, EngineStatus};
pub use error::EmotionError;
pub use features::{
    clean_rr, extract_features, normalize_features, require_rr_count, FeatureSchema,
    FeatureVector, CANONICAL_FEATURES, LEGACY_FEATURES,
};
pub use models::{validate_sample, EmotionResult, ResultBuilder, Sample};
pub use monitor::{MonitorController, MonitorRun};
