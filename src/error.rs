use thiserror::Error;

/// Failure taxonomy for the inference engine.
///
/// Only `ModelIncompatible` is fatal to a `consume` cycle; every transient
/// condition (invalid sample, not enough data, throttled, incomplete window)
/// resolves to an empty cycle result and at most a log line.
#[derive(Error, Debug)]
pub enum EmotionError {
    /// Raised by the caller-level RR validation utility, never during
    /// normal ingestion.
    #[error("too few RR intervals: got {got}, need {need}")]
    TooFewRR { got: usize, need: usize },

    /// Malformed sample or classifier input. Dropped with a log entry on
    /// the ingestion path; surfaced only when a caller invokes validation
    /// directly.
    #[error("bad input: {message}")]
    BadInput { message: String },

    /// The classifier declares a feature schema the extractor cannot
    /// produce. Programmer-level, always propagated.
    #[error("model '{model_id}' incompatible: {message}")]
    ModelIncompatible { model_id: String, message: String },

    /// The numeric pipeline could not produce a usable vector. Also the
    /// kind classifiers report for runtime prediction failures; the engine
    /// swallows and logs these, uniformly in both consume paths.
    #[error("feature extraction failed: {message}")]
    FeatureExtractionFailed { message: String },
}

impl EmotionError {
    pub fn bad_input(message: impl Into<String>) -> Self {
        EmotionError::BadInput {
            message: message.into(),
        }
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        EmotionError::FeatureExtractionFailed {
            message: message.into(),
        }
    }

    /// True for conditions the engine absorbs into an empty cycle result.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EmotionError::ModelIncompatible { .. })
    }
}
