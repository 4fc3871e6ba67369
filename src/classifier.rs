//! Classifier capability interface.
//!
//! The trained model is an external collaborator; the engine only sees one
//! of two explicit capability variants (blocking or suspending) plus the
//! metadata the model declares about itself. Variant selection happens via
//! the declared capability, never via runtime type inspection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EmotionError;
use crate::features::FeatureVector;

/// What a classifier declares about itself: identity, input schema, and
/// class labels, plus free-form extras that travel into results verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub model_id: String,
    /// Ordered input feature names; must match an extractor schema exactly.
    pub input_features: Vec<String>,
    /// Ordered class labels.
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ModelMetadata {
    pub fn new(
        model_id: impl Into<String>,
        input_features: Vec<String>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            input_features,
            labels,
            extra: HashMap::new(),
        }
    }

    /// Flattens the metadata into the map embedded in every result.
    pub fn to_map(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("model_id".to_string(), self.model_id.clone().into());
        map.insert(
            "input_features".to_string(),
            serde_json::Value::from(self.input_features.clone()),
        );
        map.insert(
            "labels".to_string(),
            serde_json::Value::from(self.labels.clone()),
        );
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

/// A classifier that completes synchronously.
pub trait Classifier: Send + Sync {
    fn metadata(&self) -> ModelMetadata;

    /// Probabilities need not sum to 1; the result builder may renormalize.
    fn predict(&self, features: &FeatureVector) -> Result<HashMap<String, f64>, EmotionError>;
}

/// A classifier that needs to suspend (e.g. dispatches to an accelerator
/// runtime). Identical input/output contract to [`Classifier`].
#[async_trait]
pub trait AsyncClassifier: Send + Sync {
    fn metadata(&self) -> ModelMetadata;

    async fn predict(&self, features: &FeatureVector)
        -> Result<HashMap<String, f64>, EmotionError>;
}

/// The engine's handle on whichever capability variant is attached.
#[derive(Clone)]
pub enum ClassifierHandle {
    Blocking(Arc<dyn Classifier>),
    Suspending(Arc<dyn AsyncClassifier>),
}

impl ClassifierHandle {
    pub fn metadata(&self) -> ModelMetadata {
        match self {
            ClassifierHandle::Blocking(classifier) => classifier.metadata(),
            ClassifierHandle::Suspending(classifier) => classifier.metadata(),
        }
    }

    pub fn requires_suspension(&self) -> bool {
        matches!(self, ClassifierHandle::Suspending(_))
    }
}

impl std::fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            ClassifierHandle::Blocking(_) => "Blocking",
            ClassifierHandle::Suspending(_) => "Suspending",
        };
        write!(f, "ClassifierHandle::{variant}({})", self.metadata().model_id)
    }
}
