use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, error};

use super::config::ModelConfig;
use super::error::ClassifierError;
use super::model::{ClassifierHandle, LogitScorer};
use super::select::{select_labels, sigmoid, LabelOutcome};
use super::TARGET_CLASSIFIER;

pub const DEFAULT_THRESHOLD: f32 = 0.5;

type Loader = Box<dyn Fn() -> Result<Arc<dyn LogitScorer>, ClassifierError> + Send + Sync>;

/// Multi-label article classifier with a load-once model handle.
///
/// The model is loaded on first use. Concurrent first callers block on the
/// same initialization; a failed load leaves the handle empty so the next
/// call tries again.
pub struct LabelClassifier {
    loader: Loader,
    handle: OnceCell<Arc<dyn LogitScorer>>,
    threshold: f32,
}

impl LabelClassifier {
    /// Classifier that loads a saved RoBERTa model from `config.model_dir`.
    pub fn new(config: ModelConfig) -> Self {
        Self::from_loader(move || {
            let handle = ClassifierHandle::load(&config)?;
            Ok(Arc::new(handle) as Arc<dyn LogitScorer>)
        })
    }

    pub fn from_loader<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn LogitScorer>, ClassifierError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            handle: OnceCell::new(),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Classifier around an already loaded scorer.
    pub fn from_scorer(scorer: Arc<dyn LogitScorer>) -> Self {
        let classifier = Self::from_loader({
            let scorer = Arc::clone(&scorer);
            move || Ok(Arc::clone(&scorer))
        });
        let _ = classifier.handle.set(scorer);
        classifier
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Default threshold used by the API layer.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.get().is_some()
    }

    /// Return the loaded scorer, loading it first if needed.
    pub fn ensure_loaded(&self) -> Result<Arc<dyn LogitScorer>, ClassifierError> {
        self.handle
            .get_or_try_init(|| (self.loader)())
            .map(Arc::clone)
    }

    /// Classify an article, keeping failures distinct from fallbacks.
    pub fn classify(&self, title: &str, description: &str, threshold: f32) -> LabelOutcome {
        let text = format!("{} {}", title, description);

        let probabilities = match self
            .ensure_loaded()
            .and_then(|scorer| scorer.logits(&text))
        {
            Ok(logits) => logits.into_iter().map(sigmoid).collect::<Vec<f32>>(),
            Err(e) => {
                error!(target: TARGET_CLASSIFIER, "Error in prediction: {}", e);
                return LabelOutcome::Failed(e);
            }
        };

        let outcome = select_labels(&probabilities, threshold);
        match &outcome {
            LabelOutcome::Failed(e) => {
                error!(target: TARGET_CLASSIFIER, "Error in prediction: {}", e);
            }
            other => {
                debug!(target: TARGET_CLASSIFIER, "Classified {:?} as {:?} ({})", title, other.labels(), other.kind());
            }
        }
        outcome
    }

    /// Predicted label names for an article. Empty only when classification
    /// failed.
    pub fn predict_labels(&self, title: &str, description: &str, threshold: f32) -> Vec<String> {
        self.classify(title, description, threshold).into_labels()
    }
}
