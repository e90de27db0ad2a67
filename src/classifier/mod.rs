//! Multi-label news classification with a fine-tuned RoBERTa model.
//!
//! Text is tokenized to a fixed 512-token window, scored by the
//! sequence-classification head, squashed with a sigmoid per label and
//! thresholded into zero or more categories from [`crate::labels`].

pub const TARGET_CLASSIFIER: &str = "label_classifier";

pub mod config;
pub mod error;
pub mod model;
pub mod select;
pub mod service;

pub use config::{ModelConfig, DEFAULT_MODEL_PATH, MAX_SEQUENCE_LENGTH};
pub use error::ClassifierError;
pub use model::{ClassifierHandle, LogitScorer};
pub use select::{select_labels, sigmoid, LabelOutcome};
pub use service::{LabelClassifier, DEFAULT_THRESHOLD};
