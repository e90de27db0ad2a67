use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the classifier or scoring an article.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model artifact not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model config: {0}")]
    InvalidConfig(String),

    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),

    #[error("tokenization failed: {0}")]
    Tokenization(String),

    #[error("failed to load model weights: {0}")]
    Weights(#[source] candle_core::Error),

    #[error("model error: {0}")]
    Model(#[from] candle_core::Error),

    #[error("classifier produced {got} scores, expected {expected}")]
    LabelCountMismatch { expected: usize, got: usize },
}

impl ClassifierError {
    /// True for failures that happened while loading artifacts rather than
    /// while scoring text.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::MissingArtifact(_)
                | Self::Io { .. }
                | Self::InvalidConfig(_)
                | Self::Tokenizer(_)
                | Self::Weights(_)
        )
    }
}
