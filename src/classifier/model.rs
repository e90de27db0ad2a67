use candle_core::{DType, Device, Tensor};
use candle_transformers::models::xlm_roberta::XLMRobertaForSequenceClassification;
use tokenizers::Tokenizer;
use tokio::time::Instant;
use tracing::{debug, info};

use super::config::{describe_device, select_device, ModelConfig};
use super::error::ClassifierError;
use super::TARGET_CLASSIFIER;

/// Produces one raw score per label for a piece of text.
pub trait LogitScorer: Send + Sync {
    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError>;
}

/// A loaded tokenizer and RoBERTa classification model on a compute device.
pub struct ClassifierHandle {
    tokenizer: Tokenizer,
    model: XLMRobertaForSequenceClassification,
    device: Device,
}

impl ClassifierHandle {
    /// Load tokenizer, config and weights from `config.model_dir`.
    pub fn load(config: &ModelConfig) -> Result<Self, ClassifierError> {
        let start = Instant::now();
        info!(target: TARGET_CLASSIFIER, "Loading model from {}...", config.model_dir.display());

        let device = select_device();
        let model_config = config.read_model_config()?;
        let tokenizer = config.load_tokenizer(model_config.pad_token_id)?;
        let model = config.load_model(&model_config, &device)?;

        info!(target: TARGET_CLASSIFIER,
            "Model loaded successfully on {} in {:?}",
            describe_device(&device),
            start.elapsed()
        );

        Ok(Self {
            tokenizer,
            model,
            device,
        })
    }
}

impl LogitScorer for ClassifierHandle {
    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        let start = Instant::now();
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClassifierError::Tokenization(e.to_string()))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let logits = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids)?
            .squeeze(0)?
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()?;

        debug!(target: TARGET_CLASSIFIER,
            "Scored {} tokens in {:?}",
            input_ids.dims()[1],
            start.elapsed()
        );
        Ok(logits)
    }
}
