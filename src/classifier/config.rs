use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{
    Config as RobertaConfig, XLMRobertaForSequenceClassification,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use super::error::ClassifierError;
use super::TARGET_CLASSIFIER;
use crate::labels::LABEL_COUNT;

pub const DEFAULT_MODEL_PATH: &str = "./Models/roberta/model_weights";

/// Fixed input length the model was fine-tuned with.
pub const MAX_SEQUENCE_LENGTH: usize = 512;

const PAD_TOKEN: &str = "<pad>";
const TOKENIZER_FILE: &str = "tokenizer.json";
const CONFIG_FILE: &str = "config.json";
const SAFETENSORS_FILE: &str = "model.safetensors";
const PYTORCH_FILE: &str = "pytorch_model.bin";

/// Locations of the artifacts of a saved sequence-classification model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
    pub max_length: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH)
    }
}

/// The parts of `config.json` describing the classification head.
#[derive(Debug, Deserialize)]
struct HeadConfig {
    #[serde(default)]
    id2label: Option<HashMap<String, String>>,
    #[serde(default)]
    num_labels: Option<usize>,
}

impl ModelConfig {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            max_length: MAX_SEQUENCE_LENGTH,
        }
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir.join(TOKENIZER_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.model_dir.join(CONFIG_FILE)
    }

    /// Weight file to load, preferring safetensors over a pickled checkpoint.
    pub fn weights_path(&self) -> Result<PathBuf, ClassifierError> {
        let safetensors = self.model_dir.join(SAFETENSORS_FILE);
        if safetensors.exists() {
            return Ok(safetensors);
        }
        let pytorch = self.model_dir.join(PYTORCH_FILE);
        if pytorch.exists() {
            return Ok(pytorch);
        }
        Err(ClassifierError::MissingArtifact(safetensors))
    }

    /// Read and validate `config.json`.
    pub fn read_model_config(&self) -> Result<RobertaConfig, ClassifierError> {
        let raw = read_artifact(&self.config_path())?;
        let config: RobertaConfig = serde_json::from_str(&raw)
            .map_err(|e| ClassifierError::InvalidConfig(e.to_string()))?;
        let head: HeadConfig = serde_json::from_str(&raw)
            .map_err(|e| ClassifierError::InvalidConfig(e.to_string()))?;

        let num_labels = head
            .id2label
            .map(|labels| labels.len())
            .or(head.num_labels)
            .unwrap_or(LABEL_COUNT);
        if num_labels != LABEL_COUNT {
            return Err(ClassifierError::InvalidConfig(format!(
                "classification head has {} labels, expected {}",
                num_labels, LABEL_COUNT
            )));
        }
        if config.max_position_embeddings < self.max_length {
            return Err(ClassifierError::InvalidConfig(format!(
                "max_position_embeddings {} is shorter than input length {}",
                config.max_position_embeddings, self.max_length
            )));
        }

        Ok(config)
    }

    /// Load the tokenizer configured to truncate and pad every input to
    /// exactly `max_length` tokens.
    pub fn load_tokenizer(&self, pad_token_id: u32) -> Result<Tokenizer, ClassifierError> {
        let path = self.tokenizer_path();
        if !path.exists() {
            return Err(ClassifierError::MissingArtifact(path));
        }
        let mut tokenizer =
            Tokenizer::from_file(&path).map_err(|e| ClassifierError::Tokenizer(e.to_string()))?;

        let pad_id = tokenizer.token_to_id(PAD_TOKEN).unwrap_or(pad_token_id);
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(self.max_length),
            pad_id,
            pad_token: PAD_TOKEN.to_string(),
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: self.max_length,
                ..Default::default()
            }))
            .map_err(|e| ClassifierError::Tokenizer(e.to_string()))?;

        debug!(target: TARGET_CLASSIFIER, "Loaded tokenizer from {} (pad id {})", path.display(), pad_id);
        Ok(tokenizer)
    }

    /// Build the classification network on `device` from the saved weights.
    pub fn load_model(
        &self,
        config: &RobertaConfig,
        device: &Device,
    ) -> Result<XLMRobertaForSequenceClassification, ClassifierError> {
        let weights = self.weights_path()?;
        info!(target: TARGET_CLASSIFIER, "Loading classifier weights from {}", weights.display());

        let vb = if weights.extension().and_then(|e| e.to_str()) == Some("safetensors") {
            let bytes = std::fs::read(&weights).map_err(|source| ClassifierError::Io {
                path: weights.clone(),
                source,
            })?;
            let tensors = candle_core::safetensors::load_buffer(&bytes, device)
                .map_err(ClassifierError::Weights)?;
            VarBuilder::from_tensors(tensors, DType::F32, device)
        } else {
            VarBuilder::from_pth(&weights, DType::F32, device).map_err(ClassifierError::Weights)?
        };

        XLMRobertaForSequenceClassification::new(LABEL_COUNT, config, vb)
            .map_err(ClassifierError::Weights)
    }
}

/// GPU 0 when candle was built with CUDA and a device is present, else CPU.
pub fn select_device() -> Device {
    match Device::cuda_if_available(0) {
        Ok(device) => device,
        Err(e) => {
            debug!(target: TARGET_CLASSIFIER, "CUDA unavailable ({}), using CPU", e);
            Device::Cpu
        }
    }
}

pub fn describe_device(device: &Device) -> &'static str {
    if device.is_cuda() {
        "cuda"
    } else if device.is_metal() {
        "metal"
    } else {
        "cpu"
    }
}

fn read_artifact(path: &Path) -> Result<String, ClassifierError> {
    if !path.exists() {
        return Err(ClassifierError::MissingArtifact(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
        path: path.to_path_buf(),
        source,
    })
}
