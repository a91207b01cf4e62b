//! Candle + `tokenizers` implementation of the model boundaries.
//!
//! Provides [`CandleBackend`], which implements both [`PairEncoder`] and
//! [`PairClassifier`] for a sequence-pair classification checkpoint in
//! Hugging Face layout (`config.json`, `tokenizer.json`,
//! `model.safetensors`). BERT-family checkpoints use the encoder, pooler and
//! linear head; DeBERTa v2 checkpoints use Candle's built-in sequence
//! classification model.
//!
//! # Feature Gate
//!
//! This module is only available when the `ml` feature is enabled.

use std::borrow::Cow;
use std::path::Path;

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::debertav2::{
    Config as DebertaConfig, DebertaV2SeqClassificationModel,
};
use omograph_core::{
    EncodeOptions, EncodedBatch, ModelConfig, OmographError, PairClassifier, PairEncoder, Result,
    ScoreMatrix,
};
use tokenizers::{PaddingStrategy, Tokenizer, TruncationParams};

use crate::device::select_device;

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

// ---------------------------------------------------------------------------
// Model abstraction
// ---------------------------------------------------------------------------

/// Supported architectures for sequence-pair classification.
enum PairModel {
    /// BERT encoder with optional pooler and a linear classifier head.
    Bert {
        model: Box<BertModel>,
        pooler: Option<candle_nn::Linear>,
        classifier: candle_nn::Linear,
    },
    /// DeBERTa v2 with built-in sequence classification.
    DebertaV2(Box<DebertaV2SeqClassificationModel>),
}

impl PairModel {
    /// Run a forward pass and return raw logits of shape `[batch, num_labels]`.
    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> candle_core::Result<Tensor> {
        match self {
            Self::Bert {
                model,
                pooler,
                classifier,
            } => {
                let hidden = model.forward(input_ids, token_type_ids, Some(attention_mask))?;
                // [CLS] token is at position 0
                let cls = hidden.i((.., 0))?;
                let pooled = match pooler {
                    Some(dense) => candle_nn::Module::forward(dense, &cls)?.tanh()?,
                    None => cls,
                };
                candle_nn::Module::forward(classifier, &pooled)
            }
            Self::DebertaV2(model) => model.forward(
                input_ids,
                Some(token_type_ids.clone()),
                Some(attention_mask.clone()),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// CandleBackend
// ---------------------------------------------------------------------------

/// Local inference backend for the homograph entailment model.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use omograph_classifier::{CandleBackend, HomographClassifier};
/// use omograph_core::OmographConfig;
///
/// # async fn example() -> omograph_core::Result<()> {
/// let mut config = OmographConfig::default();
/// config.model.path = Some("/models/omograph".into());
///
/// let backend = Arc::new(CandleBackend::load(&config.model, config.classifier.max_length).await?);
/// let classifier = HomographClassifier::new(&config.classifier, backend.clone(), backend);
/// # Ok(())
/// # }
/// ```
pub struct CandleBackend {
    /// Truncating tokenizer that pads to the longest row.
    padded: Tokenizer,
    /// Truncating tokenizer without padding.
    unpadded: Tokenizer,
    model: PairModel,
    device: Device,
    max_length: usize,
}

impl CandleBackend {
    /// Load from `model.path` if set, otherwise download `model.model_id`.
    ///
    /// # Errors
    ///
    /// Returns [`OmographError::Config`] when neither source is configured and
    /// [`OmographError::Model`] when files cannot be fetched or parsed.
    pub async fn load(model: &ModelConfig, max_length: usize) -> Result<Self> {
        match &model.path {
            Some(dir) => {
                let dir = dir.clone();
                let device = select_device(model.device);
                run_blocking(move || Self::from_dir(&dir, max_length, device)).await
            }
            None => Self::from_hub(model, max_length).await,
        }
    }

    /// Load a checkpoint from a local directory.
    ///
    /// # Errors
    ///
    /// Returns [`OmographError::Model`] if any file is missing or invalid.
    pub fn from_dir(dir: &Path, max_length: usize, device: Device) -> Result<Self> {
        tracing::info!(path = %dir.display(), "Loading homograph model from directory");
        Self::from_files(
            &dir.join(CONFIG_FILE),
            &dir.join(TOKENIZER_FILE),
            &dir.join(WEIGHTS_FILE),
            max_length,
            device,
        )
    }

    /// Download (or reuse cached) checkpoint files from the Hugging Face Hub.
    ///
    /// # Errors
    ///
    /// Returns [`OmographError::Config`] without a `model_id` and
    /// [`OmographError::Model`] on download or parse failures.
    pub async fn from_hub(model: &ModelConfig, max_length: usize) -> Result<Self> {
        use hf_hub::api::tokio::ApiBuilder;
        use hf_hub::{Repo, RepoType};

        let model_id = model
            .model_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| OmographError::Config("model.model_id is not set".to_string()))?;

        let mut builder = ApiBuilder::new();
        if let Some(dir) = &model.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder
            .build()
            .map_err(|e| OmographError::Model(format!("Failed to create HF API client: {e}")))?;

        let repo = match &model.revision {
            Some(revision) => api.repo(Repo::with_revision(
                model_id.clone(),
                RepoType::Model,
                revision.clone(),
            )),
            None => api.model(model_id.clone()),
        };

        tracing::info!(model_id = %model_id, revision = ?model.revision, "Fetching homograph model");

        let config_path = repo
            .get(CONFIG_FILE)
            .await
            .map_err(|e| OmographError::Model(format!("Failed to download {CONFIG_FILE}: {e}")))?;
        let tokenizer_path = repo.get(TOKENIZER_FILE).await.map_err(|e| {
            OmographError::Model(format!("Failed to download {TOKENIZER_FILE}: {e}"))
        })?;
        let weights_path = repo.get(WEIGHTS_FILE).await.map_err(|e| {
            OmographError::Model(format!("Failed to download {WEIGHTS_FILE}: {e}"))
        })?;

        let device = select_device(model.device);
        run_blocking(move || {
            Self::from_files(
                &config_path,
                &tokenizer_path,
                &weights_path,
                max_length,
                device,
            )
        })
        .await
    }

    /// Build the backend from explicit file paths.
    fn from_files(
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
        max_length: usize,
        device: Device,
    ) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| OmographError::Model(format!("Failed to read {CONFIG_FILE}: {e}")))?;
        let config_json: serde_json::Value = serde_json::from_str(&config_str)
            .map_err(|e| OmographError::Model(format!("Failed to parse {CONFIG_FILE}: {e}")))?;

        let model_type = config_json
            .get("model_type")
            .and_then(|v| v.as_str())
            .unwrap_or("bert")
            .to_string();

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| OmographError::Model(format!("Failed to load tokenizer: {e}")))?;
        let (padded, unpadded) = configure_tokenizers(tokenizer, max_length)?;

        // SAFETY: memory-mapping safetensors is the standard candle pattern.
        // The file is read-only and remains valid for the lifetime of VarBuilder.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(|e| OmographError::Model(format!("Failed to load weights: {e}")))?
        };

        let model = match model_type.as_str() {
            "deberta-v2" => build_deberta(&config_json, vb)?,
            _ => build_bert(&config_json, vb)?,
        };

        tracing::info!(model_type = %model_type, max_length, "Homograph model loaded");

        Ok(Self {
            padded,
            unpadded,
            model,
            device,
            max_length,
        })
    }

    /// Device the model runs on.
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Tokenizer matching `options`, reconfigured only when they differ from
    /// the load-time settings.
    fn tokenizer_for(&self, options: &EncodeOptions) -> Result<Cow<'_, Tokenizer>> {
        let base = if options.padding {
            &self.padded
        } else {
            &self.unpadded
        };
        if options.truncation && options.max_length == self.max_length {
            return Ok(Cow::Borrowed(base));
        }

        let mut tokenizer = base.clone();
        let truncation = options.truncation.then(|| TruncationParams {
            max_length: options.max_length,
            ..TruncationParams::default()
        });
        tokenizer
            .with_truncation(truncation)
            .map_err(|e| OmographError::Tokenization(format!("Invalid truncation: {e}")))?;
        Ok(Cow::Owned(tokenizer))
    }
}

impl PairEncoder for CandleBackend {
    fn encode_pairs(
        &self,
        pairs: &[(&str, &str)],
        options: &EncodeOptions,
    ) -> Result<EncodedBatch> {
        let tokenizer = self.tokenizer_for(options)?;
        let encodings = tokenizer
            .encode_batch(pairs.to_vec(), true)
            .map_err(|e| OmographError::Tokenization(format!("Tokenization failed: {e}")))?;

        let mut batch = EncodedBatch::default();
        for encoding in &encodings {
            batch.input_ids.push(encoding.get_ids().to_vec());
            batch
                .attention_mask
                .push(encoding.get_attention_mask().to_vec());
            batch.token_type_ids.push(encoding.get_type_ids().to_vec());
        }
        Ok(batch)
    }
}

impl PairClassifier for CandleBackend {
    fn run(&self, batch: &EncodedBatch) -> Result<ScoreMatrix> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let input_ids = rows_to_tensor(&batch.input_ids, &self.device)?;
        let token_type_ids = rows_to_tensor(&batch.token_type_ids, &self.device)?;
        let attention_mask = rows_to_tensor(&batch.attention_mask, &self.device)?;

        let logits = self
            .model
            .forward(&input_ids, &token_type_ids, &attention_mask)
            .map_err(|e| OmographError::Inference(format!("Model inference failed: {e}")))?;

        logits
            .to_dtype(DType::F32)
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(|e| OmographError::Inference(format!("Logit extraction failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Derive the padded and unpadded tokenizers, both truncating at `max_length`.
fn configure_tokenizers(
    mut tokenizer: Tokenizer,
    max_length: usize,
) -> Result<(Tokenizer, Tokenizer)> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..TruncationParams::default()
        }))
        .map_err(|e| OmographError::Model(format!("Invalid truncation: {e}")))?;

    let mut unpadded = tokenizer.clone();
    unpadded.with_padding(None);

    let mut padding = tokenizer.get_padding().cloned().unwrap_or_default();
    padding.strategy = PaddingStrategy::BatchLongest;
    if let Some(id) = tokenizer.token_to_id(&padding.pad_token) {
        padding.pad_id = id;
    }
    let mut padded = tokenizer;
    padded.with_padding(Some(padding));

    Ok((padded, unpadded))
}

/// Run a file-bound loader on tokio's blocking pool.
async fn run_blocking<F>(load: F) -> Result<CandleBackend>
where
    F: FnOnce() -> Result<CandleBackend> + Send + 'static,
{
    tokio::task::spawn_blocking(load)
        .await
        .map_err(|e| OmographError::Model(format!("Model loading task failed: {e}")))?
}

/// Stack equally long rows into a `[rows, cols]` tensor.
fn rows_to_tensor(rows: &[Vec<u32>], device: &Device) -> Result<Tensor> {
    let cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != cols) {
        return Err(OmographError::Inference(
            "encoded rows differ in length; encode batches with padding".to_string(),
        ));
    }
    let flat: Vec<u32> = rows.iter().flatten().copied().collect();
    Tensor::from_vec(flat, (rows.len(), cols), device)
        .map_err(|e| OmographError::Inference(format!("Tensor creation failed: {e}")))
}

/// Build a DeBERTa v2 sequence classification model.
fn build_deberta(config_json: &serde_json::Value, vb: VarBuilder) -> Result<PairModel> {
    let config: DebertaConfig = serde_json::from_value(config_json.clone())
        .map_err(|e| OmographError::Model(format!("Invalid DeBERTa config: {e}")))?;

    let model = DebertaV2SeqClassificationModel::load(vb, &config, None)
        .map_err(|e| OmographError::Model(format!("Failed to load DeBERTa model: {e}")))?;

    Ok(PairModel::DebertaV2(Box::new(model)))
}

/// Build a BERT sequence classification model.
fn build_bert(config_json: &serde_json::Value, vb: VarBuilder) -> Result<PairModel> {
    let config: BertConfig = serde_json::from_value(config_json.clone())
        .map_err(|e| OmographError::Model(format!("Invalid BERT config: {e}")))?;

    let num_labels = num_labels(config_json);

    let model = BertModel::load(vb.pp("bert"), &config)
        .map_err(|e| OmographError::Model(format!("Failed to load BERT model: {e}")))?;

    let pooler = match candle_nn::linear(
        config.hidden_size,
        config.hidden_size,
        vb.pp("bert").pp("pooler").pp("dense"),
    ) {
        Ok(dense) => Some(dense),
        Err(e) => {
            tracing::debug!(error = %e, "No BERT pooler weights, classifying raw [CLS]");
            None
        }
    };

    let classifier = candle_nn::linear(config.hidden_size, num_labels, vb.pp("classifier"))
        .map_err(|e| OmographError::Model(format!("Failed to load classifier head: {e}")))?;

    Ok(PairModel::Bert {
        model: Box::new(model),
        pooler,
        classifier,
    })
}

/// Label count from `num_labels` or `id2label`, defaulting to two.
fn num_labels(config_json: &serde_json::Value) -> usize {
    config_json
        .get("num_labels")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .or_else(|| {
            config_json
                .get("id2label")
                .and_then(|v| v.as_object())
                .map(|o| o.len())
        })
        .filter(|&n| n >= 2)
        .unwrap_or(2)
}
