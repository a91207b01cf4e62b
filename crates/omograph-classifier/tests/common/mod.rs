//! Mock model boundaries shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use omograph_classifier::HomographClassifier;
use omograph_core::{
    ClassifierConfig, EncodeOptions, EncodedBatch, OmographError, PairClassifier, PairEncoder,
    Result, ScoreMatrix,
};

/// Encoder + model pair backed by a lookup table of "true" logits.
///
/// The encoder stores each (text, hypothesis) pair in a registry and emits
/// its registry index as the only token id; the model looks the pair back up
/// and returns `[0.0, logit]`. Unknown pairs score `0.0`.
#[derive(Default)]
pub struct MockModel {
    logits: HashMap<(String, String), f32>,
    registry: Mutex<Vec<(String, String)>>,
    encode_options: Mutex<Vec<EncodeOptions>>,
    encode_calls: AtomicUsize,
    run_calls: AtomicUsize,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the "entailment true" logit for a (preprocessed context, candidate) pair.
    pub fn with_logit(mut self, context: &str, candidate: &str, logit: f32) -> Self {
        self.logits
            .insert((context.to_string(), candidate.to_string()), logit);
        self
    }

    pub fn encode_calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }

    pub fn run_calls(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }

    /// Every pair seen by the encoder, in order.
    pub fn seen_pairs(&self) -> Vec<(String, String)> {
        self.registry.lock().unwrap().clone()
    }

    pub fn seen_options(&self) -> Vec<EncodeOptions> {
        self.encode_options.lock().unwrap().clone()
    }
}

impl PairEncoder for MockModel {
    fn encode_pairs(
        &self,
        pairs: &[(&str, &str)],
        options: &EncodeOptions,
    ) -> Result<EncodedBatch> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        self.encode_options.lock().unwrap().push(*options);

        let mut registry = self.registry.lock().unwrap();
        let mut batch = EncodedBatch::default();
        for (text, hypothesis) in pairs {
            let id = registry.len() as u32;
            registry.push((text.to_string(), hypothesis.to_string()));
            batch.input_ids.push(vec![id]);
            batch.attention_mask.push(vec![1]);
            batch.token_type_ids.push(vec![0]);
        }
        Ok(batch)
    }
}

impl PairClassifier for MockModel {
    fn run(&self, batch: &EncodedBatch) -> Result<ScoreMatrix> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        let registry = self.registry.lock().unwrap();
        Ok(batch
            .input_ids
            .iter()
            .map(|row| {
                let pair = &registry[row[0] as usize];
                vec![0.0, self.logits.get(pair).copied().unwrap_or(0.0)]
            })
            .collect())
    }
}

/// Model whose output is fixed regardless of input.
pub struct FixedOutput(pub ScoreMatrix);

impl PairClassifier for FixedOutput {
    fn run(&self, _batch: &EncodedBatch) -> Result<ScoreMatrix> {
        Ok(self.0.clone())
    }
}

/// Model that always fails.
pub struct FailingModel;

impl PairClassifier for FailingModel {
    fn run(&self, _batch: &EncodedBatch) -> Result<ScoreMatrix> {
        Err(OmographError::Inference("backend exploded".to_string()))
    }
}

pub fn strict_config() -> ClassifierConfig {
    ClassifierConfig::default()
}

pub fn permissive_config() -> ClassifierConfig {
    ClassifierConfig {
        strict: false,
        ..ClassifierConfig::default()
    }
}

/// Classifier using `mock` as both encoder and model.
pub fn classifier_with(config: &ClassifierConfig, mock: &Arc<MockModel>) -> HomographClassifier {
    HomographClassifier::new(config, mock.clone(), mock.clone())
}

/// Classifier whose encoder is `mock` and whose model is `model`.
pub fn classifier_with_model(
    config: &ClassifierConfig,
    mock: &Arc<MockModel>,
    model: Arc<dyn PairClassifier>,
) -> HomographClassifier {
    HomographClassifier::new(config, mock.clone(), model)
}
