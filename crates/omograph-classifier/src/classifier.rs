//! Classification dispatcher.
//!
//! Provides [`HomographClassifier`], which scores every (context, candidate)
//! pair with an entailment model and keeps one candidate per homograph
//! occurrence.
//!
//! Two strategies exist:
//!
//! - **Batched**: every occurrence has an even number of candidates. All
//!   pairs go through the encoder and the model in a single call, and
//!   consecutive candidates are compared two by two.
//! - **Fallback**: at least one occurrence has an odd number of candidates.
//!   Candidates are grouped by [`GroupingEngine`] and scored one pair per
//!   model call.
//!
//! The choice is global: a single odd occurrence sends the whole call down
//! the fallback path.

use std::sync::Arc;
use std::time::Instant;

use omograph_core::{
    ClassifierConfig, EncodeOptions, OmographError, PairClassifier, PairEncoder, Result,
    ScoreMatrix,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alignment::{align_to_groups, align_to_groups_strict};
use crate::grouping::GroupingEngine;
use crate::preprocess::join_punctuation;
use crate::softmax::{entailment_probabilities, entailment_probability};
use crate::stats::{DispatchSnapshot, DispatchStats};
use crate::winner::select_winner;

/// Candidates compared per occurrence on the batched path.
const BATCH_PAIR_SIZE: usize = 2;

// ---------------------------------------------------------------------------
// DispatchPath
// ---------------------------------------------------------------------------

/// Classification strategy for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchPath {
    /// One model call for all pairs.
    Batched,
    /// One model call per candidate.
    Fallback,
}

impl DispatchPath {
    /// Batched when every occurrence size is even, fallback otherwise.
    #[must_use]
    pub fn select(occurrence_sizes: &[usize]) -> Self {
        if occurrence_sizes.iter().all(|n| n % 2 == 0) {
            Self::Batched
        } else {
            Self::Fallback
        }
    }
}

impl std::fmt::Display for DispatchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batched => write!(f, "batched"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Winners of one classification call and the path that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// One winning candidate per occurrence, in occurrence order.
    pub winners: Vec<String>,
    /// Strategy used.
    pub path: DispatchPath,
}

// ---------------------------------------------------------------------------
// HomographClassifier
// ---------------------------------------------------------------------------

/// Selects the most probable stress variant for each homograph occurrence.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use omograph_classifier::HomographClassifier;
/// use omograph_core::{
///     ClassifierConfig, EncodeOptions, EncodedBatch, PairClassifier, PairEncoder, Result,
///     ScoreMatrix,
/// };
///
/// // Scores a candidate higher when it ends with a stressed final vowel.
/// struct Toy;
///
/// impl PairEncoder for Toy {
///     fn encode_pairs(&self, pairs: &[(&str, &str)], _: &EncodeOptions) -> Result<EncodedBatch> {
///         let ids = pairs.iter().map(|(_, h)| vec![u32::from(h.ends_with('+'))]).collect();
///         Ok(EncodedBatch { input_ids: ids, ..EncodedBatch::default() })
///     }
/// }
///
/// impl PairClassifier for Toy {
///     fn run(&self, batch: &EncodedBatch) -> Result<ScoreMatrix> {
///         Ok(batch.input_ids.iter().map(|row| vec![0.0, row[0] as f32]).collect())
///     }
/// }
///
/// let toy = Arc::new(Toy);
/// let classifier = HomographClassifier::new(&ClassifierConfig::default(), toy.clone(), toy);
/// let winners = classifier
///     .classify(&["Руки мыл .", "Руки мыл ."], &["ру+ки", "руки+"], &[2])
///     .unwrap();
/// assert_eq!(winners, vec!["руки+".to_string()]);
/// ```
pub struct HomographClassifier {
    encoder: Arc<dyn PairEncoder>,
    model: Arc<dyn PairClassifier>,
    grouping: GroupingEngine,
    max_length: usize,
    strict: bool,
    stats: DispatchStats,
}

impl HomographClassifier {
    /// Create a classifier from configuration and the two model boundaries.
    #[must_use]
    pub fn new(
        config: &ClassifierConfig,
        encoder: Arc<dyn PairEncoder>,
        model: Arc<dyn PairClassifier>,
    ) -> Self {
        Self::with_grouping(config, GroupingEngine::from_config(config), encoder, model)
    }

    /// Create a classifier with an explicit grouping engine.
    #[must_use]
    pub fn with_grouping(
        config: &ClassifierConfig,
        grouping: GroupingEngine,
        encoder: Arc<dyn PairEncoder>,
        model: Arc<dyn PairClassifier>,
    ) -> Self {
        Self {
            encoder,
            model,
            grouping,
            max_length: config.max_length,
            strict: config.strict,
            stats: DispatchStats::default(),
        }
    }

    /// Returns `true` if malformed input is rejected rather than truncated.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// The grouping engine used on the fallback path.
    #[must_use]
    pub fn grouping(&self) -> &GroupingEngine {
        &self.grouping
    }

    /// Counters and inference latency since creation.
    #[must_use]
    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }

    /// Pick one candidate per occurrence.
    ///
    /// `contexts[i]` is the sentence around `candidates[i]`;
    /// `occurrence_sizes[k]` is the number of candidates of occurrence `k`.
    /// Empty `candidates` yield no winners and no model calls, once strict
    /// mode has checked them against `occurrence_sizes`.
    ///
    /// # Errors
    ///
    /// - [`OmographError::InvalidInput`] on inconsistent lengths (strict mode).
    /// - Any error from the encoder or model, unchanged.
    pub fn classify<C, H>(
        &self,
        contexts: &[C],
        candidates: &[H],
        occurrence_sizes: &[usize],
    ) -> Result<Vec<String>>
    where
        C: AsRef<str>,
        H: AsRef<str>,
    {
        self.classify_detailed(contexts, candidates, occurrence_sizes)
            .map(|c| c.winners)
    }

    /// Same as [`classify`](Self::classify), also reporting the path taken.
    ///
    /// # Errors
    ///
    /// See [`classify`](Self::classify).
    pub fn classify_detailed<C, H>(
        &self,
        contexts: &[C],
        candidates: &[H],
        occurrence_sizes: &[usize],
    ) -> Result<Classification>
    where
        C: AsRef<str>,
        H: AsRef<str>,
    {
        let path = DispatchPath::select(occurrence_sizes);
        if self.strict {
            check_lengths(contexts.len(), candidates.len(), occurrence_sizes)?;
            if path == DispatchPath::Batched {
                check_pairs(occurrence_sizes)?;
            }
        }

        if candidates.is_empty() {
            return Ok(Classification {
                winners: Vec::new(),
                path,
            });
        }

        let texts: Vec<String> = contexts
            .iter()
            .map(|c| join_punctuation(c.as_ref()).into_owned())
            .collect();
        let hypotheses: Vec<&str> = candidates.iter().map(|c| c.as_ref()).collect();

        debug!(
            %path,
            occurrences = occurrence_sizes.len(),
            candidates = hypotheses.len(),
            "Classifying homograph candidates"
        );

        let winners = match path {
            DispatchPath::Batched => self.classify_batched(&texts, &hypotheses)?,
            DispatchPath::Fallback => {
                self.classify_fallback(&texts, &hypotheses, occurrence_sizes)?
            }
        };

        Ok(Classification { winners, path })
    }

    // -- Batched path -------------------------------------------------------

    fn classify_batched(&self, texts: &[String], hypotheses: &[&str]) -> Result<Vec<String>> {
        let pairs: Vec<(&str, &str)> = texts
            .iter()
            .map(String::as_str)
            .zip(hypotheses.iter().copied())
            .collect();

        let scores = self.infer(&pairs, &EncodeOptions::batched(self.max_length))?;
        let probs = entailment_probabilities(&scores)?;

        let winners = hypotheses
            .chunks(BATCH_PAIR_SIZE)
            .zip(probs.chunks(BATCH_PAIR_SIZE))
            .filter_map(|(pair, pair_probs)| select_winner(pair, pair_probs))
            .map(|w| (*w).to_string())
            .collect();

        self.stats.record_batched(pairs.len());
        Ok(winners)
    }

    // -- Fallback path ------------------------------------------------------

    fn classify_fallback(
        &self,
        texts: &[String],
        hypotheses: &[&str],
        occurrence_sizes: &[usize],
    ) -> Result<Vec<String>> {
        let mut sizes = self.grouping.group_sizes(hypotheses);
        if self.strict && sizes != occurrence_sizes {
            warn!(
                grouped = ?sizes,
                expected = ?occurrence_sizes,
                "Candidate grouping disagrees with occurrence sizes, using caller boundaries"
            );
            sizes = occurrence_sizes.to_vec();
        }

        let (hypothesis_groups, context_groups) = if self.strict {
            let hypothesis_groups = align_to_groups_strict(&sizes, hypotheses)?;
            let context_groups = align_to_groups_strict(&sizes, texts)?;
            check_uniform_contexts(&context_groups)?;
            (hypothesis_groups, context_groups)
        } else {
            (
                align_to_groups(&sizes, hypotheses),
                align_to_groups(&sizes, texts),
            )
        };

        let options = EncodeOptions::single(self.max_length);
        let mut winners = Vec::with_capacity(sizes.len());

        for (group, contexts) in hypothesis_groups.iter().zip(context_groups.iter()) {
            // Only reachable when non-strict input is shorter than the grouping.
            let Some(context) = contexts.first() else {
                continue;
            };

            let mut probs = Vec::with_capacity(group.len());
            for &candidate in group.iter() {
                let scores = self.infer(&[(context.as_str(), candidate)], &options)?;
                let row = scores.first().ok_or_else(|| {
                    OmographError::Inference("model returned no scores".to_string())
                })?;
                probs.push(entailment_probability(row)?);
            }

            if let Some(winner) = select_winner(group, &probs) {
                debug!(candidates = ?group, probs = ?probs, %winner, "Occurrence resolved");
                winners.push((*winner).to_string());
            }
        }

        self.stats.record_fallback(hypotheses.len());
        Ok(winners)
    }

    // -- Boundary -----------------------------------------------------------

    /// Encode `pairs`, run the model, and check the matrix has one row per pair.
    fn infer(&self, pairs: &[(&str, &str)], options: &EncodeOptions) -> Result<ScoreMatrix> {
        let encoded = self.encoder.encode_pairs(pairs, options)?;

        let started = Instant::now();
        let scores = self.model.run(&encoded)?;
        self.stats.record_inference(started.elapsed());

        if scores.len() != pairs.len() {
            return Err(OmographError::Inference(format!(
                "model returned {} score rows for {} pairs",
                scores.len(),
                pairs.len()
            )));
        }
        Ok(scores)
    }
}

// ---------------------------------------------------------------------------
// Precondition checks
// ---------------------------------------------------------------------------

fn check_lengths(contexts: usize, candidates: usize, occurrence_sizes: &[usize]) -> Result<()> {
    if contexts != candidates {
        return Err(OmographError::InvalidInput(format!(
            "{contexts} contexts for {candidates} candidates"
        )));
    }
    if let Some(index) = occurrence_sizes.iter().position(|&n| n == 0) {
        return Err(OmographError::InvalidInput(format!(
            "occurrence {index} has no candidates"
        )));
    }
    let total: usize = occurrence_sizes.iter().sum();
    if total != candidates {
        return Err(OmographError::InvalidInput(format!(
            "occurrence sizes sum to {total} but {candidates} candidates were given"
        )));
    }
    Ok(())
}

fn check_pairs(occurrence_sizes: &[usize]) -> Result<()> {
    match occurrence_sizes
        .iter()
        .enumerate()
        .find(|&(_, &n)| n != BATCH_PAIR_SIZE)
    {
        Some((index, n)) => Err(OmographError::InvalidInput(format!(
            "batched classification needs exactly {BATCH_PAIR_SIZE} candidates per occurrence, \
             occurrence {index} has {n}"
        ))),
        None => Ok(()),
    }
}

fn check_uniform_contexts(context_groups: &[&[String]]) -> Result<()> {
    for (index, group) in context_groups.iter().enumerate() {
        if let Some(first) = group.first() {
            if group.iter().any(|c| c != first) {
                return Err(OmographError::InvalidInput(format!(
                    "occurrence {index} has candidates with different contexts"
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_all_even_is_batched() {
        assert_eq!(DispatchPath::select(&[2, 2, 2]), DispatchPath::Batched);
        assert_eq!(DispatchPath::select(&[4, 2]), DispatchPath::Batched);
    }

    #[test]
    fn test_path_any_odd_is_fallback() {
        assert_eq!(DispatchPath::select(&[2, 3, 2]), DispatchPath::Fallback);
        assert_eq!(DispatchPath::select(&[1]), DispatchPath::Fallback);
    }

    #[test]
    fn test_path_display() {
        assert_eq!(DispatchPath::Batched.to_string(), "batched");
        assert_eq!(DispatchPath::Fallback.to_string(), "fallback");
    }

    #[test]
    fn test_path_serializes_lowercase() {
        let json = serde_json::to_string(&DispatchPath::Fallback).unwrap();
        assert_eq!(json, "\"fallback\"");
    }

    #[test]
    fn test_check_lengths() {
        assert!(check_lengths(4, 4, &[2, 2]).is_ok());
        assert!(check_lengths(3, 4, &[2, 2]).is_err());
        assert!(check_lengths(4, 4, &[2, 1]).is_err());
        assert!(check_lengths(4, 4, &[4, 0]).is_err());
    }

    #[test]
    fn test_check_pairs() {
        assert!(check_pairs(&[2, 2]).is_ok());
        let err = check_pairs(&[2, 4]).unwrap_err();
        assert!(err.to_string().contains("occurrence 1 has 4"));
    }

    #[test]
    fn test_check_uniform_contexts() {
        let a = vec!["x".to_string(), "x".to_string()];
        let b = vec!["y".to_string(), "z".to_string()];
        assert!(check_uniform_contexts(&[&a[..]]).is_ok());
        let err = check_uniform_contexts(&[&a[..], &b[..]]).unwrap_err();
        assert!(err.to_string().contains("occurrence 1"));
    }
}
