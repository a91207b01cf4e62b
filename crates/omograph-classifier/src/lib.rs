//! Candidate grouping and batched classification for Russian homographs
//!
//! Given the stress-marked candidate variants produced for every homograph
//! occurrence in a text, and the sentence each occurrence appears in, this
//! crate asks a sequence-pair (entailment) classifier how well each
//! candidate fits its context and keeps the best candidate per occurrence.
//!
//! The pieces, leaves first:
//!
//! - [`grouping`] partitions a flat candidate list into occurrence groups.
//! - [`alignment`] re-slices a parallel list to match those groups.
//! - [`softmax`] turns raw logits into probabilities.
//! - [`winner`] picks the first maximal candidate of a group.
//! - [`classifier`] chooses between the batched and the per-candidate path
//!   and drives the encoder and model boundaries from `omograph-core`.
//!
//! # Feature Gate
//!
//! The `ml` feature adds [`backend::CandleBackend`], a Candle + `tokenizers`
//! implementation of both boundaries that loads BERT or DeBERTa v2 sequence
//! classification checkpoints from a local directory or the Hugging Face Hub.

pub mod alignment;
pub mod classifier;
pub mod grouping;
pub mod preprocess;
pub mod softmax;
pub mod stats;
pub mod winner;

#[cfg(feature = "ml")]
pub mod backend;
#[cfg(feature = "ml")]
pub mod device;

pub use classifier::{Classification, DispatchPath, HomographClassifier};
pub use grouping::{GroupingEngine, SpecialWords};
pub use stats::{DispatchSnapshot, DispatchStats, LatencySummary};

#[cfg(feature = "ml")]
pub use backend::CandleBackend;
