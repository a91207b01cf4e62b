//! Occurrence grouping for flat candidate lists.
//!
//! The accentuation pipeline emits every stress variant of every homograph
//! occurrence into one flat list. Variants of one occurrence are adjacent and
//! share a base form (the word without stress markers), so runs of equal base
//! form are the starting point. A run can still span several occurrences of
//! the same word, which is what the split rules below untangle:
//!
//! 1. base form is a special word and the run is longer than 3: chunks of 3;
//! 2. the run is longer than 3 and even: chunks of 2;
//! 3. otherwise the run is one group.

use std::borrow::Cow;
use std::collections::HashSet;

use omograph_core::{ClassifierConfig, DEFAULT_SPECIAL_WORDS, DEFAULT_STRESS_MARKER};

use crate::alignment::align_to_groups;

/// Runs longer than this are candidates for splitting.
const MAX_UNSPLIT_RUN: usize = 3;

// ---------------------------------------------------------------------------
// SpecialWords
// ---------------------------------------------------------------------------

/// Immutable set of base forms whose runs split into chunks of three.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialWords(HashSet<String>);

impl SpecialWords {
    /// Build a set from any list of base forms.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(words.into_iter().map(Into::into).collect())
    }

    /// An empty set (no run is ever split in threes).
    #[must_use]
    pub fn empty() -> Self {
        Self(HashSet::new())
    }

    /// Returns `true` if `base_form` is in the set.
    #[must_use]
    pub fn contains(&self, base_form: &str) -> bool {
        self.0.contains(base_form)
    }

    /// Number of words in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SpecialWords {
    fn default() -> Self {
        Self::new(DEFAULT_SPECIAL_WORDS.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// GroupingEngine
// ---------------------------------------------------------------------------

/// Partitions candidate variants into occurrence groups.
///
/// # Example
///
/// ```
/// use omograph_classifier::{GroupingEngine, SpecialWords};
///
/// let engine = GroupingEngine::new(SpecialWords::empty(), '+');
/// let candidates = ["за+мок", "замо+к", "за+мок", "замо+к", "ру+ки", "руки+"];
/// assert_eq!(engine.group_sizes(&candidates), vec![2, 2, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct GroupingEngine {
    special_words: SpecialWords,
    stress_marker: char,
}

impl GroupingEngine {
    /// Create an engine with an explicit vocabulary and stress marker.
    #[must_use]
    pub fn new(special_words: SpecialWords, stress_marker: char) -> Self {
        Self {
            special_words,
            stress_marker,
        }
    }

    /// Create an engine from classifier configuration.
    #[must_use]
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(
            SpecialWords::new(config.special_words.iter().cloned()),
            config.stress_marker,
        )
    }

    /// The special-word vocabulary in use.
    #[must_use]
    pub fn special_words(&self) -> &SpecialWords {
        &self.special_words
    }

    /// Strip every stress marker from `candidate`.
    #[must_use]
    pub fn base_form<'a>(&self, candidate: &'a str) -> Cow<'a, str> {
        if candidate.contains(self.stress_marker) {
            Cow::Owned(candidate.replace(self.stress_marker, ""))
        } else {
            Cow::Borrowed(candidate)
        }
    }

    /// Sizes of the occurrence groups for `candidates`, in input order.
    ///
    /// The sizes always sum to `candidates.len()`.
    pub fn group_sizes<S: AsRef<str>>(&self, candidates: &[S]) -> Vec<usize> {
        let mut sizes = Vec::new();
        let mut iter = candidates.iter();
        let Some(first) = iter.next() else {
            return sizes;
        };

        let mut current_base = self.base_form(first.as_ref());
        let mut run_len = 1;

        for candidate in iter {
            let base = self.base_form(candidate.as_ref());
            if base == current_base {
                run_len += 1;
            } else {
                self.split_run(&current_base, run_len, &mut sizes);
                current_base = base;
                run_len = 1;
            }
        }
        self.split_run(&current_base, run_len, &mut sizes);

        sizes
    }

    /// Partition `candidates` into occurrence groups.
    ///
    /// Concatenating the returned slices reproduces `candidates` exactly.
    pub fn group<'a, S: AsRef<str>>(&self, candidates: &'a [S]) -> Vec<&'a [S]> {
        let sizes = self.group_sizes(candidates);
        align_to_groups(&sizes, candidates)
    }

    /// Append the chunk sizes of one finished run.
    fn split_run(&self, base: &str, run_len: usize, sizes: &mut Vec<usize>) {
        let chunk = if run_len > MAX_UNSPLIT_RUN && self.special_words.contains(base) {
            3
        } else if run_len > MAX_UNSPLIT_RUN && run_len % 2 == 0 {
            2
        } else {
            run_len
        };

        let mut remaining = run_len;
        while remaining > 0 {
            let take = remaining.min(chunk);
            sizes.push(take);
            remaining -= take;
        }
    }
}

impl Default for GroupingEngine {
    fn default() -> Self {
        Self::new(SpecialWords::default(), DEFAULT_STRESS_MARKER)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
