//! Context normalization applied before encoding.
//!
//! The accentuation pipeline joins tokens with spaces, producing text such
//! as `Он купил замок .`. The classifier was trained on ordinary
//! punctuation, so whitespace in front of punctuation is removed.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Whitespace run followed by one of `, . ? ! : ; …`.
static SPACE_BEFORE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.?!:;…])").expect("punctuation regex"));

/// Remove whitespace immediately preceding punctuation.
///
/// Returns the input unchanged (borrowed) when there is nothing to join.
#[must_use]
pub fn join_punctuation(text: &str) -> Cow<'_, str> {
    SPACE_BEFORE_PUNCT_RE.replace_all(text, "$1")
}
