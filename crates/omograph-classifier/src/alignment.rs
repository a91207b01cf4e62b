//! Re-slicing parallel sequences to match occurrence groups.

use omograph_core::{OmographError, Result};

/// Cut `target` into consecutive slices of the given sizes.
///
/// Slices that run past the end of `target` are truncated (possibly to
/// empty); no error is raised. Use [`align_to_groups_strict`] when the
/// lengths must agree.
pub fn align_to_groups<'a, T>(sizes: &[usize], target: &'a [T]) -> Vec<&'a [T]> {
    let mut start = 0usize;
    sizes
        .iter()
        .map(|&size| {
            let begin = start.min(target.len());
            let end = start.saturating_add(size).min(target.len());
            start = start.saturating_add(size);
            &target[begin..end]
        })
        .collect()
}

/// Like [`align_to_groups`], but fails unless the sizes cover `target` exactly.
///
/// # Errors
///
/// Returns [`OmographError::InvalidInput`] when `sum(sizes) != target.len()`.
pub fn align_to_groups_strict<'a, T>(sizes: &[usize], target: &'a [T]) -> Result<Vec<&'a [T]>> {
    let total: usize = sizes.iter().sum();
    if total != target.len() {
        return Err(OmographError::InvalidInput(format!(
            "group sizes cover {total} items but the sequence has {}",
            target.len()
        )));
    }
    Ok(align_to_groups(sizes, target))
}
