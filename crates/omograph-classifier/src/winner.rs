//! Winner selection within an occurrence group.

/// Index of the first maximum in `values`.
///
/// A NaN never beats a real number. Returns `None` for empty input.
#[must_use]
pub fn argmax_first(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in values.iter().enumerate() {
        match best {
            None => best = Some((index, value)),
            Some((_, current)) if value > current || (current.is_nan() && !value.is_nan()) => {
                best = Some((index, value));
            }
            _ => {}
        }
    }
    best.map(|(index, _)| index)
}

/// Candidate with the highest probability; ties go to the earliest candidate.
///
/// `candidates` and `probabilities` are paired by position; extra entries in
/// the longer slice are ignored.
#[must_use]
pub fn select_winner<'a, S>(candidates: &'a [S], probabilities: &[f32]) -> Option<&'a S> {
    let n = candidates.len().min(probabilities.len());
    argmax_first(&probabilities[..n]).map(|index| &candidates[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tie_goes_to_first() {
        let candidates = ["раза́", "ра́за"];
        assert_eq!(select_winner(&candidates, &[0.5, 0.5]), Some(&"раза́"));
    }

    #[test]
    fn test_picks_maximum() {
        let candidates = ["a", "b", "c"];
        assert_eq!(select_winner(&candidates, &[0.1, 0.7, 0.2]), Some(&"b"));
    }

    #[test]
    fn test_first_of_several_maxima() {
        assert_eq!(argmax_first(&[0.2, 0.9, 0.1, 0.9]), Some(1));
    }

    #[test]
    fn test_single_candidate() {
        let candidates = ["до́ма"];
        assert_eq!(select_winner(&candidates, &[0.01]), Some(&"до́ма"));
    }

    #[test]
    fn test_empty() {
        let candidates: [&str; 0] = [];
        assert_eq!(select_winner(&candidates, &[]), None);
        assert_eq!(argmax_first(&[]), None);
    }

    #[test]
    fn test_nan_never_wins() {
        assert_eq!(argmax_first(&[f32::NAN, 0.3]), Some(1));
        assert_eq!(argmax_first(&[0.3, f32::NAN]), Some(0));
    }

    #[test]
    fn test_length_mismatch_uses_common_prefix() {
        let candidates = ["a", "b", "c"];
        assert_eq!(select_winner(&candidates, &[0.1, 0.2]), Some(&"b"));
    }
}
