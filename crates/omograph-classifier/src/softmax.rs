//! Logit normalization.

use omograph_core::{OmographError, Result, ENTAILMENT_TRUE_INDEX};

/// Numerically stable softmax.
///
/// The maximum is subtracted before exponentiation; softmax is invariant
/// under a constant shift, so the result is unchanged.
#[must_use]
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.iter().map(|&e| e / sum).collect()
}

/// Apply [`softmax`] to every row of a score matrix.
#[must_use]
pub fn softmax_rows(rows: &[Vec<f32>]) -> Vec<Vec<f32>> {
    rows.iter().map(|row| softmax(row)).collect()
}

/// Probability that the pair behind `row` is a true entailment.
///
/// # Errors
///
/// Returns [`OmographError::Inference`] if the row has fewer than two columns.
pub fn entailment_probability(row: &[f32]) -> Result<f32> {
    check_columns(row)?;
    Ok(softmax(row)[ENTAILMENT_TRUE_INDEX])
}

/// Entailment-true probability of every row, normalized row by row.
///
/// # Errors
///
/// Returns [`OmographError::Inference`] if any row has fewer than two columns.
pub fn entailment_probabilities(rows: &[Vec<f32>]) -> Result<Vec<f32>> {
    for row in rows {
        check_columns(row)?;
    }
    Ok(softmax_rows(rows)
        .into_iter()
        .map(|probs| probs[ENTAILMENT_TRUE_INDEX])
        .collect())
}

fn check_columns(row: &[f32]) -> Result<()> {
    if row.len() <= ENTAILMENT_TRUE_INDEX {
        return Err(OmographError::Inference(format!(
            "score row has {} column(s), expected at least {}",
            row.len(),
            ENTAILMENT_TRUE_INDEX + 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-6;

    #[test]
    fn test_softmax_sums_to_one() {
        for logits in [
            vec![1.0, 2.0, 3.0],
            vec![-4.5, 0.25],
            vec![0.0],
            vec![80.0, -80.0, 3.0, 3.0],
        ] {
            let probs = softmax(&logits);
            assert_eq!(probs.len(), logits.len());
            assert!(probs.iter().all(|&p| p >= 0.0));
            let sum: f32 = probs.iter().sum();
            assert!((sum - 1.0).abs() < TOLERANCE, "sum={sum} for {logits:?}");
        }
    }

    #[test]
    fn test_softmax_shift_invariant() {
        let base = [0.3, -1.2, 2.5];
        let shifted: Vec<f32> = base.iter().map(|x| x + 100.0).collect();
        for (a, b) in softmax(&base).iter().zip(softmax(&shifted).iter()) {
            assert!((a - b).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_softmax_large_logits_stay_finite() {
        let probs = softmax(&[1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_softmax_equal_logits_uniform() {
        let probs = softmax(&[2.0, 2.0]);
        assert!((probs[0] - 0.5).abs() < TOLERANCE);
        assert!((probs[1] - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_softmax_empty() {
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn test_softmax_rows_is_row_wise() {
        let rows = vec![vec![0.0, 0.0], vec![10.0, 10.0]];
        let probs = softmax_rows(&rows);
        for row in probs {
            assert!((row[0] - 0.5).abs() < TOLERANCE);
            assert!((row.iter().sum::<f32>() - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_entailment_probability_reads_second_column() {
        let p = entailment_probability(&[0.0, 3.0]).unwrap();
        assert!(p > 0.9);
        let p = entailment_probability(&[3.0, 0.0]).unwrap();
        assert!(p < 0.1);
    }

    #[test]
    fn test_entailment_probabilities_per_row() {
        let rows = vec![vec![0.0, 0.0], vec![0.0, 3.0], vec![3.0, 0.0]];
        let probs = entailment_probabilities(&rows).unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs[0] - 0.5).abs() < TOLERANCE);
        assert!((probs[1] - entailment_probability(&rows[1]).unwrap()).abs() < TOLERANCE);
        assert!(probs[2] < 0.1);
    }

    #[test]
    fn test_entailment_probabilities_rejects_narrow_row() {
        let err = entailment_probabilities(&[vec![0.0, 1.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, OmographError::Inference(_)));
        assert!(entailment_probabilities(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_entailment_probability_requires_two_columns() {
        let err = entailment_probability(&[1.0]).unwrap_err();
        assert!(matches!(err, OmographError::Inference(_)));
    }
}
