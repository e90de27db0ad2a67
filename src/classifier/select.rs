//! Turning per-label scores into a label selection.

use crate::labels::{CATEGORIES, LABEL_COUNT};

use super::error::ClassifierError;

/// Result of classifying one article.
#[derive(Debug)]
pub enum LabelOutcome {
    /// One or more labels scored above the threshold, in label-set order.
    Thresholded(Vec<&'static str>),
    /// Nothing crossed the threshold; the top-scoring label was used.
    Fallback(&'static str),
    /// Loading, tokenization or inference failed.
    Failed(ClassifierError),
}

impl LabelOutcome {
    /// Labels to report for this outcome. Empty only for `Failed`.
    pub fn labels(&self) -> Vec<&'static str> {
        match self {
            Self::Thresholded(labels) => labels.clone(),
            Self::Fallback(label) => vec![*label],
            Self::Failed(_) => Vec::new(),
        }
    }

    pub fn into_labels(self) -> Vec<String> {
        self.labels().into_iter().map(String::from).collect()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Short name of the outcome kind, for logs and the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Thresholded(_) => "thresholded",
            Self::Fallback(_) => "fallback",
            Self::Failed(_) => "failed",
        }
    }
}

pub fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

/// Select every label whose probability is strictly above `threshold`,
/// falling back to the highest-probability label when none is.
pub fn select_labels(probabilities: &[f32], threshold: f32) -> LabelOutcome {
    if probabilities.len() != LABEL_COUNT {
        return LabelOutcome::Failed(ClassifierError::LabelCountMismatch {
            expected: LABEL_COUNT,
            got: probabilities.len(),
        });
    }

    let selected: Vec<&'static str> = probabilities
        .iter()
        .zip(CATEGORIES.iter())
        .filter(|(prob, _)| **prob > threshold)
        .map(|(_, label)| *label)
        .collect();

    if !selected.is_empty() {
        return LabelOutcome::Thresholded(selected);
    }

    // First maximum wins on ties.
    let mut top = 0;
    for (idx, prob) in probabilities.iter().enumerate().skip(1) {
        if *prob > probabilities[top] {
            top = idx;
        }
    }
    LabelOutcome::Fallback(CATEGORIES[top])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probs(pairs: &[(usize, f32)]) -> Vec<f32> {
        let mut p = vec![0.1; LABEL_COUNT];
        for (idx, value) in pairs {
            p[*idx] = *value;
        }
        p
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_multiple_labels_keep_label_set_order() {
        // Higher probability on the later label must not reorder output.
        let outcome = select_labels(&probs(&[(7, 0.6), (3, 0.9), (12, 0.51)]), 0.5);
        match outcome {
            LabelOutcome::Thresholded(labels) => assert_eq!(
                labels,
                vec![
                    "Economics & Finance",
                    "Technology & Science",
                    "Industry & Manufacturing"
                ]
            ),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let outcome = select_labels(&probs(&[(2, 0.5), (4, 0.3)]), 0.5);
        match outcome {
            LabelOutcome::Fallback(label) => assert_eq!(label, "Law & Justice"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_fallback_picks_top_label() {
        let outcome = select_labels(&probs(&[(9, 0.45)]), 0.5);
        assert_eq!(outcome.kind(), "fallback");
        assert_eq!(outcome.labels(), vec!["Environment"]);
    }

    #[test]
    fn test_fallback_tie_takes_first_index() {
        let outcome = select_labels(&vec![0.2; LABEL_COUNT], 0.5);
        assert_eq!(outcome.labels(), vec!["Politics & Government"]);
    }

    #[test]
    fn test_never_empty_for_any_threshold() {
        let p = probs(&[(1, 0.7), (5, 0.2)]);
        for step in 0..=20 {
            let threshold = step as f32 / 20.0;
            let outcome = select_labels(&p, threshold);
            assert!(!outcome.is_failed());
            assert!(!outcome.labels().is_empty(), "empty at {}", threshold);
        }
    }

    #[test]
    fn test_wrong_score_count_fails() {
        let outcome = select_labels(&[0.9, 0.8], 0.5);
        assert!(outcome.is_failed());
        assert!(outcome.labels().is_empty());
        assert!(matches!(
            outcome,
            LabelOutcome::Failed(ClassifierError::LabelCountMismatch { expected: 14, got: 2 })
        ));
    }
}
