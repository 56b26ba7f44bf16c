use std::fmt;

use serde::{Deserialize, Serialize};

/// Label reported when there is nothing to rank.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Top-1 classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    /// Raw model score. Not guaranteed to be a calibrated probability.
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
        }
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1}%)", self.label, self.confidence * 100.0)
    }
}

/// First index holding a score strictly above every earlier score, with the
/// running best starting at `(0, 0.0)`.
///
/// Because the floor is zero rather than negative infinity, a vector whose
/// maximum is `0.0` resolves to index 0 with score 0 no matter where its
/// zeros sit. NaN never wins.
pub fn argmax_and_max(scores: &[f32]) -> (usize, f32) {
    scores
        .iter()
        .enumerate()
        .fold((0, 0.0), |(max_idx, max_val), (i, &val)| {
            if val > max_val { (i, val) } else { (max_idx, max_val) }
        })
}

/// Reduce a confidence vector to its top label.
pub fn rank(confidences: &[f32], labels: &[String]) -> ClassificationResult {
    if confidences.is_empty() || labels.is_empty() {
        return ClassificationResult::unknown();
    }
    let (idx, confidence) = argmax_and_max(confidences);
    match labels.get(idx) {
        Some(label) => ClassificationResult {
            label: label.clone(),
            confidence,
        },
        None => ClassificationResult::unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn picks_the_highest_score() {
        let result = rank(&[0.1, 0.7, 0.2], &labels(&["A", "B", "C"]));
        assert_eq!(result.label, "B");
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn all_zero_resolves_to_first_label() {
        let result = rank(&[0.0, 0.0], &labels(&["A", "B"]));
        assert_eq!(result.label, "A");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn ties_go_to_the_first_index() {
        let result = rank(&[0.1, 0.4, 0.4, 0.1], &labels(&["A", "B", "C", "D"]));
        assert_eq!(result.label, "B");
        assert_eq!(result.confidence, 0.4);
    }

    #[test]
    fn zero_floor_ignores_negative_scores() {
        let result = rank(&[-3.0, -1.0, -2.0], &labels(&["A", "B", "C"]));
        let expected = ClassificationResult {
            label: "A".into(),
            confidence: 0.0,
        };
        assert_eq!(result, expected);
    }

    #[test]
    fn nan_is_never_selected() {
        assert_eq!(argmax_and_max(&[f32::NAN, 0.3, f32::NAN]), (1, 0.3));
    }

    #[test]
    fn empty_inputs_are_unknown() {
        assert_eq!(rank(&[], &labels(&["A"])), ClassificationResult::unknown());
        assert_eq!(rank(&[0.9], &[]), ClassificationResult::unknown());
        assert_eq!(ClassificationResult::unknown().label, "Unknown");
    }

    #[test]
    fn display_shows_percent_with_one_decimal() {
        let result = ClassificationResult {
            label: "LED".into(),
            confidence: 0.8771,
        };
        assert_eq!(result.to_string(), "LED (87.7%)");
    }
}
