use crate::error::{Result, SorterError};
use crate::models::classify_types::{ClassificationResult, Decision, Prediction};
use crate::services::labels::LabelTable;
use std::cmp::Ordering;

/// Pair every score with its label and order them by descending probability.
///
/// The sort is stable, so equal scores keep their channel order. NaN scores are
/// placed after every number. Scores are not clamped or renormalised.
pub fn rank(probabilities: &[f32], labels: &LabelTable) -> Result<ClassificationResult> {
    if probabilities.len() != labels.len() || probabilities.is_empty() {
        return Err(SorterError::ShapeMismatch {
            expected: labels.len(),
            actual: probabilities.len(),
        });
    }

    let mut indexed: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| descending(a.1, b.1));

    let predictions = indexed
        .into_iter()
        .map(|(index, confidence)| Prediction {
            index,
            class_name: labels.get(index).unwrap_or_default().to_string(),
            confidence,
        })
        .collect();

    Ok(ClassificationResult::new(predictions))
}

/// Accept the top prediction iff its probability is at least `threshold`.
pub fn decide(result: &ClassificationResult, threshold: f32) -> Decision {
    let prediction = result.top().clone();
    let accepted = !prediction.confidence.is_nan() && prediction.confidence >= threshold;
    Decision {
        prediction,
        accepted,
    }
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
