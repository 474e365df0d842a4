use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Number of predictions reported for each classified file.
pub const TOP_K_DISPLAY: usize = 3;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Prediction {
    /// Output channel of the oracle this score came from.
    pub index: usize,
    pub class_name: String,
    pub confidence: f32,
}

/// Every prediction for one image, highest confidence first.
///
/// Only built by [`crate::services::classifier::ranker::rank`], which guarantees the
/// list is non-empty and ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    predictions: Vec<Prediction>,
}

impl ClassificationResult {
    pub(crate) fn new(predictions: Vec<Prediction>) -> Self {
        debug_assert!(!predictions.is_empty());
        Self { predictions }
    }

    pub fn top(&self) -> &Prediction {
        &self.predictions[0]
    }

    pub fn top_k(&self, k: usize) -> &[Prediction] {
        &self.predictions[..k.min(self.predictions.len())]
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// `"label": probability` pairs for the first `k` predictions, comma separated.
    pub fn describe_top(&self, k: usize) -> String {
        let mut out = String::new();
        for (i, prediction) in self.top_k(k).iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "\"{}\": {}", prediction.class_name, prediction.confidence);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub prediction: Prediction,
    pub accepted: bool,
}

/// What happened to a file that made it through classification.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Moved {
        destination: PathBuf,
        prediction: Prediction,
    },
    BelowThreshold {
        prediction: Prediction,
    },
}

/// One-shot classification report, printed with `classify --json`.
#[derive(Debug, Serialize, Clone)]
pub struct ClassifyResult {
    pub file_path: String,
    pub predictions: Vec<Prediction>,
    pub confidence_threshold: f32,
    pub accepted: bool,
}
