use crate::error::Result;
use crate::models::classify_types::{ClassificationResult, FileOutcome, TOP_K_DISPLAY};
use crate::services::classifier::ranker;
use crate::services::classifier::{ImageDecoder, Oracle};
use crate::services::fs_service;
use crate::services::labels::LabelTable;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Decoder, oracle and labels shared by every processing attempt.
///
/// Decoding and moving run on the caller's thread without locking; the oracle sits
/// behind a mutex so only one inference runs at a time.
pub struct Pipeline {
    decoder: Box<dyn ImageDecoder>,
    oracle: Mutex<Box<dyn Oracle>>,
    labels: LabelTable,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(decoder: Box<dyn ImageDecoder>, oracle: Box<dyn Oracle>, labels: LabelTable) -> Self {
        Self {
            decoder,
            oracle: Mutex::new(oracle),
            labels,
        }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Decode, evaluate and rank one image. Logs the top predictions.
    pub fn classify(&self, path: &Path) -> Result<ClassificationResult> {
        let tensor = self.decoder.decode(path)?;

        let scores = {
            // A panic inside a previous evaluation leaves the oracle itself usable.
            let mut oracle = self.oracle.lock().unwrap_or_else(PoisonError::into_inner);
            oracle.evaluate(tensor)?
        };

        let result = ranker::rank(&scores, &self.labels)?;
        info!(
            file = %path.display(),
            top = %result.describe_top(TOP_K_DISPLAY),
            "Classified file"
        );
        Ok(result)
    }

    /// Classify a file and move it into its label folder when the top prediction
    /// reaches `confidence`.
    pub fn process_file(&self, path: &Path, confidence: f32) -> Result<FileOutcome> {
        let result = self.classify(path)?;
        let decision = ranker::decide(&result, confidence);

        if !decision.accepted {
            info!(
                file = %path.display(),
                label = %decision.prediction.class_name,
                confidence = decision.prediction.confidence,
                threshold = confidence,
                "Below confidence threshold, leaving file in place"
            );
            return Ok(FileOutcome::BelowThreshold {
                prediction: decision.prediction,
            });
        }

        let destination = fs_service::place(path, &decision.prediction.class_name)?;
        info!(
            file = %path.display(),
            destination = %destination.display(),
            "Moved file"
        );
        Ok(FileOutcome::Moved {
            destination,
            prediction: decision.prediction,
        })
    }
}
