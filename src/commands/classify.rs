use crate::cli::ClassifyArgs;
use crate::commands::RunStatus;
use crate::error::{Result, SorterError};
use crate::models::classify_types::{ClassifyResult, Prediction, TOP_K_DISPLAY};
use crate::services::classifier::model_manager;
use crate::services::classifier::pipeline::Pipeline;
use crate::services::classifier::ranker;
use std::path::Path;
use tracing::error;

pub async fn run(args: ClassifyArgs) -> RunStatus {
    let confidence = args.confidence;
    let json = args.json;
    let image = args.image.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let spec = args.model.into_spec()?;
        let pipeline = model_manager::load_pipeline(&spec)?;
        classify(&pipeline, &args.image, confidence)
    })
    .await
    .map_err(|e| SorterError::Task(e.to_string()))
    .and_then(|result| result);

    match outcome {
        Ok(report) => {
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        error!(error = %e, "Failed to serialize result");
                        return RunStatus::Failed;
                    }
                }
            } else if let Some(top) = report.predictions.first() {
                println!("{}", format_prediction(top));
            }
            if report.accepted {
                RunStatus::Success
            } else {
                RunStatus::BelowConfidence
            }
        }
        Err(e) => {
            error!(file = %image.display(), error = %e, "Error when processing file");
            RunStatus::from_error(&e)
        }
    }
}

/// Classify one image without touching the filesystem.
pub fn classify(pipeline: &Pipeline, image: &Path, confidence: f32) -> Result<ClassifyResult> {
    let result = pipeline.classify(image)?;
    let decision = ranker::decide(&result, confidence);
    Ok(ClassifyResult {
        file_path: image.display().to_string(),
        predictions: result.top_k(TOP_K_DISPLAY).to_vec(),
        confidence_threshold: confidence,
        accepted: decision.accepted,
    })
}

/// `label (NN%)`, the percentage truncated toward zero.
pub fn format_prediction(prediction: &Prediction) -> String {
    let percent = (prediction.confidence * 100.0).trunc();
    let percent = if percent.is_finite() { percent as i64 } else { 0 };
    format!("{} ({}%)", prediction.class_name, percent)
}
