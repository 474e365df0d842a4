use crate::error::{Result, SorterError};
use crate::services::classifier::inference::{ImagePreprocessor, OnnxOracle};
use crate::services::classifier::pipeline::Pipeline;
use crate::services::labels::LabelTable;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_MODEL_FILE: &str = "squeezenet1.0-9.onnx";
pub const DEFAULT_LABELS_FILE: &str = "Labels.json";
pub const DEFAULT_CROP_SIZE: u32 = 224;

/// Where the model and its labels live, and how to run it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub crop_size: u32,
    pub use_gpu: bool,
    /// Apply softmax to the raw output, for models that emit logits.
    pub softmax: bool,
}

impl ModelSpec {
    /// Model and label files next to the running executable.
    pub fn beside_executable() -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| {
            SorterError::Config(format!("Failed to locate the running executable: {}", e))
        })?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::in_dir(dir))
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            model_path: dir.join(DEFAULT_MODEL_FILE),
            labels_path: dir.join(DEFAULT_LABELS_FILE),
            crop_size: DEFAULT_CROP_SIZE,
            use_gpu: false,
            softmax: false,
        }
    }
}

pub fn load_session(model_path: &Path, use_gpu: bool) -> Result<Session> {
    if !model_path.is_file() {
        return Err(SorterError::Config(format!(
            "Model file {} does not exist",
            model_path.display()
        )));
    }

    let _ = ort::init().with_name("photo-sorter").commit();

    let mut builder = Session::builder()
        .map_err(|e| SorterError::Oracle(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| SorterError::Oracle(format!("Failed to set optimization level: {}", e)))?
        .with_intra_threads(4)
        .map_err(|e| SorterError::Oracle(format!("Failed to set intra threads: {}", e)))?;

    if use_gpu {
        builder = builder
            .with_execution_providers([
                ort::execution_providers::CUDAExecutionProvider::default().build(),
                ort::execution_providers::CoreMLExecutionProvider::default().build(),
                ort::execution_providers::CPUExecutionProvider::default().build(),
            ])
            .map_err(|e| {
                SorterError::Oracle(format!("Failed to register GPU execution providers: {}", e))
            })?;
    } else {
        builder = builder
            .with_execution_providers([
                ort::execution_providers::CPUExecutionProvider::default().build(),
            ])
            .map_err(|e| {
                SorterError::Oracle(format!("Failed to register CPU execution provider: {}", e))
            })?;
    }

    builder
        .commit_from_file(model_path)
        .map_err(|e| SorterError::Oracle(format!("Failed to load ONNX model: {}", e)))
}

/// Load labels and model and wire them into a [`Pipeline`].
///
/// Labels are read first so a bad label file fails before the model is touched.
pub fn load_pipeline(spec: &ModelSpec) -> Result<Pipeline> {
    let labels = LabelTable::load(&spec.labels_path)?;
    debug!(
        labels = labels.len(),
        path = %spec.labels_path.display(),
        "Loaded label table"
    );

    let session = load_session(&spec.model_path, spec.use_gpu)?;
    info!(model = %spec.model_path.display(), gpu = spec.use_gpu, "Loaded model");

    Ok(Pipeline::new(
        Box::new(ImagePreprocessor::new(spec.crop_size)),
        Box::new(OnnxOracle::new(session, spec.softmax)),
        labels,
    ))
}
