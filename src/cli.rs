use crate::error::Result;
use crate::models::watch_types::{normalize_extension, DEFAULT_CONFIDENCE};
use crate::services::classifier::model_manager::{ModelSpec, DEFAULT_CROP_SIZE};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "photo-sorter",
    version,
    about = "Classify photos with an ONNX model and sort them into per-label folders"
)]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sort existing images in a folder, then keep sorting new ones as they appear.
    Watch(WatchArgs),
    /// Classify a single image and print the winning label.
    Classify(ClassifyArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Folder to watch.
    pub directory: PathBuf,

    /// File extensions to pick up.
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_values = ["png", "jpg", "jpeg"],
        value_parser = parse_extension
    )]
    pub extensions: Vec<String>,

    /// Minimum confidence needed to move a file.
    #[arg(short, long, default_value_t = DEFAULT_CONFIDENCE, value_parser = parse_confidence)]
    pub confidence: f32,

    /// Delay between a file appearing and it being classified.
    #[arg(long, default_value_t = 1000)]
    pub debounce_ms: u64,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Image file to analyze.
    pub image: PathBuf,

    /// Minimum confidence.
    #[arg(short, long, default_value_t = DEFAULT_CONFIDENCE, value_parser = parse_confidence)]
    pub confidence: f32,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Debug, Args)]
pub struct ModelArgs {
    /// ONNX model file [default: squeezenet1.0-9.onnx next to the executable]
    #[arg(long, env = "PHOTO_SORTER_MODEL")]
    pub model: Option<PathBuf>,

    /// Label table JSON [default: Labels.json next to the executable]
    #[arg(long, env = "PHOTO_SORTER_LABELS")]
    pub labels: Option<PathBuf>,

    /// Side length of the square model input.
    #[arg(long, default_value_t = DEFAULT_CROP_SIZE, value_parser = clap::value_parser!(u32).range(1..=4096))]
    pub crop_size: u32,

    /// Try GPU execution providers before the CPU.
    #[arg(long)]
    pub gpu: bool,

    /// Apply softmax to the model output (for models that emit logits).
    #[arg(long)]
    pub softmax: bool,
}

impl ModelArgs {
    pub fn into_spec(self) -> Result<ModelSpec> {
        let defaults = ModelSpec::beside_executable()?;
        Ok(ModelSpec {
            model_path: self.model.unwrap_or(defaults.model_path),
            labels_path: self.labels.unwrap_or(defaults.labels_path),
            crop_size: self.crop_size,
            use_gpu: self.gpu,
            softmax: self.softmax,
        })
    }
}

fn parse_confidence(value: &str) -> std::result::Result<f32, String> {
    let confidence: f32 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number", value))?;
    if confidence > 0.0 && confidence <= 1.0 {
        Ok(confidence)
    } else {
        Err(format!("confidence must be in (0, 1], got {}", value))
    }
}

fn parse_extension(value: &str) -> std::result::Result<String, String> {
    let ext = normalize_extension(value);
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(format!("`{}` is not a file extension", value));
    }
    Ok(ext)
}
