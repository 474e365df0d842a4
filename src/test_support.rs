//! Fakes that let the pipeline and watch loop run without a model file.
//!
//! Test "images" are text files holding comma separated scores; the decoder turns
//! them into a (1, 1, 1, n) tensor and the oracle hands the values straight back.

use crate::error::{Result, SorterError};
use crate::services::classifier::pipeline::Pipeline;
use crate::services::classifier::{ImageDecoder, Oracle};
use crate::services::labels::LabelTable;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct TextDecoder;

impl ImageDecoder for TextDecoder {
    fn decode(&self, path: &Path) -> Result<Array4<f32>> {
        let text = std::fs::read_to_string(path).map_err(|e| SorterError::decode(path, e))?;
        let scores = text
            .split(',')
            .map(|s| s.trim().parse::<f32>())
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| SorterError::decode(path, e))?;
        let len = scores.len();
        Array4::from_shape_vec((1, 1, 1, len), scores).map_err(|e| SorterError::decode(path, e))
    }
}

/// Returns its input as the score vector, optionally holding the call open for a
/// while and recording how many calls overlapped.
#[derive(Default)]
pub struct PassthroughOracle {
    pub delay: Duration,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
}

impl Oracle for PassthroughOracle {
    fn evaluate(&mut self, input: Array4<f32>) -> Result<Vec<f32>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(input.iter().copied().collect())
    }
}

pub fn labels(names: &[&str]) -> LabelTable {
    LabelTable::from_labels(names.iter().map(|s| s.to_string()).collect()).unwrap()
}

pub fn text_pipeline(names: &[&str]) -> Pipeline {
    text_pipeline_with(names, PassthroughOracle::default())
}

pub fn text_pipeline_with(names: &[&str], oracle: PassthroughOracle) -> Pipeline {
    Pipeline::new(Box::new(TextDecoder), Box::new(oracle), labels(names))
}

pub fn scores_file(dir: &Path, name: &str, scores: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, scores).unwrap();
    path
}
