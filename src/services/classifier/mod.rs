pub mod inference;
pub mod model_manager;
pub mod pipeline;
pub mod ranker;

use crate::error::Result;
use ndarray::Array4;
use std::path::Path;

/// Turns an image file into the tensor the oracle consumes.
///
/// Called concurrently from several attempts, so implementations must not need
/// exclusive access.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Array4<f32>>;
}

/// Produces one score per class for a decoded image.
///
/// Takes `&mut self`; callers serialise access.
pub trait Oracle: Send {
    fn evaluate(&mut self, input: Array4<f32>) -> Result<Vec<f32>>;
}
