use crate::error::{Result, SorterError};
use crate::services::classifier::{ImageDecoder, Oracle};
use image::ImageReader;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;

const CROP_PCT: f32 = 0.875;

// ImageNet normalization constants
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resize, centre crop and normalise an image into a (1, 3, crop, crop) tensor.
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    crop_size: u32,
}

impl ImagePreprocessor {
    pub fn new(crop_size: u32) -> Self {
        Self { crop_size }
    }

    pub fn crop_size(&self) -> u32 {
        self.crop_size
    }
}

impl ImageDecoder for ImagePreprocessor {
    fn decode(&self, path: &Path) -> Result<Array4<f32>> {
        preprocess_image(path, self.crop_size)
    }
}

pub fn preprocess_image(path: &Path, crop_size: u32) -> Result<Array4<f32>> {
    let img = ImageReader::open(path)
        .map_err(|e| SorterError::decode(path, format!("failed to open: {}", e)))?
        .with_guessed_format()
        .map_err(|e| SorterError::decode(path, format!("failed to read header: {}", e)))?
        .decode()
        .map_err(|e| SorterError::decode(path, e))?;

    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return Err(SorterError::decode(path, "image has no pixels"));
    }

    // Shortest edge to ceil(crop_size / crop_pct), then centre crop.
    let resize_size = (crop_size as f32 / CROP_PCT).ceil() as u32;
    let (new_w, new_h) = if w < h {
        (resize_size, ((h as f32 / w as f32) * resize_size as f32).round() as u32)
    } else {
        (((w as f32 / h as f32) * resize_size as f32).round() as u32, resize_size)
    };
    let resized = img.resize_exact(new_w, new_h, image::imageops::FilterType::Triangle);

    let crop_x = new_w.saturating_sub(crop_size) / 2;
    let crop_y = new_h.saturating_sub(crop_size) / 2;
    let rgb = resized.crop_imm(crop_x, crop_y, crop_size, crop_size).to_rgb8();

    let side = crop_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    Ok(tensor)
}

/// ONNX Runtime session used as the classification oracle.
pub struct OnnxOracle {
    session: Session,
    softmax: bool,
}

impl OnnxOracle {
    pub fn new(session: Session, softmax: bool) -> Self {
        Self { session, softmax }
    }
}

impl Oracle for OnnxOracle {
    fn evaluate(&mut self, input: Array4<f32>) -> Result<Vec<f32>> {
        let input_name = self
            .session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| SorterError::Oracle("Model declares no inputs".to_string()))?;

        let input_tensor = Value::from_array(input)
            .map_err(|e| SorterError::Oracle(format!("Failed to create tensor value: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![input_name.as_str() => input_tensor])
            .map_err(|e| SorterError::Oracle(format!("Inference failed: {}", e)))?;

        let output_value = outputs
            .values()
            .next()
            .ok_or_else(|| SorterError::Oracle("Model produced no outputs".to_string()))?;

        let (_, data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| SorterError::Oracle(format!("Failed to extract output tensor: {}", e)))?;

        let scores: Vec<f32> = data.iter().copied().collect();
        Ok(if self.softmax { softmax(&scores) } else { scores })
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|x| x / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn softmax_sums_to_one_and_keeps_order() {
        let probs = softmax(&[1.0, 3.0, 2.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[1] > probs[2] && probs[2] > probs[0]);
    }

    #[test]
    fn preprocess_produces_nchw_tensor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("red.png");
        RgbImage::from_pixel(64, 40, Rgb([255, 0, 0])).save(&path).unwrap();

        let tensor = ImagePreprocessor::new(32).decode(&path).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
        let red = (1.0 - MEAN[0]) / STD[0];
        let green = (0.0 - MEAN[1]) / STD[1];
        assert!((tensor[[0, 0, 16, 16]] - red).abs() < 1e-4);
        assert!((tensor[[0, 1, 16, 16]] - green).abs() < 1e-4);
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = ImagePreprocessor::new(32).decode(&path).unwrap_err();
        assert!(matches!(err, SorterError::Decode { .. }));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let err = ImagePreprocessor::new(32)
            .decode(&dir.path().join("missing.jpg"))
            .unwrap_err();
        assert!(matches!(err, SorterError::Decode { .. }));
    }
}
