//! TOML configuration of the detector binaries. Every field has a default,
//! so an empty file (or no file at all) is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use plate_canon::CanonConfig;
use serde::Deserialize;

use crate::error::DetectorError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub video: VideoConfig,
    pub detector: PlateModelConfig,
    pub ocr: OcrConfig,
    pub era: EraConfig,
    pub canon: CanonConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Frames kept per second of video.
    pub samples_per_second: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            samples_per_second: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlateModelConfig {
    /// YOLOv5 ONNX export of the plate model.
    pub model: PathBuf,
    pub use_gpu: bool,
    /// Square network input, in pixels.
    pub input_size: i32,
    pub confidence_threshold: f32,
    pub class_threshold: f32,
    /// Boxes scoring below this are discarded before suppression.
    pub nms_score_threshold: f32,
    pub nms_threshold: f32,
}

impl Default for PlateModelConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/plate_best.onnx"),
            use_gpu: false,
            input_size: 640,
            confidence_threshold: 0.4,
            class_threshold: 0.25,
            nms_score_threshold: 0.5,
            nms_threshold: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory holding the `.traineddata` files.
    pub data_path: PathBuf,
    pub language: String,
    /// Tesseract page segmentation mode. 6 reads a block, so the header and
    /// the plate characters come back as separate lines.
    pub page_seg_mode: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("models"),
            language: "eng".to_string(),
            page_seg_mode: 6,
        }
    }
}

/// Blue header strip test of current-format plates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EraConfig {
    /// Share of the crop height, from the top, that is inspected.
    pub top_fraction: f64,
    /// HSV bounds, OpenCV scale (hue 0-180).
    pub hsv_lower: [f64; 3],
    pub hsv_upper: [f64; 3],
    /// Blue pixel ratio above which the crop is current format.
    pub min_ratio: f64,
}

impl Default for EraConfig {
    fn default() -> Self {
        Self {
            top_fraction: 0.25,
            hsv_lower: [110.0, 160.0, 65.0],
            hsv_upper: [130.0, 255.0, 255.0],
            min_ratio: 0.03,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Pace of the video source node.
    pub fps: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self { fps: 20 }
    }
}

impl DetectorConfig {
    pub fn load(path: &Path) -> Result<Self, DetectorError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text).map_err(|reason| DetectorError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn from_toml(text: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        self.canon.validate().map_err(|e| e.to_string())?;
        if self.video.samples_per_second <= 0.0 {
            return Err("video.samples_per_second must be positive".to_string());
        }
        if self.detector.input_size <= 0 || self.detector.input_size % 32 != 0 {
            return Err("detector.input_size must be a positive multiple of 32".to_string());
        }
        if !(0.0..=1.0).contains(&self.era.top_fraction) || self.era.top_fraction == 0.0 {
            return Err("era.top_fraction must be in (0, 1]".to_string());
        }
        if self.realtime.fps == 0 {
            return Err("realtime.fps must be at least 1".to_string());
        }
        Ok(())
    }
}
