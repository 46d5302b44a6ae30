//! In-memory collaborators shared by the integration tests.
//!
//! A frame is a list of crops. A crop is written `TEXT@TAG`: the OCR reads
//! `TEXT`, split into fragments on `|`, and the encoded image is the whole
//! crop string, so tests can tell which sighting an image came from.

#![allow(dead_code)]

use plate_canon::{
    CollaboratorError, EncodeCrop, EraEstimator, FragmentReader, PlateDetector, PlateEra,
    RawFragment, VecFrameSource,
};

pub type Frame = Vec<String>;

pub struct TextCrop(pub String);

impl TextCrop {
    fn text(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }
}

impl EncodeCrop for TextCrop {
    fn encode(&self) -> Result<Vec<u8>, CollaboratorError> {
        Ok(self.0.as_bytes().to_vec())
    }
}

pub struct ListDetector;

impl PlateDetector<Frame> for ListDetector {
    type Crop = TextCrop;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<TextCrop>, CollaboratorError> {
        if frame.iter().any(|crop| crop == "!detector") {
            return Err(CollaboratorError::detector("model crashed"));
        }
        Ok(frame.iter().cloned().map(TextCrop).collect())
    }
}

pub struct SplitReader;

impl FragmentReader<TextCrop> for SplitReader {
    fn read(&mut self, crop: &TextCrop) -> Result<Vec<RawFragment>, CollaboratorError> {
        Ok(crop
            .text()
            .split('|')
            .map(|text| RawFragment::new(text, 0.9))
            .collect())
    }
}

/// Crops tagged `current` get the current era hint.
pub struct TagEra;

impl EraEstimator<TextCrop> for TagEra {
    fn estimate(&self, crop: &TextCrop) -> PlateEra {
        PlateEra::from(crop.0.ends_with("@current"))
    }
}

pub fn frame(crops: &[&str]) -> Frame {
    crops.iter().map(|crop| crop.to_string()).collect()
}

pub fn source(frames: Vec<Frame>) -> VecFrameSource<Frame> {
    VecFrameSource::new(frames)
}
