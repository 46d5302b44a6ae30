pub mod blue_strip;
pub mod dnn_ocr;
pub mod object_detector;
pub mod plate_aggregator;
pub mod plate_reader;
pub mod video_reader;

use opencv::core::{Rect, Vector};
use opencv::imgcodecs::imencode;
use opencv::prelude::Mat;
use plate_canon::{CollaboratorError, EncodeCrop};

use crate::config::DetectorConfig;
use crate::error::DetectorError;
use blue_strip::BlueStripEstimator;
use dnn_ocr::DnnOcrReader;
use object_detector::ObjectDetector;

/// A sampled video frame and its 1-based position in the video.
#[derive(Clone, Debug)]
pub struct IndexedFrame {
    pub index: u64,
    pub image: Mat,
}

/// A detected plate region, copied out of its frame.
#[derive(Clone, Debug)]
pub struct PlateCrop {
    pub image: Mat,
    /// Region in frame coordinates.
    pub bbox: Rect,
}

impl EncodeCrop for PlateCrop {
    fn encode(&self) -> Result<Vec<u8>, CollaboratorError> {
        encode_png(&self.image).map_err(DetectorError::into_encode)
    }
}

/// Loads the detector model, the OCR engine and the era heuristic.
pub fn build_collaborators(
    config: &DetectorConfig,
) -> Result<(ObjectDetector, DnnOcrReader, BlueStripEstimator), DetectorError> {
    let detector = ObjectDetector::plate_detector(&config.detector)?;
    let ocr = DnnOcrReader::new(&config.ocr)?;
    let era = BlueStripEstimator::new(config.era.clone());
    Ok((detector, ocr, era))
}

pub fn encode_png(image: &Mat) -> Result<Vec<u8>, DetectorError> {
    let mut buffer = Vector::<u8>::new();
    if !imencode(".png", image, &mut buffer, &Vector::<i32>::new())? {
        return Err(DetectorError::OpenCv(opencv::Error::new(
            opencv::core::StsError,
            "png encoder refused the image".to_string(),
        )));
    }
    Ok(buffer.to_vec())
}
