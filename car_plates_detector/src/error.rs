use std::path::PathBuf;

use plate_canon::CollaboratorError;

/// Failures of the OpenCV and Tesseract backed collaborators.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("tesseract: {reason}")]
    Tesseract { reason: String },

    #[error("config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("cannot open video {}", .path.display())]
    VideoOpen { path: PathBuf },
}

impl DetectorError {
    pub fn tesseract(reason: impl std::fmt::Debug) -> Self {
        Self::Tesseract {
            reason: format!("{reason:?}"),
        }
    }

    /// Maps the error onto the collaborator seam of the canonicalization core.
    pub fn into_source(self) -> CollaboratorError {
        CollaboratorError::frame_source(self)
    }

    pub fn into_detector(self) -> CollaboratorError {
        CollaboratorError::detector(self)
    }

    pub fn into_ocr(self) -> CollaboratorError {
        CollaboratorError::ocr(self)
    }

    pub fn into_encode(self) -> CollaboratorError {
        CollaboratorError::encode(self)
    }

    pub fn into_setup(self) -> CollaboratorError {
        CollaboratorError::setup(self)
    }
}
