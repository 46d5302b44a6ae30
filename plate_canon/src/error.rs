use std::fmt::Display;

/// Errors raised by the canonicalization core itself.
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    #[error("hamming distance needs equal lengths, got {left} and {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("a pipeline worker panicked")]
    WorkerPanicked,

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Failures reported by the external collaborators (frame source, detector,
/// OCR, crop encoder). The pipeline never propagates these: they become an
/// empty frame, an empty crop or the end of the stream.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("frame source failed: {reason}")]
    Source { reason: String },

    #[error("plate detector failed: {reason}")]
    Detector { reason: String },

    #[error("ocr failed: {reason}")]
    Ocr { reason: String },

    #[error("crop encoding failed: {reason}")]
    Encode { reason: String },

    #[error("collaborator setup failed: {reason}")]
    Setup { reason: String },
}

impl CollaboratorError {
    pub fn frame_source(reason: impl Display) -> Self {
        Self::Source {
            reason: reason.to_string(),
        }
    }

    pub fn detector(reason: impl Display) -> Self {
        Self::Detector {
            reason: reason.to_string(),
        }
    }

    pub fn ocr(reason: impl Display) -> Self {
        Self::Ocr {
            reason: reason.to_string(),
        }
    }

    pub fn encode(reason: impl Display) -> Self {
        Self::Encode {
            reason: reason.to_string(),
        }
    }

    pub fn setup(reason: impl Display) -> Self {
        Self::Setup {
            reason: reason.to_string(),
        }
    }
}
