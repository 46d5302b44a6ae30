//! Interfaces to the external video, detection and OCR collaborators.
//!
//! The core only sees these traits. Implementations backed by real models
//! live with the binaries; tests use in-memory ones.

use crate::error::CollaboratorError;
use crate::format::PlateEra;
use crate::fragments::RawFragment;

/// Ordered source of frames. Indices start at 1 and only ever grow; a
/// source may skip indices when it samples the video.
pub trait FrameSource {
    type Frame;

    /// `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<(u64, Self::Frame)>, CollaboratorError>;
}

/// Finds candidate plate regions in a frame.
pub trait PlateDetector<F> {
    type Crop: EncodeCrop;

    fn detect(&mut self, frame: &F) -> Result<Vec<Self::Crop>, CollaboratorError>;
}

/// OCR over one cropped region.
pub trait FragmentReader<C> {
    fn read(&mut self, crop: &C) -> Result<Vec<RawFragment>, CollaboratorError>;
}

/// Guesses from the pixels alone whether a crop is a current-format plate.
pub trait EraEstimator<C> {
    fn estimate(&self, crop: &C) -> PlateEra;
}

/// Still-image encoding of a crop, kept as the plate's representative image.
pub trait EncodeCrop {
    fn encode(&self) -> Result<Vec<u8>, CollaboratorError>;
}

/// Frame source over an in-memory list, numbering frames from 1.
#[derive(Debug)]
pub struct VecFrameSource<F> {
    frames: std::vec::IntoIter<F>,
    next_index: u64,
}

impl<F> VecFrameSource<F> {
    pub fn new(frames: Vec<F>) -> Self {
        Self {
            frames: frames.into_iter(),
            next_index: 1,
        }
    }
}

impl<F> FrameSource for VecFrameSource<F> {
    type Frame = F;

    fn next_frame(&mut self) -> Result<Option<(u64, F)>, CollaboratorError> {
        Ok(self.frames.next().map(|frame| {
            let index = self.next_index;
            self.next_index += 1;
            (index, frame)
        }))
    }
}
