//! Canonicalization of licence plates read from video.
//!
//! Raw OCR fragments are normalized, corrected against the legacy
//! (`LLLNNNN`) and current (`LLLNLNN`) plate grammars, counted per plate
//! across a video and finally merged when they differ by a single
//! character.

pub mod aggregate;
pub mod cluster;
pub mod collaborators;
pub mod config;
pub mod confusion;
pub mod error;
pub mod format;
pub mod fragments;
pub mod metrics;
pub mod normalize;
pub mod parallel;
pub mod pipeline;
pub mod plate_map;

pub use aggregate::{Observation, ObservationAggregator};
pub use cluster::{cluster_plates, hamming_distance, PlateGraph};
pub use collaborators::{
    EncodeCrop, EraEstimator, FragmentReader, FrameSource, PlateDetector, VecFrameSource,
};
pub use config::CanonConfig;
pub use error::{CanonError, CollaboratorError};
pub use format::{correct_plate, CanonicalPlate, PlateEra, PlateFormat, PLATE_LEN};
pub use fragments::{read_plate, RawFragment, ERA_MARKER};
pub use normalize::normalize_fragment;
pub use parallel::process_parallel;
pub use pipeline::{observe_frame, process, PlatePipeline};
pub use plate_map::{PlateMap, PlateRecord};
