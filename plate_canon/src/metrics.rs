//! Process-wide Prometheus metrics for the plate pipeline.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, Encoder, Histogram, IntCounter, TextEncoder,
};

lazy_static! {
    pub static ref FRAMES_PROCESSED: IntCounter = register_int_counter!(
        "plates_frames_processed_total",
        "Frames handed to the plate pipeline"
    )
    .unwrap();
    pub static ref CROPS_READ: IntCounter = register_int_counter!(
        "plates_crops_read_total",
        "Detected plate regions passed to OCR"
    )
    .unwrap();
    pub static ref FRAGMENTS_READ: IntCounter = register_int_counter!(
        "plates_fragments_read_total",
        "Text fragments returned by OCR"
    )
    .unwrap();
    pub static ref CORRECTIONS_REJECTED: IntCounter = register_int_counter!(
        "plates_corrections_rejected_total",
        "Crops whose fragments produced no valid plate"
    )
    .unwrap();
    pub static ref OBSERVATIONS_RECORDED: IntCounter = register_int_counter!(
        "plates_observations_recorded_total",
        "Accepted observations recorded by the aggregator"
    )
    .unwrap();
    pub static ref PLATES_MERGED: IntCounter = register_int_counter!(
        "plates_merged_total",
        "Plates folded into a more frequent similar plate"
    )
    .unwrap();
    pub static ref FRAME_SECONDS: Histogram = register_histogram!(
        "plates_frame_seconds",
        "Time spent detecting, reading and recording one frame"
    )
    .unwrap();
}

/// Renders every registered metric in the text exposition format.
pub fn gather_text() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
