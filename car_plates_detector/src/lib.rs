pub mod cli;
pub mod config;
pub mod error;
pub mod plate_detection;
pub mod report;
pub mod telemetry;
pub mod utils;
