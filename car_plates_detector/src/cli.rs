//! Command line shared by the plate binaries.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use plate_canon::PlateMap;
use tracing::info;

use crate::config::DetectorConfig;
use crate::report;

#[derive(Debug, Parser)]
#[command(version, about = "Read the licence plates of a video")]
pub struct Args {
    /// Video file to read.
    pub video: PathBuf,

    /// TOML configuration; defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the JSON report here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Frame workers, overriding `[canon] workers`.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Log as JSON lines.
    #[arg(long)]
    pub json: bool,

    /// Print the Prometheus metrics to stderr when done.
    #[arg(long)]
    pub metrics: bool,

    /// Pyroscope server to profile to.
    #[arg(long)]
    pub pyroscope_url: Option<String>,
}

impl Args {
    pub fn load_config(&self) -> anyhow::Result<DetectorConfig> {
        let mut config = match &self.config {
            Some(path) => DetectorConfig::load(path)
                .with_context(|| format!("cannot load config {}", path.display()))?,
            None => DetectorConfig::default(),
        };
        if let Some(workers) = self.workers {
            config.canon.workers = workers;
        }
        config.canon.validate()?;
        Ok(config)
    }
}

/// Writes the report and picks the exit code: failure when no plate was found.
pub fn write_report(plates: &PlateMap, out: Option<&Path>) -> anyhow::Result<ExitCode> {
    let text = report::render(plates, true).context("cannot render report")?;
    match out {
        Some(path) => {
            fs::write(path, &text)
                .with_context(|| format!("cannot write report {}", path.display()))?;
            info!(report = %path.display(), plates = plates.len(), "report written");
        }
        None => println!("{text}"),
    }

    if plates.is_empty() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use plate_canon::{CanonicalPlate, PlateRecord};

    use super::*;

    #[test]
    fn flags_override_the_config() {
        let args = Args::parse_from(["plates", "video.mp4", "--workers", "3", "--json"]);
        assert_eq!(args.video, PathBuf::from("video.mp4"));
        assert!(args.json);
        assert!(!args.metrics);

        let config = args.load_config().unwrap();
        assert_eq!(config.canon.workers, 3);
    }

    #[test]
    fn zero_workers_is_refused() {
        let args = Args::parse_from(["plates", "video.mp4", "--workers", "0"]);
        assert!(args.load_config().is_err());
    }

    #[test]
    fn report_is_written_to_the_given_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut plates = PlateMap::new();
        plates.insert(
            CanonicalPlate::parse("ABC1234").unwrap(),
            PlateRecord::new(3, vec![1, 2]),
        );
        write_report(&plates, Some(&path)).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("\"ABC1234\""));

        write_report(&PlateMap::new(), Some(&path)).unwrap();
        assert!(fs::read_to_string(&path)
            .unwrap()
            .contains(report::NO_PLATES));
    }
}
