use std::process::ExitCode;

use anyhow::Context;
use car_plates_detector::cli::{write_report, Args};
use car_plates_detector::error::DetectorError;
use car_plates_detector::plate_detection::build_collaborators;
use car_plates_detector::plate_detection::video_reader::VideoReader;
use car_plates_detector::telemetry::{self, Profiler};
use clap::Parser;
use plate_canon::{process, process_parallel};
use tracing::info;

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    telemetry::init_tracing(args.json);
    let config = args.load_config()?;
    let profiler = Profiler::start(args.pyroscope_url.as_deref(), "plates_offline")?;

    let video = VideoReader::open(&args.video, config.video.samples_per_second)
        .with_context(|| format!("cannot read {}", args.video.display()))?;
    info!(
        video = %args.video.display(),
        step = video.step(),
        workers = config.canon.workers,
        "reading plates"
    );

    let plates = if config.canon.workers == 1 {
        let (detector, ocr, era) =
            build_collaborators(&config).context("cannot load the plate models")?;
        process(video, detector, ocr, era, &config.canon)
    } else {
        process_parallel(
            video,
            |_| build_collaborators(&config).map_err(DetectorError::into_setup),
            &config.canon,
        )?
    };

    profiler.stop();
    if args.metrics {
        telemetry::dump_metrics()?;
    }
    write_report(&plates, args.out.as_deref())
}
