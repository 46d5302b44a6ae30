use std::process::ExitCode;

use anyhow::{anyhow, Context};
use car_plates_detector::cli::{write_report, Args};
use car_plates_detector::config::DetectorConfig;
use car_plates_detector::plate_detection::build_collaborators;
use car_plates_detector::plate_detection::plate_aggregator::{
    self, PlateAggregator, SharedAggregator,
};
use car_plates_detector::plate_detection::plate_reader::PlateReader;
use car_plates_detector::plate_detection::video_reader::{VideoReader, VideoSource};
use car_plates_detector::telemetry::{self, Profiler};
use clap::Parser;
use crossbeam::channel::{self, Receiver};
use plate_canon::cluster_plates;
use rusted_pipe::buffers::synchronizers::timestamp::TimestampSynchronizer;
use rusted_pipe::graph::build::{link, Graph};
use rusted_pipe::graph::metrics::Metrics;
use rusted_pipe::graph::processor::{Node, SourceNode, TerminalNode};
use tracing::info;

struct PlateGraph {
    graph: Graph,
    plates: SharedAggregator,
    done: Receiver<u64>,
}

fn setup_graph(video: VideoReader, config: &DetectorConfig) -> anyhow::Result<PlateGraph> {
    let (detector, ocr, era) =
        build_collaborators(config).context("cannot load the plate models")?;
    let (done_s, done_r) = channel::bounded(1);

    // Node that reads the sampled frames from the video
    let mut video_input_node = SourceNode::create_common(
        "video_input".to_string(),
        Box::new(VideoSource::new(video, config.realtime.fps, done_s)),
    );

    let timestamp_synch = TimestampSynchronizer::default();

    // Node that detects, reads and corrects the plates of each frame
    let mut plate_reader_node = Node::create_common(
        "plate_reader".to_string(),
        Box::new(PlateReader::new(detector, ocr, era)),
        false,
        1000,
        1000,
        Box::new(timestamp_synch.clone()),
        true,
    );

    // Single writer of the plate counts
    let aggregator = PlateAggregator::new();
    let plates = aggregator.plates();
    let aggregator_node = TerminalNode::create_common(
        "plate_aggregator".to_string(),
        Box::new(aggregator),
        false,
        1000,
        1000,
        Box::new(timestamp_synch.clone()),
        true,
    );

    // Frame -> Plate reader
    link(
        video_input_node.write_channel.writer.c1(),
        plate_reader_node.read_channel.channels.write().unwrap().c1(),
    )
    .map_err(|e| anyhow!("cannot link the video to the plate reader: {e:?}"))?;

    // Plate reader -> Aggregator
    link(
        plate_reader_node.write_channel.writer.c1(),
        aggregator_node.read_channel.channels.write().unwrap().c1(),
    )
    .map_err(|e| anyhow!("cannot link the plate reader to the aggregator: {e:?}"))?;

    let mut graph = Graph::new(Metrics::no_metrics());
    graph.start_terminal_node(aggregator_node);
    graph.start_node(plate_reader_node);
    graph.start_source_node(video_input_node);

    Ok(PlateGraph {
        graph,
        plates,
        done: done_r,
    })
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    telemetry::init_tracing(args.json);
    let config = args.load_config()?;
    let profiler = Profiler::start(args.pyroscope_url.as_deref(), "plates_realtime")?;

    let video = VideoReader::open(&args.video, config.video.samples_per_second)
        .with_context(|| format!("cannot read {}", args.video.display()))?;
    let PlateGraph {
        mut graph,
        plates,
        done,
    } = setup_graph(video, &config)?;

    info!("graph started, waiting for the video to end");
    let frames = done.recv().unwrap_or(0);
    graph.stop(true, None);
    info!(frames, "graph stopped");

    let accumulated = plate_aggregator::lock(&plates).snapshot();
    let plates = cluster_plates(accumulated, config.canon.max_hamming_distance);

    profiler.stop();
    if args.metrics {
        telemetry::dump_metrics()?;
    }
    write_report(&plates, args.out.as_deref())
}
