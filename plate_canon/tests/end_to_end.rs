mod common;

use common::{frame, source, ListDetector, SplitReader, TagEra};
use plate_canon::{process, CanonConfig, CanonicalPlate, PlatePipeline};

fn keys(plates: &plate_canon::PlateMap) -> Vec<String> {
    plates.keys().map(|plate| plate.to_string()).collect()
}

#[test]
fn one_vehicle_with_misreads_collapses_to_one_plate() {
    let mut frames = Vec::new();
    frames.push(frame(&["ABC1235@1"]));
    for tag in 2..=8 {
        frames.push(frame(&[&format!("abc 1234@{tag}")]));
    }
    frames.push(frame(&[]));
    frames.push(frame(&["ABC1235@10"]));

    let plates = process(
        source(frames),
        ListDetector,
        SplitReader,
        TagEra,
        &CanonConfig::default(),
    );

    assert_eq!(keys(&plates), ["ABC1234"]);
    let record = plates.get_str("ABC1234").unwrap();
    assert_eq!(record.frequency, 9);
    // the component starts with ABC1235, first seen on frame 1
    assert_eq!(record.frame, 1);
    assert_eq!(record.image, b"abc 1234@2");
}

#[test]
fn ocr_confusions_are_repaired_per_position() {
    let frames = vec![
        frame(&["A8C I234@legacy"]),
        frame(&["ABC15S4@legacy"]),
        frame(&["XYZ|9876@split"]),
    ];
    let config = CanonConfig {
        max_hamming_distance: 0,
        ..CanonConfig::default()
    };
    let plates = process(source(frames), ListDetector, SplitReader, TagEra, &config);

    assert_eq!(keys(&plates), ["ABC1234", "ABC1554", "XYZ9876"]);
    assert_eq!(plates.get_str("ABC1234").unwrap().frequency, 1);
}

#[test]
fn current_format_needs_the_era_hint_or_marker() {
    let frames = vec![
        frame(&["ABC1823@current"]),
        frame(&["BRASIL|ABC1823@legacy"]),
        frame(&["ABC1823@legacy"]),
    ];
    let config = CanonConfig {
        max_hamming_distance: 0,
        ..CanonConfig::default()
    };
    let plates = process(source(frames), ListDetector, SplitReader, TagEra, &config);

    assert_eq!(keys(&plates), ["ABC1B23", "ABC1823"]);
    let current = plates.get_str("ABC1B23").unwrap();
    assert_eq!(current.frequency, 2);
    assert_eq!(current.frame, 1);
}

#[test]
fn failing_detector_only_loses_its_frame() {
    let frames = vec![
        frame(&["ABC1234@1"]),
        frame(&["!detector", "ABC1234@2"]),
        frame(&["ABC1234@3"]),
    ];
    let plates = process(
        source(frames),
        ListDetector,
        SplitReader,
        TagEra,
        &CanonConfig::default(),
    );
    assert_eq!(plates.get_str("ABC1234").unwrap().frequency, 2);
}

#[test]
fn video_without_plates_yields_empty_map() {
    let frames = vec![frame(&[]), frame(&["noise@1", "12@2"]), frame(&[])];
    let plates = process(
        source(frames),
        ListDetector,
        SplitReader,
        TagEra,
        &CanonConfig::default(),
    );
    assert!(plates.is_empty());
}

#[test]
fn aborting_mid_stream_clusters_what_was_seen() {
    let mut pipeline =
        PlatePipeline::new(ListDetector, SplitReader, TagEra, CanonConfig::default());
    pipeline.process_frame(1, &frame(&["ABC1234@1"]));
    pipeline.process_frame(2, &frame(&["ABC1235@2"]));
    pipeline.process_frame(3, &frame(&["ABC1234@3"]));

    let partial = pipeline.snapshot();
    assert_eq!(partial.len(), 2);

    let plates = pipeline.finish();
    assert_eq!(keys(&plates), ["ABC1234"]);
    let record = plates.get_str("ABC1234").unwrap();
    assert_eq!(record.frequency, 3);
    assert_eq!(record.image, b"ABC1234@1");
    assert!(plates.contains(&CanonicalPlate::parse("ABC1234").unwrap()));
}
