//! Sequential frame-by-frame driver: detect, read, correct, record, and
//! cluster once the stream ends.

use tracing::{debug, info, warn};

use crate::aggregate::{Observation, ObservationAggregator};
use crate::cluster::cluster_plates;
use crate::collaborators::{EncodeCrop, EraEstimator, FragmentReader, FrameSource, PlateDetector};
use crate::config::CanonConfig;
use crate::format::CanonicalPlate;
use crate::fragments::read_plate;
use crate::metrics;
use crate::plate_map::PlateMap;

/// Runs the detector on one frame. A failing detector yields no crops.
pub fn detect_crops<F, D>(detector: &mut D, index: u64, frame: &F) -> Vec<D::Crop>
where
    D: PlateDetector<F>,
{
    match detector.detect(frame) {
        Ok(crops) => {
            if crops.is_empty() {
                debug!(frame = index, "no plates detected");
            }
            crops
        }
        Err(e) => {
            warn!(frame = index, error = %e, "detector failed, treating frame as empty");
            Vec::new()
        }
    }
}

/// Reads the canonical plate of one crop, if any. A failing OCR engine
/// yields no fragments.
pub fn read_crop<C, R, E>(reader: &mut R, era: &E, index: u64, crop: &C) -> Option<CanonicalPlate>
where
    R: FragmentReader<C>,
    E: EraEstimator<C>,
{
    let hint = era.estimate(crop);
    let fragments = reader.read(crop).unwrap_or_else(|e| {
        warn!(frame = index, error = %e, "ocr failed, treating crop as empty");
        Vec::new()
    });
    metrics::CROPS_READ.inc();
    metrics::FRAGMENTS_READ.inc_by(fragments.len() as u64);

    let plate = read_plate(&fragments, hint);
    match &plate {
        Some(plate) => debug!(frame = index, plate = %plate, era = ?hint, "plate read"),
        None => {
            metrics::CORRECTIONS_REJECTED.inc();
            debug!(frame = index, fragments = fragments.len(), "no valid plate in crop");
        }
    }
    plate
}

/// Detects and reads every crop of a frame, encoding the image of each
/// accepted crop. Used where the writer is not the one reading.
pub fn observe_frame<F, D, R, E>(
    detector: &mut D,
    reader: &mut R,
    era: &E,
    index: u64,
    frame: &F,
) -> Vec<Observation>
where
    D: PlateDetector<F>,
    R: FragmentReader<D::Crop>,
    E: EraEstimator<D::Crop>,
{
    metrics::FRAMES_PROCESSED.inc();
    let mut observations = Vec::new();
    for crop in detect_crops(detector, index, frame) {
        let Some(plate) = read_crop(reader, era, index, &crop) else {
            continue;
        };
        match crop.encode() {
            Ok(image) => observations.push(Observation {
                plate,
                frame: index,
                image,
            }),
            Err(e) => warn!(frame = index, plate = %plate, error = %e, "dropping observation"),
        }
    }
    observations
}

/// Owns the collaborators and the aggregator for one video.
pub struct PlatePipeline<D, R, E> {
    detector: D,
    reader: R,
    era: E,
    config: CanonConfig,
    aggregator: ObservationAggregator,
    frames: u64,
}

impl<D, R, E> PlatePipeline<D, R, E> {
    pub fn new(detector: D, reader: R, era: E, config: CanonConfig) -> Self {
        Self {
            detector,
            reader,
            era,
            config,
            aggregator: ObservationAggregator::new(),
            frames: 0,
        }
    }

    /// Processes one frame and returns how many observations it recorded.
    ///
    /// Frames must arrive in index order. A crop image is encoded only for
    /// the first observation of its plate.
    pub fn process_frame<F>(&mut self, index: u64, frame: &F) -> usize
    where
        D: PlateDetector<F>,
        R: FragmentReader<D::Crop>,
        E: EraEstimator<D::Crop>,
    {
        let timer = metrics::FRAME_SECONDS.start_timer();
        metrics::FRAMES_PROCESSED.inc();
        self.frames += 1;

        let mut recorded = 0;
        for crop in detect_crops(&mut self.detector, index, frame) {
            let Some(plate) = read_crop(&mut self.reader, &self.era, index, &crop) else {
                continue;
            };
            if self.aggregator.bump(&plate).is_some() {
                recorded += 1;
                continue;
            }
            match crop.encode() {
                Ok(image) => {
                    self.aggregator.record(plate, index, image);
                    recorded += 1;
                }
                Err(e) => warn!(frame = index, plate = %plate, error = %e, "dropping observation"),
            }
        }

        timer.observe_duration();
        recorded
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Current, unclustered state.
    pub fn snapshot(&self) -> PlateMap {
        self.aggregator.snapshot()
    }

    /// Ends the stream and clusters whatever has been accumulated.
    pub fn finish(self) -> PlateMap {
        let plates = self.aggregator.drain();
        info!(
            frames = self.frames,
            distinct_plates = plates.len(),
            "stream finished"
        );
        cluster_plates(plates, self.config.max_hamming_distance)
    }
}

/// Processes a whole frame stream sequentially and returns the clustered
/// plate map. A failing source ends the stream.
pub fn process<S, D, R, E>(
    mut source: S,
    detector: D,
    reader: R,
    era: E,
    config: &CanonConfig,
) -> PlateMap
where
    S: FrameSource,
    D: PlateDetector<S::Frame>,
    R: FragmentReader<D::Crop>,
    E: EraEstimator<D::Crop>,
{
    let mut pipeline = PlatePipeline::new(detector, reader, era, config.clone());
    loop {
        match source.next_frame() {
            Ok(Some((index, frame))) => {
                pipeline.process_frame(index, &frame);
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "frame source failed, ending stream");
                break;
            }
        }
    }
    pipeline.finish()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::collaborators::VecFrameSource;
    use crate::error::CollaboratorError;
    use crate::format::PlateEra;
    use crate::fragments::RawFragment;

    #[derive(Clone)]
    struct Crop(&'static str);

    struct CountingCrop<'a> {
        text: &'static str,
        encodes: &'a Cell<usize>,
    }

    impl EncodeCrop for Crop {
        fn encode(&self) -> Result<Vec<u8>, CollaboratorError> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    impl EncodeCrop for CountingCrop<'_> {
        fn encode(&self) -> Result<Vec<u8>, CollaboratorError> {
            self.encodes.set(self.encodes.get() + 1);
            Ok(vec![])
        }
    }

    struct Frames;

    impl PlateDetector<Vec<&'static str>> for Frames {
        type Crop = Crop;

        fn detect(&mut self, frame: &Vec<&'static str>) -> Result<Vec<Crop>, CollaboratorError> {
            Ok(frame.iter().copied().map(Crop).collect())
        }
    }

    struct Ocr;

    impl FragmentReader<Crop> for Ocr {
        fn read(&mut self, crop: &Crop) -> Result<Vec<RawFragment>, CollaboratorError> {
            if crop.0 == "broken" {
                return Err(CollaboratorError::ocr("unreadable"));
            }
            Ok(crop.0.split('|').map(|text| RawFragment::new(text, 1.0)).collect())
        }
    }

    impl<'a> FragmentReader<CountingCrop<'a>> for Ocr {
        fn read(&mut self, crop: &CountingCrop<'a>) -> Result<Vec<RawFragment>, CollaboratorError> {
            Ok(vec![RawFragment::new(crop.text, 1.0)])
        }
    }

    struct Legacy;

    impl<C> EraEstimator<C> for Legacy {
        fn estimate(&self, _crop: &C) -> PlateEra {
            PlateEra::Legacy
        }
    }

    #[test]
    fn process_frame_counts_recorded_observations() {
        let mut pipeline = PlatePipeline::new(Frames, Ocr, Legacy, CanonConfig::default());
        assert_eq!(pipeline.process_frame(1, &vec!["ABC1234", "noise", "XYZ|9876"]), 2);
        assert_eq!(pipeline.process_frame(2, &vec!["broken"]), 0);
        assert_eq!(pipeline.process_frame(3, &Vec::<&'static str>::new()), 0);
        assert_eq!(pipeline.frames_processed(), 3);

        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.get_str("XYZ9876").unwrap().image, b"XYZ|9876");
    }

    #[test]
    fn image_is_encoded_only_for_first_sighting() {
        struct Counting;
        impl<'a> PlateDetector<&'a Cell<usize>> for Counting {
            type Crop = CountingCrop<'a>;
            fn detect(
                &mut self,
                encodes: &&'a Cell<usize>,
            ) -> Result<Vec<CountingCrop<'a>>, CollaboratorError> {
                Ok(vec![CountingCrop {
                    text: "ABC1234",
                    encodes: *encodes,
                }])
            }
        }

        let encodes = Cell::new(0);
        let mut pipeline = PlatePipeline::new(Counting, Ocr, Legacy, CanonConfig::default());
        for index in 1..=4 {
            pipeline.process_frame(index, &&encodes);
        }
        assert_eq!(encodes.get(), 1);
        assert_eq!(pipeline.finish().get_str("ABC1234").unwrap().frequency, 4);
    }

    #[test]
    fn finish_clusters_partial_stream() {
        let mut pipeline = PlatePipeline::new(Frames, Ocr, Legacy, CanonConfig::default());
        pipeline.process_frame(1, &vec!["ABC1235"]);
        pipeline.process_frame(2, &vec!["ABC1234"]);
        pipeline.process_frame(3, &vec!["ABC1234"]);

        let plates = pipeline.finish();
        assert_eq!(plates.len(), 1);
        let record = plates.get_str("ABC1234").unwrap();
        assert_eq!(record.frequency, 3);
        assert_eq!(record.frame, 1);
    }

    #[test]
    fn observe_frame_encodes_every_accepted_crop() {
        let frame = vec!["ABC1234", "ABC1234", "??"];
        let observations = observe_frame(&mut Frames, &mut Ocr, &Legacy, 7, &frame);
        assert_eq!(observations.len(), 2);
        assert!(observations.iter().all(|o| o.frame == 7 && o.image == b"ABC1234"));
    }

    #[test]
    fn failing_source_ends_stream() {
        struct Flaky(u64);
        impl FrameSource for Flaky {
            type Frame = Vec<&'static str>;
            fn next_frame(&mut self) -> Result<Option<(u64, Self::Frame)>, CollaboratorError> {
                self.0 += 1;
                match self.0 {
                    1 | 2 => Ok(Some((self.0, vec!["ABC1234"]))),
                    _ => Err(CollaboratorError::frame_source("decoder crashed")),
                }
            }
        }

        let plates = process(Flaky(0), Frames, Ocr, Legacy, &CanonConfig::default());
        assert_eq!(plates.get_str("ABC1234").unwrap().frequency, 2);
    }

    #[test]
    fn process_over_vec_source() {
        let source = VecFrameSource::new(vec![vec!["ABC1234"], vec![], vec!["ABC|1234"]]);
        let plates = process(source, Frames, Ocr, Legacy, &CanonConfig::default());
        let record = plates.get_str("ABC1234").unwrap();
        assert_eq!(record.frequency, 2);
        assert_eq!(record.frame, 1);
    }
}
