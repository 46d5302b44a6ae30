use tracing::debug;

use crate::format::CanonicalPlate;
use crate::metrics;
use crate::plate_map::{PlateMap, PlateRecord};

/// One accepted detection event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub plate: CanonicalPlate,
    pub frame: u64,
    pub image: Vec<u8>,
}

/// Streaming accumulator keyed by canonical plate, alive for one video.
///
/// The first observation of a plate fixes its frame and image; later ones
/// only raise the frequency. Entries are never removed.
#[derive(Debug, Default)]
pub struct ObservationAggregator {
    plates: PlateMap,
}

impl ObservationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation and returns the plate's frequency after it.
    pub fn record(&mut self, plate: CanonicalPlate, frame: u64, image: Vec<u8>) -> u32 {
        if let Some(frequency) = self.bump(&plate) {
            return frequency;
        }
        debug!(plate = %plate, frame, "new plate");
        metrics::OBSERVATIONS_RECORDED.inc();
        self.plates.insert(plate, PlateRecord::new(frame, image));
        1
    }

    pub fn record_observation(&mut self, observation: Observation) -> u32 {
        self.record(observation.plate, observation.frame, observation.image)
    }

    /// Counts one more observation of an already known plate.
    ///
    /// Returns `None` when the plate has not been seen yet, so that callers
    /// can defer building the image until it is actually needed.
    pub fn bump(&mut self, plate: &CanonicalPlate) -> Option<u32> {
        let record = self.plates.get_mut(plate)?;
        record.frequency += 1;
        metrics::OBSERVATIONS_RECORDED.inc();
        Some(record.frequency)
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    pub fn contains(&self, plate: &CanonicalPlate) -> bool {
        self.plates.contains(plate)
    }

    pub fn get(&self, plate: &CanonicalPlate) -> Option<&PlateRecord> {
        self.plates.get(plate)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> PlateMap {
        self.plates.clone()
    }

    /// Hands the accumulated mapping over to the clustering pass.
    pub fn drain(self) -> PlateMap {
        self.plates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plate(text: &str) -> CanonicalPlate {
        CanonicalPlate::parse(text).unwrap()
    }

    #[test]
    fn repeated_plate_counts_and_keeps_first_frame_and_image() {
        let mut aggregator = ObservationAggregator::new();
        for frame in 1..=5u64 {
            aggregator.record(plate("ABC1234"), frame * 10, vec![frame as u8]);
        }

        let record = aggregator.get(&plate("ABC1234")).unwrap();
        assert_eq!(record.frequency, 5);
        assert_eq!(record.frame, 10);
        assert_eq!(record.image, vec![1]);
    }

    #[test]
    fn record_returns_running_frequency() {
        let mut aggregator = ObservationAggregator::new();
        assert_eq!(aggregator.record(plate("ABC1234"), 1, vec![]), 1);
        assert_eq!(aggregator.record(plate("ABC1234"), 2, vec![]), 2);
        assert_eq!(aggregator.record(plate("XYZ9876"), 3, vec![]), 1);
        assert_eq!(aggregator.len(), 2);
    }

    #[test]
    fn bump_ignores_unknown_plates() {
        let mut aggregator = ObservationAggregator::new();
        assert_eq!(aggregator.bump(&plate("ABC1234")), None);
        assert!(aggregator.is_empty());

        aggregator.record_observation(Observation {
            plate: plate("ABC1234"),
            frame: 4,
            image: vec![9, 9],
        });
        assert_eq!(aggregator.bump(&plate("ABC1234")), Some(2));
        assert_eq!(aggregator.get(&plate("ABC1234")).unwrap().frame, 4);
    }

    #[test]
    fn drain_preserves_first_seen_order() {
        let mut aggregator = ObservationAggregator::new();
        aggregator.record(plate("XYZ9876"), 1, vec![]);
        aggregator.record(plate("ABC1234"), 2, vec![]);
        aggregator.record(plate("XYZ9876"), 3, vec![]);

        let snapshot = aggregator.snapshot();
        let drained = aggregator.drain();
        assert_eq!(snapshot, drained);
        let keys: Vec<&str> = drained.keys().map(CanonicalPlate::as_str).collect();
        assert_eq!(keys, ["XYZ9876", "ABC1234"]);
    }
}
