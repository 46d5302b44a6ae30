use std::sync::{Arc, Mutex, MutexGuard};

use plate_canon::ObservationAggregator;
use rusted_pipe::channels::read_channel::InputGenerator;
use rusted_pipe::channels::typed_read_channel::ReadChannel1;
use rusted_pipe::graph::processor::TerminalProcessor;
use rusted_pipe::RustedPipeError;
use tracing::debug;

use super::plate_reader::FrameObservations;

pub type SharedAggregator = Arc<Mutex<ObservationAggregator>>;

/// Locks the aggregator, recovering it if a writer panicked mid-update.
pub fn lock(plates: &SharedAggregator) -> MutexGuard<'_, ObservationAggregator> {
    match plates.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Terminal node of the graph and the only writer of the aggregator.
pub struct PlateAggregator {
    plates: SharedAggregator,
}

impl PlateAggregator {
    pub fn new() -> Self {
        Self {
            plates: Arc::new(Mutex::new(ObservationAggregator::new())),
        }
    }

    /// Handle for reading the plates once the graph has stopped.
    pub fn plates(&self) -> SharedAggregator {
        Arc::clone(&self.plates)
    }

    pub fn record(&mut self, frame: FrameObservations) {
        let mut plates = lock(&self.plates);
        for observation in frame.observations {
            let frequency = plates.record_observation(observation);
            debug!(frame = frame.index, frequency, "observation recorded");
        }
    }
}

impl Default for PlateAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalProcessor for PlateAggregator {
    type INPUT = ReadChannel1<FrameObservations>;
    fn handle(
        &mut self,
        mut input: <Self::INPUT as InputGenerator>::INPUT,
    ) -> Result<(), RustedPipeError> {
        if let Some(packet) = input.c1_owned() {
            self.record(packet.data);
        }
        Ok(())
    }
}
