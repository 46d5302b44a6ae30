use plate_canon::{observe_frame, Observation};
use rusted_pipe::channels::read_channel::InputGenerator;
use rusted_pipe::channels::typed_read_channel::ReadChannel1;
use rusted_pipe::channels::typed_write_channel::WriteChannel1;
use rusted_pipe::graph::processor::{Processor, ProcessorWriter};
use rusted_pipe::RustedPipeError;
use tracing::{debug, error};

use super::blue_strip::BlueStripEstimator;
use super::dnn_ocr::DnnOcrReader;
use super::object_detector::ObjectDetector;
use super::IndexedFrame;

/// Accepted plates of one sampled frame.
#[derive(Clone, Debug, Default)]
pub struct FrameObservations {
    pub index: u64,
    pub observations: Vec<Observation>,
}

/// Graph node that detects, reads and corrects the plates of each frame.
pub struct PlateReader {
    detector: ObjectDetector,
    ocr: DnnOcrReader,
    era: BlueStripEstimator,
}

impl PlateReader {
    pub fn new(detector: ObjectDetector, ocr: DnnOcrReader, era: BlueStripEstimator) -> Self {
        Self { detector, ocr, era }
    }
}

impl Processor for PlateReader {
    type INPUT = ReadChannel1<IndexedFrame>;
    type OUTPUT = WriteChannel1<FrameObservations>;
    fn handle(
        &mut self,
        mut input: <Self::INPUT as InputGenerator>::INPUT,
        mut output: ProcessorWriter<Self::OUTPUT>,
    ) -> Result<(), RustedPipeError> {
        let Some(frame_packet) = input.c1_owned() else {
            return Ok(());
        };
        let frame = frame_packet.data;
        debug!(
            frame = frame.index,
            version = frame_packet.version.timestamp_ns,
            "reading plates"
        );

        let observations = observe_frame(
            &mut self.detector,
            &mut self.ocr,
            &self.era,
            frame.index,
            &frame.image,
        );
        let result = FrameObservations {
            index: frame.index,
            observations,
        };
        if let Err(e) = output.writer.c1().write(result, &frame_packet.version) {
            error!(frame = frame.index, error = ?e, "cannot forward observations");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn reader_node_can_move_across_threads() {
        assert_send_sync::<PlateReader>();
        assert_send_sync::<FrameObservations>();
    }
}
