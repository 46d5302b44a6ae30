use std::path::{Path, PathBuf};

use crossbeam::channel::Sender;
use opencv::prelude::{Mat, MatTraitConst, VideoCaptureTrait, VideoCaptureTraitConst};
use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS};
use plate_canon::{CollaboratorError, FrameSource};
use rusted_pipe::channels::typed_write_channel::WriteChannel1;
use rusted_pipe::graph::processor::{ProcessorWriter, SourceProcessor};
use rusted_pipe::{DataVersion, RustedPipeError};
use tracing::{debug, error, info};

use super::IndexedFrame;
use crate::error::DetectorError;
use crate::utils::FpsLimiter;

/// Keeps one frame out of every `step`, so that about `samples_per_second`
/// frames survive per second of video.
pub fn sample_step(fps: f64, samples_per_second: f64) -> u64 {
    let step = (fps / samples_per_second).floor();
    if step.is_finite() && step >= 1.0 {
        step as u64
    } else {
        1
    }
}

/// Decodes a video file and yields the sampled frames only.
///
/// Every decoded frame is counted, starting at 1, and a frame is kept when
/// its number is a multiple of the sampling step.
pub struct VideoReader {
    capture: VideoCapture,
    path: PathBuf,
    step: u64,
    frame_number: u64,
}

impl VideoReader {
    pub fn open(path: &Path, samples_per_second: f64) -> Result<Self, DetectorError> {
        let capture = VideoCapture::from_file(&path.to_string_lossy(), CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(DetectorError::VideoOpen {
                path: path.to_path_buf(),
            });
        }
        let fps = capture.get(CAP_PROP_FPS)?;
        let step = sample_step(fps, samples_per_second);
        info!(video = %path.display(), fps, step, "video opened");

        Ok(Self {
            capture,
            path: path.to_path_buf(),
            step,
            frame_number: 0,
        })
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Next sampled frame, or `None` once the video is exhausted.
    pub fn next_sampled(&mut self) -> Result<Option<IndexedFrame>, DetectorError> {
        loop {
            let mut image = Mat::default();
            let grabbed = self.capture.read(&mut image)?;
            if !grabbed || image.empty() {
                info!(
                    video = %self.path.display(),
                    frames = self.frame_number,
                    "end of video"
                );
                return Ok(None);
            }

            self.frame_number += 1;
            if self.frame_number % self.step == 0 {
                debug!(frame = self.frame_number, "frame sampled");
                return Ok(Some(IndexedFrame {
                    index: self.frame_number,
                    image,
                }));
            }
        }
    }
}

impl FrameSource for VideoReader {
    type Frame = Mat;

    fn next_frame(&mut self) -> Result<Option<(u64, Mat)>, CollaboratorError> {
        self.next_sampled()
            .map(|frame| frame.map(|frame| (frame.index, frame.image)))
            .map_err(DetectorError::into_source)
    }
}

unsafe impl Send for VideoReader {}
unsafe impl Sync for VideoReader {}

/// Source node of the realtime graph. Paces the sampled frames and reports
/// the end of the video on `done`.
pub struct VideoSource {
    reader: VideoReader,
    fps_limiter: FpsLimiter,
    done: Sender<u64>,
    sent: u64,
}

impl VideoSource {
    pub fn new(reader: VideoReader, fps: usize, done: Sender<u64>) -> Self {
        Self {
            reader,
            fps_limiter: FpsLimiter::new(fps),
            done,
            sent: 0,
        }
    }

    fn finish(&mut self) -> Result<(), RustedPipeError> {
        if self.done.send(self.sent).is_err() {
            debug!("nobody is waiting for the end of the video");
        }
        Err(RustedPipeError::EndOfStream())
    }
}

impl SourceProcessor for VideoSource {
    type OUTPUT = WriteChannel1<IndexedFrame>;
    fn handle(&mut self, mut output: ProcessorWriter<Self::OUTPUT>) -> Result<(), RustedPipeError> {
        let frame = match self.reader.next_sampled() {
            Ok(Some(frame)) => frame,
            Ok(None) => return self.finish(),
            Err(e) => {
                error!(error = %e, "video decoding failed, ending stream");
                return self.finish();
            }
        };

        let frame_ts = DataVersion::from_now();
        debug!(frame = frame.index, version = frame_ts.timestamp_ns, "frame sent");
        if let Err(e) = output.writer.c1().write(frame, &frame_ts) {
            error!(error = ?e, "cannot write frame to the graph");
        } else {
            self.sent += 1;
        }

        self.fps_limiter.wait();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_keeps_about_three_frames_per_second() {
        assert_eq!(sample_step(30.0, 3.0), 10);
        assert_eq!(sample_step(29.97, 3.0), 9);
        assert_eq!(sample_step(25.0, 3.0), 8);
        assert_eq!(sample_step(60.0, 5.0), 12);
    }

    #[test]
    fn step_never_drops_below_one() {
        assert_eq!(sample_step(2.0, 3.0), 1);
        assert_eq!(sample_step(0.0, 3.0), 1);
        assert_eq!(sample_step(f64::NAN, 3.0), 1);
    }

    #[test]
    fn missing_video_cannot_be_opened() {
        let dir = tempfile::tempdir().unwrap();
        let result = VideoReader::open(&dir.path().join("absent.mp4"), 3.0);
        assert!(result.is_err());
    }
}
