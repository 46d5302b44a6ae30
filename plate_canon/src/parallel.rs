//! Multi-worker driver with a single writer.
//!
//! Frames are read on the calling thread and handed to `workers` threads,
//! each owning its own detector, OCR reader and era estimator. Workers send
//! finished observations to one writer thread that owns the aggregator. The
//! writer commits frames in dispatch order, so the first-seen frame and
//! image of every plate match a sequential run.

use std::collections::BTreeMap;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{error, info, warn};

use crate::aggregate::{Observation, ObservationAggregator};
use crate::cluster::cluster_plates;
use crate::collaborators::{EraEstimator, FragmentReader, FrameSource, PlateDetector};
use crate::config::CanonConfig;
use crate::error::{CanonError, CollaboratorError};
use crate::pipeline::observe_frame;
use crate::plate_map::PlateMap;

struct Dispatched<F> {
    sequence: u64,
    index: u64,
    frame: F,
}

struct FrameResult {
    sequence: u64,
    observations: Vec<Observation>,
}

/// Like [`crate::pipeline::process`], but frames are read by
/// `config.workers` threads. `make_worker` builds the collaborators of one
/// worker, on that worker's own thread; a worker that cannot be built
/// simply takes no frames.
pub fn process_parallel<S, D, R, E, M>(
    mut source: S,
    make_worker: M,
    config: &CanonConfig,
) -> Result<PlateMap, CanonError>
where
    S: FrameSource,
    S::Frame: Send,
    D: PlateDetector<S::Frame>,
    R: FragmentReader<D::Crop>,
    E: EraEstimator<D::Crop>,
    M: Fn(usize) -> Result<(D, R, E), CollaboratorError> + Sync,
{
    config.validate()?;

    let (frame_tx, frame_rx) = channel::bounded::<Dispatched<S::Frame>>(config.workers * 2);
    let (result_tx, result_rx) = channel::unbounded::<FrameResult>();
    let make_worker = &make_worker;

    let plates = crossbeam::scope(|scope| {
        for worker in 0..config.workers {
            let frames = frame_rx.clone();
            let results = result_tx.clone();
            scope.spawn(move |_| run_worker(worker, make_worker, frames, results));
        }
        drop(frame_rx);
        drop(result_tx);

        let writer = scope.spawn(move |_| write_in_order(result_rx));

        let mut sequence = 0;
        loop {
            let (index, frame) = match source.next_frame() {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "frame source failed, ending stream");
                    break;
                }
            };
            let dispatched = Dispatched {
                sequence,
                index,
                frame,
            };
            if frame_tx.send(dispatched).is_err() {
                error!("no frame worker is running, ending stream");
                break;
            }
            sequence += 1;
        }
        drop(frame_tx);

        writer.join()
    })
    .map_err(|_| CanonError::WorkerPanicked)?
    .map_err(|_| CanonError::WorkerPanicked)?;

    info!(
        workers = config.workers,
        distinct_plates = plates.len(),
        "stream finished"
    );
    Ok(cluster_plates(plates, config.max_hamming_distance))
}

fn run_worker<F, D, R, E, M>(
    worker: usize,
    make_worker: &M,
    frames: Receiver<Dispatched<F>>,
    results: Sender<FrameResult>,
) where
    D: PlateDetector<F>,
    R: FragmentReader<D::Crop>,
    E: EraEstimator<D::Crop>,
    M: Fn(usize) -> Result<(D, R, E), CollaboratorError>,
{
    let (mut detector, mut reader, era) = match make_worker(worker) {
        Ok(collaborators) => collaborators,
        Err(e) => {
            error!(worker, error = %e, "could not build frame worker");
            return;
        }
    };

    for Dispatched {
        sequence,
        index,
        frame,
    } in frames.iter()
    {
        let observations = observe_frame(&mut detector, &mut reader, &era, index, &frame);
        if results
            .send(FrameResult {
                sequence,
                observations,
            })
            .is_err()
        {
            break;
        }
    }
}

/// The single writer. Results are held back until every earlier frame has
/// been committed; whatever is still pending when the workers stop is
/// committed in order.
fn write_in_order(results: Receiver<FrameResult>) -> PlateMap {
    let mut aggregator = ObservationAggregator::new();
    let mut pending = BTreeMap::new();
    let mut next = 0;

    for result in results.iter() {
        pending.insert(result.sequence, result.observations);
        while let Some(observations) = pending.remove(&next) {
            commit(&mut aggregator, observations);
            next += 1;
        }
    }
    for (_, observations) in pending {
        commit(&mut aggregator, observations);
    }

    aggregator.drain()
}

fn commit(aggregator: &mut ObservationAggregator, observations: Vec<Observation>) {
    for observation in observations {
        aggregator.record_observation(observation);
    }
}
