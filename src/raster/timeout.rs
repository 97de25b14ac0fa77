//! Bounded waits on slow rasterizer calls

use std::thread;
use std::time::Duration;
use crossbeam_channel::{bounded, RecvTimeoutError};
use crate::error::{Error, Result};
use crate::raster::RasterStage;

/// Run `job` on a worker thread and wait at most `limit` for its result
///
/// On timeout the worker is left to finish on its own; its result is discarded.
pub fn run_with_timeout<T, F>(limit: Duration, stage: RasterStage, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = bounded(1);

    thread::Builder::new()
        .name(format!("raster-{}", stage))
        .spawn(move || {
            // The receiver is gone if we already timed out
            let _ = tx.send(job());
        })
        .map_err(|e| Error::raster(stage, format!("cannot start worker thread: {}", e)))?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(Error::raster(
            stage,
            format!("timed out after {:.1}s", limit.as_secs_f64()),
        )),
        Err(RecvTimeoutError::Disconnected) => {
            Err(Error::raster(stage, "worker stopped without a result"))
        }
    }
}
