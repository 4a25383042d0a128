//! Background loading of sound files.
//!
//! One worker thread owns all blocking decodes. Jobs go in over a channel and
//! results come back over another; nothing else is shared with the thread.

use std::{
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, trace, warn};

use super::AssetId;
use crate::{
    audio::{AudioInterface, SoundContainer},
    McError, Result,
};

#[derive(Debug, Clone)]
pub struct LoadJob {
    pub id: AssetId,
    pub name: String,
    pub file: PathBuf,
}

#[derive(Debug)]
pub struct LoadResult {
    pub id: AssetId,
    pub name: String,
    pub result: Result<SoundContainer>,
}

#[derive(Debug)]
pub struct AssetLoader {
    jobs: Option<Sender<LoadJob>>,
    results: Receiver<LoadResult>,
    worker: Option<JoinHandle<()>>,
}

impl AssetLoader {
    pub fn spawn(audio: Arc<dyn AudioInterface>) -> Result<Self> {
        let (job_tx, job_rx) = unbounded::<LoadJob>();
        let (result_tx, result_rx) = unbounded::<LoadResult>();

        let worker = thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || run_worker(audio.as_ref(), &job_rx, &result_tx))?;

        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            worker: Some(worker),
        })
    }

    pub fn submit(&self, job: LoadJob) -> Result<()> {
        let jobs = self.jobs.as_ref().ok_or(McError::LoaderDisconnected)?;
        trace!(sound = %job.name, "queued sound load");
        jobs.send(job).map_err(|_| McError::LoaderDisconnected)
    }

    /// A finished load, if one is waiting.
    pub fn try_recv(&self) -> Result<Option<LoadResult>> {
        match self.results.try_recv() {
            Ok(result) => Ok(Some(result)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(McError::LoaderDisconnected),
        }
    }

    /// Waits up to `timeout` for the next finished load.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<LoadResult>> {
        match self.results.recv_timeout(timeout) {
            Ok(result) => Ok(Some(result)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(McError::LoaderDisconnected),
        }
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("asset loader thread panicked");
            }
        }
    }
}

fn run_worker(audio: &dyn AudioInterface, jobs: &Receiver<LoadJob>, results: &Sender<LoadResult>) {
    while let Ok(job) = jobs.recv() {
        let result = audio.load_sound(&job.file);
        if let Err(err) = &result {
            debug!(sound = %job.name, error = %err, "sound failed to load");
        }
        let sent = results.send(LoadResult {
            id: job.id,
            name: job.name,
            result,
        });
        if sent.is_err() {
            break;
        }
    }
    trace!("asset loader stopped");
}
