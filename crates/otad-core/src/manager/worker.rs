//! Bounded single-slot background worker owned by the orchestrator.

use std::sync::mpsc::{self, SyncSender};
use std::thread::JoinHandle;

use anyhow::{Context, Result};

type Job = Box<dyn FnOnce() + Send>;

/// One background thread executing at most one job at a time, fed by a
/// single-slot queue. Lifecycle is tied to the owner: dropping or shutting
/// down closes the queue and joins the thread.
pub(crate) struct SingleWorker {
    tx: Option<SyncSender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl SingleWorker {
    pub(crate) fn spawn(name: &str) -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<Job>(1);
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            })
            .context("failed to spawn worker thread")?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Submit a job. Returns false if the worker has been shut down.
    pub(crate) fn submit(&self, job: Job) -> bool {
        match &self.tx {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        }
    }

    /// Close the queue and wait for the current job to finish.
    pub(crate) fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for SingleWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
