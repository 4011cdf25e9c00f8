//! Download orchestrator: single-flight task execution, checkpoint ownership,
//! snapshot publication.
//!
//! One manager instance owns one download slot. All transfer work happens on
//! a single background worker thread; the manager's own methods never block
//! on network I/O.

mod worker;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::connection::ConnectionManager;
use crate::progress::ProgressInfo;
use crate::task::{DownloadTask, TaskEvent, TaskHandle, TaskState};
use worker::SingleWorker;

/// File name of the finished update image.
pub const FINAL_FILE_NAME: &str = "update.bin";

/// File name of the in-progress temp file, in the same directory.
pub const TEMP_FILE_NAME: &str = "update.bin.tmp";

/// Orchestrates one update download at a time. Starting is idempotent while a
/// transfer is active; progress is observed through [`subscribe`] receivers or
/// the [`current_progress`] snapshot.
///
/// [`subscribe`]: DownloadManager::subscribe
/// [`current_progress`]: DownloadManager::current_progress
pub struct DownloadManager {
    inner: Arc<ManagerInner>,
    worker: SingleWorker,
}

struct ManagerInner {
    url: String,
    temp_path: PathBuf,
    final_path: PathBuf,
    connection: ConnectionManager,
    store: CheckpointStore,
    checkpoint: Mutex<Checkpoint>,
    snapshot: Mutex<ProgressInfo>,
    subscribers: Mutex<Vec<Sender<ProgressInfo>>>,
    active: Mutex<Option<Arc<TaskHandle>>>,
    started_at: Mutex<Option<Instant>>,
}

impl DownloadManager {
    /// Manager for `url` downloading into `download_dir`. The final file,
    /// temp file and checkpoint record all live in that directory.
    pub fn new(url: impl Into<String>, download_dir: &Path, connection: ConnectionManager) -> Result<Self> {
        let temp_path = download_dir.join(TEMP_FILE_NAME);
        let final_path = download_dir.join(FINAL_FILE_NAME);
        let store = CheckpointStore::new(&temp_path);
        let inner = Arc::new(ManagerInner {
            url: url.into(),
            temp_path,
            final_path,
            connection,
            store,
            checkpoint: Mutex::new(Checkpoint::new_fresh()),
            snapshot: Mutex::new(ProgressInfo::idle()),
            subscribers: Mutex::new(Vec::new()),
            active: Mutex::new(None),
            started_at: Mutex::new(None),
        });
        let worker = SingleWorker::spawn("otad-download")?;
        Ok(Self { inner, worker })
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn temp_path(&self) -> &Path {
        &self.inner.temp_path
    }

    pub fn final_path(&self) -> &Path {
        &self.inner.final_path
    }

    /// Register a progress receiver. Every published snapshot is delivered to
    /// all receivers alive at publication time; a dropped receiver is pruned
    /// on the next publication.
    pub fn subscribe(&self) -> Receiver<ProgressInfo> {
        let (tx, rx) = mpsc::channel();
        lock(&self.inner.subscribers).push(tx);
        rx
    }

    /// Look for a resumable previous download. Returns its paused snapshot
    /// (and primes the in-memory checkpoint) without starting any transfer.
    /// `None` when there is no prior progress worth resuming.
    pub fn check_previous_download(&self) -> Option<ProgressInfo> {
        let cp = self.inner.store.load()?;
        if cp.downloaded_bytes == 0 || cp.total_bytes == 0 {
            return None;
        }
        tracing::info!(
            downloaded = cp.downloaded_bytes,
            total = cp.total_bytes,
            percent = cp.progress_percent(),
            "found resumable previous download"
        );
        let info = ProgressInfo::paused(cp.downloaded_bytes, cp.total_bytes);
        *lock(&self.inner.checkpoint) = cp;
        *lock(&self.inner.snapshot) = info.clone();
        Some(info)
    }

    /// Start (or resume) the download on the background worker. A no-op while
    /// a transfer is already connecting or streaming.
    pub fn start_download(&self) {
        let mut active = lock(&self.inner.active);
        if let Some(handle) = active.as_ref() {
            if handle.state().is_active() {
                tracing::info!("download already in progress, ignoring start request");
                return;
            }
        }

        // Resume from a validated checkpoint, otherwise start fresh. A stale
        // temp file without a valid record is handled by the task itself when
        // the server replies with full content.
        let resume_offset = {
            let mut cp = lock(&self.inner.checkpoint);
            match self.inner.store.load() {
                Some(mut loaded) => {
                    tracing::info!(
                        download_id = %loaded.download_id,
                        downloaded = loaded.downloaded_bytes,
                        "resuming previous download"
                    );
                    loaded.completed = false;
                    loaded.cancelled = false;
                    *cp = loaded;
                }
                None => {
                    *cp = Checkpoint::new_fresh();
                    tracing::info!(download_id = %cp.download_id, "starting fresh download");
                }
            }
            cp.downloaded_bytes
        };

        let task = DownloadTask::new(
            self.inner.connection.clone(),
            self.inner.temp_path.clone(),
            self.inner.final_path.clone(),
        );
        let handle = task.handle();
        // Mark active before releasing the slot lock so a concurrent start
        // observes the transfer even if the worker has not picked it up yet.
        handle.set_state(TaskState::Connecting);
        *active = Some(handle);
        drop(active);

        *lock(&self.inner.started_at) = Some(Instant::now());
        self.inner.publish(ProgressInfo::connecting());

        let inner = Arc::clone(&self.inner);
        let submitted = self.worker.submit(Box::new(move || {
            let url = inner.url.clone();
            let resume = resume_offset;
            let mut emit = |event: TaskEvent| inner.handle_event(event);
            task.run(&url, resume, &mut emit);
        }));
        if !submitted {
            tracing::warn!("worker is shut down, download not started");
            self.inner.publish(ProgressInfo::failed("worker is shut down"));
        }
    }

    /// Request cooperative cancellation of the active transfer, if any. The
    /// terminal `Cancelled` snapshot is published by the task once it stops.
    pub fn cancel_download(&self) {
        if let Some(handle) = lock(&self.inner.active).as_ref() {
            if handle.state().is_active() {
                tracing::info!("cancellation requested");
                handle.request_cancel();
            }
        }
    }

    /// Persist the current checkpoint if there is anything worth persisting:
    /// an active transfer or prior progress, with a known total size.
    pub fn save_download_state(&self) {
        let active = self.inner.is_active();
        let cp = {
            let mut cp = lock(&self.inner.checkpoint);
            if (!active && cp.downloaded_bytes == 0) || cp.total_bytes == 0 {
                return;
            }
            // The temp file length is the ground truth for received bytes.
            if let Ok(meta) = fs::metadata(&self.inner.temp_path) {
                cp.set_downloaded(meta.len());
            }
            cp.clone()
        };
        if let Err(e) = self.inner.store.save(&cp) {
            tracing::warn!(error = %e, "failed to save download state");
        }
    }

    /// True while bytes are actively being streamed.
    pub fn is_downloading(&self) -> bool {
        lock(&self.inner.active)
            .as_ref()
            .map(|h| h.state() == TaskState::Streaming)
            .unwrap_or(false)
    }

    /// Latest published snapshot.
    pub fn current_progress(&self) -> ProgressInfo {
        lock(&self.inner.snapshot).clone()
    }

    /// Cancel any active transfer and stop the worker, waiting for it to
    /// finish its current job.
    pub fn shutdown(&mut self) {
        self.cancel_download();
        self.worker.shutdown();
    }
}

impl ManagerInner {
    fn is_active(&self) -> bool {
        lock(&self.active)
            .as_ref()
            .map(|h| h.state().is_active())
            .unwrap_or(false)
    }

    fn handle_event(&self, event: TaskEvent) {
        match event {
            TaskEvent::Started {
                total_bytes,
                downloaded_bytes,
            } => {
                {
                    let mut cp = lock(&self.checkpoint);
                    cp.total_bytes = total_bytes;
                    cp.set_downloaded(downloaded_bytes);
                }
                self.publish(ProgressInfo::downloading(downloaded_bytes, total_bytes, 0));
            }
            TaskEvent::Progress {
                current_bytes,
                total_bytes,
                speed_bytes_per_sec,
            } => {
                let cp = {
                    let mut cp = lock(&self.checkpoint);
                    cp.total_bytes = total_bytes;
                    cp.set_downloaded(current_bytes);
                    cp.clone()
                };
                if let Err(e) = self.store.save(&cp) {
                    tracing::warn!(error = %e, "failed to persist checkpoint");
                }
                self.publish(ProgressInfo::downloading(
                    current_bytes,
                    total_bytes,
                    speed_bytes_per_sec,
                ));
            }
            TaskEvent::Completed { file_size } => {
                {
                    let mut cp = lock(&self.checkpoint);
                    cp.completed = true;
                    cp.total_bytes = file_size;
                    cp.set_downloaded(file_size);
                }
                self.store.clear();
                let elapsed = lock(&self.started_at)
                    .take()
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                self.publish(ProgressInfo::completed(file_size, elapsed));
            }
            TaskEvent::Failed { message } => {
                self.persist_resumable(false);
                self.publish(ProgressInfo::failed(&message));
            }
            TaskEvent::Cancelled => {
                self.persist_resumable(true);
                self.publish(ProgressInfo::cancelled());
            }
        }
    }

    /// After an interrupted attempt, record what actually reached disk so the
    /// stored checkpoint always agrees with the temp file length.
    fn persist_resumable(&self, cancelled: bool) {
        let cp = {
            let mut cp = lock(&self.checkpoint);
            let temp_len = fs::metadata(&self.temp_path).map(|m| m.len()).unwrap_or(0);
            cp.set_downloaded(temp_len);
            if cancelled {
                cp.cancelled = true;
            }
            cp.clone()
        };
        if cp.downloaded_bytes == 0 && cp.total_bytes == 0 {
            return;
        }
        if let Err(e) = self.store.save(&cp) {
            tracing::warn!(error = %e, "failed to persist checkpoint");
        }
    }

    /// Replace the snapshot and fan it out, pruning dead receivers.
    fn publish(&self, info: ProgressInfo) {
        *lock(&self.snapshot) = info.clone();
        lock(&self.subscribers).retain(|tx| tx.send(info.clone()).is_ok());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
