//! One transfer attempt: range request, streaming loop, finalize.
//!
//! A task moves `Idle → Connecting → Streaming → {Completed|Failed|Cancelled}`
//! and is used once. It never retries by itself; retry is the caller's
//! decision, and a manual restart resumes from the intact temp file.

mod events;
mod throttle;

pub use events::{TaskEvent, TaskHandle, TaskState};

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::connection::{ConnectionManager, ResponseHandle};
use throttle::ProgressThrottle;

/// Fixed read chunk size. Cancellation latency is bounded by one chunk.
pub const CHUNK_SIZE: usize = 8 * 1024;

enum StreamOutcome {
    /// Clean EOF; all bytes flushed to the temp file.
    Finished,
    /// Cancellation flag observed; temp file flushed and left intact.
    Cancelled,
}

/// A single download attempt streaming into a temp file.
pub struct DownloadTask {
    connection: ConnectionManager,
    temp_path: PathBuf,
    final_path: PathBuf,
    handle: Arc<TaskHandle>,
}

impl DownloadTask {
    pub fn new(connection: ConnectionManager, temp_path: PathBuf, final_path: PathBuf) -> Self {
        Self {
            connection,
            temp_path,
            final_path,
            handle: Arc::new(TaskHandle::new()),
        }
    }

    /// Shared handle for state queries and cooperative cancellation.
    pub fn handle(&self) -> Arc<TaskHandle> {
        Arc::clone(&self.handle)
    }

    /// Run the transfer, emitting lifecycle events in order. Returns true on
    /// full success. Never panics or propagates an error; every outcome is
    /// reported through a terminal event.
    pub fn run(&self, url: &str, resume_offset: u64, emit: &mut dyn FnMut(TaskEvent)) -> bool {
        self.handle.set_state(TaskState::Connecting);

        if !self.connection.probe_availability(url) {
            return self.fail(emit, "server unreachable".to_string());
        }

        let response = match self.connection.open_range_request(url, resume_offset) {
            Ok(r) => r,
            Err(e) => return self.fail(emit, e.to_string()),
        };

        if !response.is_success() {
            return self.fail(emit, format!("server error {}", response.status_code));
        }
        if response.content_length == Some(0) {
            return self.fail(emit, "empty response".to_string());
        }

        let mut downloaded = resume_offset;
        let total_bytes = if response.is_partial_content() {
            response
                .content_range_total
                .unwrap_or_else(|| downloaded + response.content_length.unwrap_or(0))
        } else {
            // The server did not resume: stale partial data cannot be trusted
            // against fresh full content.
            if let Err(e) = self.discard_stale_temp() {
                return self.fail(emit, format!("{:#}", e));
            }
            downloaded = 0;
            response.content_length.unwrap_or(0)
        };

        tracing::info!(url, total_bytes, downloaded, "download starting");
        self.handle.set_state(TaskState::Streaming);
        emit(TaskEvent::Started {
            total_bytes,
            downloaded_bytes: downloaded,
        });

        match self.stream_to_temp(response, downloaded, total_bytes, emit) {
            Ok(StreamOutcome::Finished) => {}
            Ok(StreamOutcome::Cancelled) => {
                tracing::info!("download cancelled");
                self.handle.set_state(TaskState::Cancelled);
                emit(TaskEvent::Cancelled);
                return false;
            }
            Err(e) => return self.fail(emit, format!("{:#}", e)),
        }

        let file_size = match self.finalize() {
            Ok(size) => size,
            Err(e) => return self.fail(emit, format!("{:#}", e)),
        };

        tracing::info!(file_size, path = %self.final_path.display(), "download complete");
        self.handle.set_state(TaskState::Completed);
        emit(TaskEvent::Completed { file_size });
        true
    }

    /// Remove a pre-existing temp file before a fresh full-content stream.
    fn discard_stale_temp(&self) -> Result<()> {
        if self.temp_path.exists() {
            tracing::info!(path = %self.temp_path.display(), "server returned full content, discarding stale temp file");
            fs::remove_file(&self.temp_path)
                .with_context(|| format!("failed to discard temp file: {}", self.temp_path.display()))?;
        }
        Ok(())
    }

    /// Append the body to the temp file chunk by chunk, checking the
    /// cancellation flag before each read and emitting throttled progress.
    fn stream_to_temp(
        &self,
        mut body: ResponseHandle,
        start_bytes: u64,
        total_bytes: u64,
        emit: &mut dyn FnMut(TaskEvent),
    ) -> Result<StreamOutcome> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.temp_path)
            .with_context(|| format!("failed to open temp file: {}", self.temp_path.display()))?;
        let mut sink = BufWriter::new(file);

        let mut buf = [0u8; CHUNK_SIZE];
        let mut current = start_bytes;
        let mut throttle = ProgressThrottle::new(Instant::now(), start_bytes);

        loop {
            if self.handle.cancel_requested() {
                sink.flush().context("failed to flush temp file")?;
                return Ok(StreamOutcome::Cancelled);
            }

            let n = body.read(&mut buf).context("read from server failed")?;
            if n == 0 {
                break;
            }

            sink.write_all(&buf[..n]).context("write to temp file failed")?;
            current += n as u64;

            if let Some(speed) = throttle.check(Instant::now(), current, total_bytes) {
                emit(TaskEvent::Progress {
                    current_bytes: current,
                    total_bytes,
                    speed_bytes_per_sec: speed,
                });
            }
        }

        sink.flush().context("failed to flush temp file")?;
        sink.get_ref()
            .sync_all()
            .context("failed to sync temp file")?;
        Ok(StreamOutcome::Finished)
    }

    /// Atomically rename the temp file to the final path and return the final
    /// size. A rename failure is fatal for this attempt, not retried.
    fn finalize(&self) -> Result<u64> {
        fs::rename(&self.temp_path, &self.final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                self.temp_path.display(),
                self.final_path.display()
            )
        })?;
        let size = fs::metadata(&self.final_path)
            .with_context(|| format!("failed to stat final file: {}", self.final_path.display()))?
            .len();
        Ok(size)
    }

    fn fail(&self, emit: &mut dyn FnMut(TaskEvent), message: String) -> bool {
        tracing::warn!(message, "download attempt failed");
        self.handle.set_state(TaskState::Failed);
        emit(TaskEvent::Failed { message });
        false
    }
}
