//! Task lifecycle events and the shared task handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Tagged lifecycle event emitted by a download task. Delivered in order:
/// `Started`, zero or more `Progress`, then exactly one terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Started {
        total_bytes: u64,
        downloaded_bytes: u64,
    },
    Progress {
        current_bytes: u64,
        total_bytes: u64,
        speed_bytes_per_sec: u64,
    },
    Completed {
        file_size: u64,
    },
    Failed {
        message: String,
    },
    Cancelled,
}

/// State of one transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    /// True while the attempt is connecting or streaming.
    pub fn is_active(self) -> bool {
        matches!(self, TaskState::Connecting | TaskState::Streaming)
    }
}

/// Shared view of a running task: its state and the cooperative cancellation
/// flag. The streaming loop observes the flag at chunk granularity.
#[derive(Debug)]
pub struct TaskHandle {
    state: Mutex<TaskState>,
    cancel: AtomicBool,
}

impl TaskHandle {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(TaskState::Idle),
            cancel: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Request cooperative cancellation. The transfer stops within one chunk
    /// read; there is no forced interruption of an in-flight network read.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}
