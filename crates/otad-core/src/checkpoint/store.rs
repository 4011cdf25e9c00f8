//! File-backed checkpoint store with a corruption guard.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

use super::{Checkpoint, STATE_FILE_NAME};

/// Durable save/load/clear of the checkpoint record. All operations are
/// serialized through an internal lock so a save never races a load or clear.
pub struct CheckpointStore {
    temp_path: PathBuf,
    state_path: PathBuf,
    lock: Mutex<()>,
}

impl CheckpointStore {
    /// Store for the checkpoint co-located with `temp_path`.
    pub fn new(temp_path: &Path) -> Self {
        let state_path = temp_path.with_file_name(STATE_FILE_NAME);
        Self {
            temp_path: temp_path.to_path_buf(),
            state_path,
            lock: Mutex::new(()),
        }
    }

    /// Path of the checkpoint record file.
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Persist the checkpoint. The record is written to a scratch file and
    /// renamed into place so a crash mid-write never leaves a torn record.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let json = serde_json::to_vec_pretty(checkpoint).context("failed to serialize checkpoint")?;
        let scratch = self.state_path.with_extension("json.tmp");
        fs::write(&scratch, &json)
            .with_context(|| format!("failed to write checkpoint: {}", scratch.display()))?;
        fs::rename(&scratch, &self.state_path)
            .with_context(|| format!("failed to replace checkpoint: {}", self.state_path.display()))?;
        tracing::debug!(
            downloaded = checkpoint.downloaded_bytes,
            total = checkpoint.total_bytes,
            "checkpoint saved"
        );
        Ok(())
    }

    /// Load the checkpoint, or `None` when there is no usable record: missing
    /// temp file, missing or unreadable record, or a record whose
    /// `downloaded_bytes` disagrees with the temp file's actual length.
    pub fn load(&self) -> Option<Checkpoint> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let temp_len = fs::metadata(&self.temp_path).ok()?.len();
        let data = fs::read(&self.state_path).ok()?;
        let checkpoint: Checkpoint = match serde_json::from_slice(&data) {
            Ok(cp) => cp,
            Err(e) => {
                tracing::warn!(error = %e, "checkpoint record unreadable, ignoring");
                return None;
            }
        };

        if temp_len != checkpoint.downloaded_bytes {
            tracing::warn!(
                temp_len,
                recorded = checkpoint.downloaded_bytes,
                "temp file length disagrees with checkpoint, discarding record"
            );
            return None;
        }

        tracing::debug!(
            downloaded = checkpoint.downloaded_bytes,
            total = checkpoint.total_bytes,
            "checkpoint loaded"
        );
        Some(checkpoint)
    }

    /// Delete the checkpoint record. Idempotent.
    pub fn clear(&self) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        match fs::remove_file(&self.state_path) {
            Ok(()) => tracing::debug!("checkpoint record deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, "failed to delete checkpoint record"),
        }
    }
}
