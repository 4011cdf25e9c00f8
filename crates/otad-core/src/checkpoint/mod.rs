//! Durable transfer checkpoint: record type and file-backed store.
//!
//! One checkpoint record exists per temp file, stored as JSON next to it.
//! The temp file's actual length is the ground truth for received bytes; a
//! checkpoint that disagrees with it is corrupt and is never returned by
//! `CheckpointStore::load`.

mod store;

pub use store::CheckpointStore;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File name of the checkpoint record, co-located with the temp file.
pub const STATE_FILE_NAME: &str = "download_state.json";

/// Durable record of transfer progress enabling resume after restart/crash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Opaque id generated once per fresh download.
    pub download_id: String,
    pub downloaded_bytes: u64,
    /// 0 = unknown.
    pub total_bytes: u64,
    /// Epoch milliseconds of the last mutation.
    pub last_update_time: i64,
    pub completed: bool,
    pub cancelled: bool,
}

impl Checkpoint {
    /// Fresh checkpoint for a new download with a newly generated id.
    pub fn new_fresh() -> Self {
        Self {
            download_id: Uuid::new_v4().to_string(),
            downloaded_bytes: 0,
            total_bytes: 0,
            last_update_time: epoch_millis(),
            completed: false,
            cancelled: false,
        }
    }

    /// Update the downloaded byte count, refreshing the timestamp.
    pub fn set_downloaded(&mut self, bytes: u64) {
        self.downloaded_bytes = bytes;
        self.last_update_time = epoch_millis();
    }

    /// Integer percent in [0, 100]; 0 when total size is unknown.
    pub fn progress_percent(&self) -> u32 {
        crate::progress::percent(self.downloaded_bytes, self.total_bytes)
    }
}

pub(crate) fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_checkpoints_have_unique_ids() {
        let a = Checkpoint::new_fresh();
        let b = Checkpoint::new_fresh();
        assert_ne!(a.download_id, b.download_id);
        assert_eq!(a.downloaded_bytes, 0);
        assert_eq!(a.total_bytes, 0);
        assert!(!a.completed);
        assert!(!a.cancelled);
    }

    #[test]
    fn set_downloaded_touches_timestamp() {
        let mut cp = Checkpoint::new_fresh();
        cp.last_update_time = 0;
        cp.set_downloaded(500);
        assert_eq!(cp.downloaded_bytes, 500);
        assert!(cp.last_update_time > 0);
    }

    #[test]
    fn progress_percent_guards_unknown_total() {
        let mut cp = Checkpoint::new_fresh();
        cp.downloaded_bytes = 500;
        assert_eq!(cp.progress_percent(), 0);
        cp.total_bytes = 1000;
        assert_eq!(cp.progress_percent(), 50);
    }
}
