//! Immutable progress snapshots published across the core boundary.
//!
//! A fresh `ProgressInfo` value replaces the previous one on every update;
//! consumers never observe partial mutation. All fields are primitives or
//! strings so the snapshot serializes losslessly across process boundaries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle status of the download as seen by external consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Idle,
    Connecting,
    Downloading,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl DownloadStatus {
    /// True for states after which no further snapshots are published.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DownloadStatus::Completed | DownloadStatus::Failed | DownloadStatus::Cancelled
        )
    }
}

/// Snapshot of download progress. Derived from the checkpoint and live task
/// measurements; replaced wholesale on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub status: DownloadStatus,
    /// 0–100.
    pub progress_percent: u32,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub speed_bytes_per_sec: u64,
    /// Estimated remaining transfer time in milliseconds (0 when unknown).
    pub estimated_remaining_ms: u64,
    /// Human-readable status line.
    pub message: String,
}

impl ProgressInfo {
    pub fn idle() -> Self {
        Self {
            status: DownloadStatus::Idle,
            progress_percent: 0,
            downloaded_bytes: 0,
            total_bytes: 0,
            speed_bytes_per_sec: 0,
            estimated_remaining_ms: 0,
            message: "idle".to_string(),
        }
    }

    pub fn connecting() -> Self {
        Self {
            status: DownloadStatus::Connecting,
            message: "preparing download...".to_string(),
            ..Self::idle()
        }
    }

    pub fn downloading(downloaded: u64, total: u64, speed: u64) -> Self {
        let percent = percent(downloaded, total);
        let remaining_ms = if speed > 0 {
            total.saturating_sub(downloaded).saturating_mul(1000) / speed
        } else {
            0
        };
        let speed_str = if speed > 0 {
            format!("{}/s", format_size(speed))
        } else {
            "--".to_string()
        };
        let eta_str = if remaining_ms > 0 {
            format!(", {} left", format_duration(remaining_ms))
        } else {
            String::new()
        };
        Self {
            status: DownloadStatus::Downloading,
            progress_percent: percent,
            downloaded_bytes: downloaded,
            total_bytes: total,
            speed_bytes_per_sec: speed,
            estimated_remaining_ms: remaining_ms,
            message: format!(
                "downloading {}% ({} / {}) at {}{}",
                percent,
                format_size(downloaded),
                format_size(total),
                speed_str,
                eta_str
            ),
        }
    }

    pub fn paused(downloaded: u64, total: u64) -> Self {
        let percent = percent(downloaded, total);
        Self {
            status: DownloadStatus::Paused,
            progress_percent: percent,
            downloaded_bytes: downloaded,
            total_bytes: total,
            speed_bytes_per_sec: 0,
            estimated_remaining_ms: 0,
            message: format!(
                "paused at {}% ({} / {})",
                percent,
                format_size(downloaded),
                format_size(total)
            ),
        }
    }

    pub fn completed(file_size: u64, elapsed: Duration) -> Self {
        Self {
            status: DownloadStatus::Completed,
            progress_percent: 100,
            downloaded_bytes: file_size,
            total_bytes: file_size,
            speed_bytes_per_sec: 0,
            estimated_remaining_ms: 0,
            message: format!(
                "download complete: {} (took {})",
                format_size(file_size),
                format_duration(elapsed.as_millis() as u64)
            ),
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            status: DownloadStatus::Failed,
            message: format!("download failed: {}", message),
            ..Self::idle()
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: DownloadStatus::Cancelled,
            message: "download cancelled".to_string(),
            ..Self::idle()
        }
    }
}

/// Integer percent in [0, 100]; 0 when the total is unknown.
pub fn percent(downloaded: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    (downloaded.min(total) * 100 / total) as u32
}

/// Human-readable byte count (B / KiB / MiB / GiB).
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= GIB {
        format!("{:.2} GiB", b / GIB)
    } else if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

/// Human-readable duration from milliseconds, e.g. "2m 05s".
pub fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
