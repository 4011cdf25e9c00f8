//! `otad run` – download the update file, resuming if possible.

use anyhow::{bail, Result};
use otad_core::config::OtadConfig;
use otad_core::connection::ConnectionManager;
use otad_core::manager::DownloadManager;
use otad_core::progress::DownloadStatus;
use std::fs;
use std::path::Path;

pub fn run_download(cfg: &OtadConfig, url: &str, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    let connection = ConnectionManager::from_config(cfg)?;
    let mut manager = DownloadManager::new(url, dir, connection)?;

    if let Some(prior) = manager.check_previous_download() {
        println!("{}", prior.message);
    }

    let events = manager.subscribe();
    manager.start_download();

    let mut failure: Option<String> = None;
    for info in events {
        if info.status.is_terminal() {
            if info.status == DownloadStatus::Completed {
                println!("{}", info.message);
                println!("saved to {}", manager.final_path().display());
            } else {
                failure = Some(info.message);
            }
            break;
        }
        println!("{}", info.message);
    }

    manager.shutdown();
    if let Some(message) = failure {
        bail!(message);
    }
    Ok(())
}
