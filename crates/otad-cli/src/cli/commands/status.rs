//! `otad status` – show resumable progress from a previous run.

use anyhow::Result;
use otad_core::checkpoint::CheckpointStore;
use otad_core::manager::TEMP_FILE_NAME;
use otad_core::progress::ProgressInfo;
use std::path::Path;

pub fn run_status(dir: &Path) -> Result<()> {
    let store = CheckpointStore::new(&dir.join(TEMP_FILE_NAME));
    match store.load() {
        Some(cp) if cp.downloaded_bytes > 0 && cp.total_bytes > 0 => {
            let info = ProgressInfo::paused(cp.downloaded_bytes, cp.total_bytes);
            println!("{}", info.message);
        }
        _ => println!("No previous download."),
    }
    Ok(())
}
