//! `otad reset` – discard prior progress.

use anyhow::{Context, Result};
use otad_core::checkpoint::CheckpointStore;
use otad_core::manager::TEMP_FILE_NAME;
use std::fs;
use std::path::Path;

pub fn run_reset(dir: &Path) -> Result<()> {
    let temp_path = dir.join(TEMP_FILE_NAME);
    let store = CheckpointStore::new(&temp_path);
    store.clear();
    match fs::remove_file(&temp_path) {
        Ok(()) => println!("Removed {}", temp_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => println!("Nothing to reset."),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to remove {}", temp_path.display()))
        }
    }
    Ok(())
}
