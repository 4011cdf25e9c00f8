mod reset;
mod run;
mod status;

pub use reset::run_reset;
pub use run::run_download;
pub use status::run_status;
