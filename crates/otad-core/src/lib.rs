pub mod config;
pub mod logging;

pub mod checkpoint;
pub mod connection;
pub mod manager;
pub mod progress;
pub mod retry;
pub mod task;
