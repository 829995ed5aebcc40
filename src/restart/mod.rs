// Restart module - config-change detection and debounced worker restarts

pub mod controller;
pub mod watcher;

pub use controller::{RestartController, RestartPlan};
pub use watcher::{ConfigChanged, ConfigWatcher};
