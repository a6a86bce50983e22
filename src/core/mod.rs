//! Runtime: render state, config reload and the controller loop

mod config_watcher;
mod controller;
mod render_state;

pub use config_watcher::ConfigWatcher;
pub use controller::{Controller, DEVICE_RETRY_INTERVAL};
pub use render_state::RenderState;
