//! Command implementations for the CLI.

mod beep;
mod config;
mod led;
mod scan;
mod watch;

pub use beep::cmd_beep;
pub use config::cmd_config;
pub use led::cmd_led;
pub use scan::cmd_scan;
pub use watch::{WatchArgs, cmd_watch};
