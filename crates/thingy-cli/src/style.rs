//! Visual styling utilities for the CLI.
//!
//! Spinners for long-running BLE operations and colored fragments for event
//! lines.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use thingy_core::EventKind;

/// Standard spinner tick characters (Braille dots animation)
const SPINNER_TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Standard spinner tick interval
const SPINNER_TICK_MS: u64 = 80;

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_TICK_CHARS)
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    pb
}

/// Create a spinner for scanning operations.
pub fn scanning_spinner(timeout_secs: u64) -> ProgressBar {
    spinner(format!(
        "Scanning for Thingy:52 devices... ({}s)",
        timeout_secs
    ))
}

/// Create a spinner for connecting to a device.
pub fn connecting_spinner(device: Option<&str>) -> ProgressBar {
    match device {
        Some(device) => spinner(format!("Connecting to {}...", device)),
        None => spinner("Looking for a Thingy:52...".to_string()),
    }
}

/// Event kind label, padded and colored by category.
pub fn kind_label(kind: EventKind, no_color: bool) -> String {
    let label = format!("{:<13}", kind.name());
    if no_color {
        return label;
    }
    match kind {
        EventKind::BeforeConnect | EventKind::Connect => label.green().to_string(),
        EventKind::Disconnect => label.red().to_string(),
        EventKind::Battery => label.yellow().to_string(),
        EventKind::Temperature => label.magenta().to_string(),
        EventKind::Accelerometer => label.blue().to_string(),
        EventKind::Button => label.cyan().to_string(),
    }
}

/// Battery percentage, colored by level.
pub fn battery_colored(level: u8, no_color: bool) -> String {
    let text = format!("{}%", level);
    if no_color {
        return text;
    }
    match level {
        0..=15 => text.red().to_string(),
        16..=40 => text.yellow().to_string(),
        _ => text.green().to_string(),
    }
}

/// Dim text, used for timestamps and identifiers.
pub fn dim(text: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        text.dimmed().to_string()
    }
}
