//! Output formatting for text and JSON output.

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use thingy_core::{DeviceIdentity, DisconnectReason, ThingyEvent};

use crate::style;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self {
            no_color,
            compact: false,
        }
    }

    /// Create with compact JSON option.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }
}

/// A watched event with the local time it was printed.
#[derive(Debug, Serialize)]
struct TimedEvent<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a ThingyEvent,
}

fn disconnect_reason(reason: &DisconnectReason) -> &'static str {
    match reason {
        DisconnectReason::UserRequested => "closed",
        DisconnectReason::SessionReplaced => "replaced",
        DisconnectReason::Remote => "connection lost",
        _ => "unknown",
    }
}

/// Human-readable value part of an event line.
pub fn event_value(event: &ThingyEvent, opts: &FormatOptions) -> String {
    match event {
        ThingyEvent::BeforeConnect { device } => format!("connecting to {}", device),
        ThingyEvent::Connect { device } => format!("connected to {}", device),
        ThingyEvent::Disconnect { device_id, reason } => {
            format!("{} ({})", device_id, disconnect_reason(reason))
        }
        ThingyEvent::Battery { battery_level, .. } => {
            style::battery_colored(*battery_level, opts.no_color)
        }
        ThingyEvent::Temperature { temperature, .. } => format!("{:.2} °C", temperature),
        ThingyEvent::Accelerometer { x, y, z } => {
            format!("x={:+.3} y={:+.3} z={:+.3} g", x, y, z)
        }
        ThingyEvent::Button { pressed: true, .. } => "pressed".to_string(),
        ThingyEvent::Button { pressed: false, .. } => "released".to_string(),
        other => format!("{:?}", other),
    }
}

/// One text line for a watched event.
pub fn format_event_text(event: &ThingyEvent, at: DateTime<Local>, opts: &FormatOptions) -> String {
    let timestamp = format!("[{}]", at.format("%H:%M:%S"));
    format!(
        "{} {} {}\n",
        style::dim(&timestamp, opts.no_color),
        style::kind_label(event.kind(), opts.no_color),
        event_value(event, opts)
    )
}

/// JSON for a watched event: the tagged event plus a `timestamp` field.
pub fn format_event_json(
    event: &ThingyEvent,
    at: DateTime<Local>,
    opts: &FormatOptions,
) -> Result<String> {
    opts.as_json(&TimedEvent {
        timestamp: at.to_rfc3339(),
        event,
    })
}

/// Text listing of discovered devices.
pub fn format_devices_text(devices: &[DeviceIdentity], opts: &FormatOptions) -> String {
    if devices.is_empty() {
        return "No Thingy:52 found.\n".to_string();
    }
    let mut out = String::new();
    for device in devices {
        let name = device.name.as_deref().unwrap_or("Unknown");
        out.push_str(&format!(
            "{:<24} {}\n",
            name,
            style::dim(&device.id, opts.no_color)
        ));
    }
    out
}

/// JSON listing of discovered devices.
pub fn format_devices_json(devices: &[DeviceIdentity], opts: &FormatOptions) -> Result<String> {
    opts.as_json(&devices)
}
