//! Watch command implementation.
//!
//! Keeps one session open and prints every relayed event. Accelerometer
//! samples are throttled by the relay. When the device drops the link the
//! session is reopened with exponential backoff.

use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use owo_colors::OwoColorize;
use thingy_core::{
    DeviceIdentity, DisconnectReason, EventKind, EventRelay, ThingyEvent, ThingySession,
};

use crate::cli::{DeviceArgs, OutputFormat};
use crate::config::{Config, resolve_throttle};
use crate::format::{FormatOptions, format_event_json, format_event_text};
use crate::util::{build_session, explain, greet, open_session, write_output};

/// Minimum backoff delay for reconnection attempts
const MIN_BACKOFF_SECS: u64 = 2;
/// Maximum backoff delay for reconnection attempts
const MAX_BACKOFF_SECS: u64 = 60;

/// Arguments for the watch command.
pub struct WatchArgs<'a> {
    pub device: &'a DeviceArgs,
    pub count: u32,
    pub throttle_ms: Option<u64>,
    pub events: &'a [EventKind],
    pub format: OutputFormat,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
    pub config: &'a Config,
}

/// Whether `kind` passes the `--events` filter. An empty filter passes all.
pub fn wanted(filter: &[EventKind], kind: EventKind) -> bool {
    filter.is_empty() || filter.contains(&kind)
}

/// Next reconnection delay, doubling up to the cap.
pub fn next_backoff(current: u64) -> u64 {
    (current * 2).min(MAX_BACKOFF_SECS)
}

pub async fn cmd_watch(args: WatchArgs<'_>) -> Result<()> {
    let WatchArgs {
        device: device_args,
        count,
        throttle_ms,
        events: filter,
        format,
        quiet,
        opts,
        config,
    } = args;

    let window = resolve_throttle(throttle_ms, config);
    let mut session = build_session(device_args, config).await?;
    let (relay, mut rx) = EventRelay::attach(&mut session, window);
    let device = open_session(&mut session, device_args, config, quiet).await?;

    if !quiet {
        print_header(&device, window, count, opts);
    }

    let mut printed: u32 = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nShutting down...");
                break;
            }
            running = session.pump() => {
                if !running {
                    break;
                }
            }
            Some(event) = rx.recv() => {
                let kind = event.kind();
                if wanted(filter, kind) {
                    print_event(&event, format, opts)?;
                    if kind.is_reading() {
                        printed += 1;
                    }
                }
                if count > 0 && printed >= count {
                    if !quiet {
                        eprintln!("Received {} events.", printed);
                    }
                    break;
                }
                if let ThingyEvent::Disconnect { reason: DisconnectReason::Remote, .. } = event {
                    eprintln!("Connection lost. Reconnecting...");
                    if !reconnect(&mut session, &device, config).await {
                        break;
                    }
                }
            }
        }
    }

    relay.detach(&mut session);
    session.disconnect().await.ok();
    Ok(())
}

fn print_header(device: &DeviceIdentity, window: Duration, count: u32, opts: &FormatOptions) {
    let name = device.name.as_deref().unwrap_or("Unknown");
    let header = if opts.no_color {
        format!("Watching: {} ({})", name, device.id)
    } else {
        format!("Watching: {} ({})", name.green(), device.id.cyan())
    };
    eprintln!("{}", header);
    if count > 0 {
        eprintln!(
            "Throttle: {}ms | Count: {} | Press Ctrl+C to stop",
            window.as_millis(),
            count
        );
    } else {
        eprintln!(
            "Throttle: {}ms | Press Ctrl+C to stop",
            window.as_millis()
        );
    }
    eprintln!("{}", "-".repeat(50));
}

fn print_event(event: &ThingyEvent, format: OutputFormat, opts: &FormatOptions) -> Result<()> {
    let content = match format {
        OutputFormat::Json => format_event_json(event, Local::now(), opts)?,
        OutputFormat::Text => format_event_text(event, Local::now(), opts),
    };
    write_output(&content)
}

/// Reopen `device` until it succeeds. Returns `false` on Ctrl+C.
async fn reconnect(session: &mut ThingySession, device: &DeviceIdentity, config: &Config) -> bool {
    let mut backoff_secs = MIN_BACKOFF_SECS;
    loop {
        match session.open(device.clone()).await {
            Ok(()) => {
                if config.greet
                    && let Err(e) = greet(session, config).await
                {
                    eprintln!("Greeting failed: {:#}", e);
                }
                return true;
            }
            Err(e) => {
                eprintln!(
                    "Connection failed: {}. Retrying in {}s...",
                    explain(e),
                    backoff_secs
                );
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nShutting down...");
                return false;
            }
            _ = tokio::time::sleep(Duration::from_secs(backoff_secs)) => {}
        }
        backoff_secs = next_backoff(backoff_secs);
    }
}
