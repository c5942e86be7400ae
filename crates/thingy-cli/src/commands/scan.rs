//! Scan command implementation.

use std::io::{self, IsTerminal};

use anyhow::Result;
use thingy_core::{
    BleCentral, Central, ConnectionConfig, DeviceFilter, Error as CoreError, ScanOptions,
};

use crate::cli::OutputFormat;
use crate::config::{Config, resolve_scan_timeout};
use crate::format::{FormatOptions, format_devices_json, format_devices_text};
use crate::style;
use crate::util::{explain, write_output};

pub async fn cmd_scan(
    timeout: Option<u64>,
    all: bool,
    format: OutputFormat,
    quiet: bool,
    opts: &FormatOptions,
    config: &Config,
) -> Result<()> {
    let timeout = resolve_scan_timeout(timeout, config);

    // A full listing is a single pass; finding one device retries with longer scans.
    let mut options = ScanOptions::new().duration_secs(timeout);
    if all {
        options = options.attempts(1);
    }
    let central = BleCentral::with_options(ConnectionConfig::default(), options)
        .await
        .map_err(explain)?;

    let spinner = if !quiet && matches!(format, OutputFormat::Text) && io::stderr().is_terminal()
    {
        Some(style::scanning_spinner(timeout))
    } else {
        None
    };

    let filter = DeviceFilter::thingy52();
    let result = if all {
        central.discover(&filter).await
    } else {
        central.request_device(&filter).await.map(|d| vec![d])
    };

    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }

    let devices = match result {
        Ok(devices) => devices,
        Err(CoreError::DeviceNotFound(_)) => Vec::new(),
        Err(e) => return Err(explain(e)),
    };

    let content = match format {
        OutputFormat::Json => format_devices_json(&devices, opts)?,
        OutputFormat::Text => format_devices_text(&devices, opts),
    };
    write_output(&content)?;

    if !quiet && !devices.is_empty() && matches!(format, OutputFormat::Text) {
        eprintln!();
        eprintln!("Tip: save a default with 'thingy config set device <NAME_OR_ADDRESS>'");
    }
    Ok(())
}
