//! Utility functions for CLI operations.

use std::io::{self, IsTerminal, Write};

use anyhow::{Context, Result, anyhow};
use thingy_core::{
    BleCentral, ConnectionConfig, DeviceIdentity, Error as CoreError, ScanOptions, Session,
    SessionConfig, ThingySession,
};

use crate::cli::DeviceArgs;
use crate::config::{Config, resolve_device, resolve_scan_timeout};
use crate::style;

/// Create an idle session on the first Bluetooth adapter, filtered to the
/// requested device.
pub async fn build_session(args: &DeviceArgs, config: &Config) -> Result<ThingySession> {
    let scan = ScanOptions::new().duration_secs(resolve_scan_timeout(args.timeout, config));
    let central = BleCentral::with_options(ConnectionConfig::default(), scan)
        .await
        .map_err(explain)?;

    let mut session_config = SessionConfig::new();
    if let Some(device) = resolve_device(args.device.clone(), config) {
        session_config = session_config.identifier(device);
    }
    Ok(Session::with_config(central, session_config))
}

/// Scan for and open the device, then greet it if asked to.
pub async fn open_session(
    session: &mut ThingySession,
    args: &DeviceArgs,
    config: &Config,
    quiet: bool,
) -> Result<DeviceIdentity> {
    let wanted = resolve_device(args.device.clone(), config);
    let spinner = if !quiet && io::stderr().is_terminal() {
        Some(style::connecting_spinner(wanted.as_deref()))
    } else {
        None
    };

    let result = session.scan().await;
    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }
    let device = result.map_err(explain)?;

    if args.greet || config.greet {
        greet(session, config).await?;
    }
    Ok(device)
}

/// Light the LED white and play the configured tone.
pub async fn greet(session: &ThingySession, config: &Config) -> Result<()> {
    session
        .set_led(255, 255, 255)
        .await
        .context("Failed to set LED")?;
    session
        .play_tone(config.tone())
        .await
        .context("Failed to play tone")?;
    Ok(())
}

/// Attach a hint to errors a user can act on.
pub fn explain(error: CoreError) -> anyhow::Error {
    match error {
        CoreError::DeviceNotFound(_) => anyhow!(
            "{}\n\
             Make sure your Thingy:52 is powered on, in range and not connected elsewhere.\n\
             Run 'thingy scan --all' to list nearby devices.",
            error
        ),
        CoreError::ConnectionFailed { .. } => {
            anyhow!("{}\nTry moving closer to the device and retry.", error)
        }
        other => anyhow::Error::new(other),
    }
}

/// Write output to stdout.
pub fn write_output(content: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(content.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
