//! Beep command implementation.

use anyhow::{Context, Result};
use thingy_core::Tone;

use crate::cli::DeviceArgs;
use crate::config::Config;
use crate::util::{build_session, open_session};

/// Explicit arguments override the configured tone field by field.
pub fn resolve_tone(
    frequency: Option<u16>,
    duration: Option<u16>,
    volume: Option<u8>,
    config: &Config,
) -> Tone {
    let base = config.tone();
    Tone::new(
        frequency.unwrap_or(base.frequency_hz),
        duration.unwrap_or(base.duration_ms),
        volume.unwrap_or(base.volume),
    )
}

pub async fn cmd_beep(
    device: &DeviceArgs,
    frequency: Option<u16>,
    duration: Option<u16>,
    volume: Option<u8>,
    quiet: bool,
    config: &Config,
) -> Result<()> {
    let tone = resolve_tone(frequency, duration, volume, config);

    let mut session = build_session(device, config).await?;
    open_session(&mut session, device, config, quiet).await?;

    let result = session.play_tone(tone).await.context("Failed to play tone");
    // The speaker stops when the link is released.
    tokio::time::sleep(std::time::Duration::from_millis(u64::from(tone.duration_ms))).await;
    session.disconnect().await.ok();
    result?;

    if !quiet {
        eprintln!(
            "Played {} Hz for {} ms at volume {}",
            tone.frequency_hz, tone.duration_ms, tone.volume
        );
    }
    Ok(())
}
