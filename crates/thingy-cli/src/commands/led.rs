//! LED command implementation.

use anyhow::{Context, Result};
use thingy_core::{LedCommand, Rgb, ThingySession, random_rgb};

use crate::cli::{DeviceArgs, LedAction};
use crate::config::Config;
use crate::util::{build_session, open_session};

/// Translate a CLI action into the command written to the device.
pub fn led_command(action: &LedAction) -> LedCommand {
    match *action {
        LedAction::On { red, green, blue } => LedCommand::On(Rgb::new(red, green, blue)),
        LedAction::Breathe {
            color,
            intensity,
            delay,
        } => LedCommand::Breathe {
            color,
            intensity,
            delay_ms: delay,
        },
        LedAction::Flash {
            color,
            intensity,
            delay,
        } => LedCommand::FlashOnce {
            color,
            intensity,
            delay,
        },
        LedAction::Off => LedCommand::Off,
        LedAction::Random => LedCommand::On(random_rgb()),
    }
}

fn describe(command: &LedCommand) -> String {
    match command {
        LedCommand::On(rgb) => format!("LED on #{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b),
        LedCommand::Breathe {
            color,
            intensity,
            delay_ms,
        } => format!(
            "LED breathing {} at {}% every {} ms",
            color, intensity, delay_ms
        ),
        LedCommand::FlashOnce {
            color, intensity, ..
        } => format!("LED flashed {} at {}%", color, intensity),
        LedCommand::Off => "LED off".to_string(),
    }
}

pub async fn cmd_led(
    device: &DeviceArgs,
    action: &LedAction,
    quiet: bool,
    config: &Config,
) -> Result<()> {
    let mut session = build_session(device, config).await?;
    open_session(&mut session, device, config, quiet).await?;

    let command = led_command(action);
    let result = send(&session, command).await;
    session.disconnect().await.ok();
    result?;

    if !quiet {
        eprintln!("{}", describe(&command));
    }
    Ok(())
}

async fn send(session: &ThingySession, command: LedCommand) -> Result<()> {
    session
        .write_led(command)
        .await
        .context("Failed to write LED command")
}

#[cfg(test)]
mod tests {
    use thingy_core::LedColor;

    use super::*;

    #[test]
    fn test_led_command_mapping() {
        assert_eq!(
            led_command(&LedAction::On {
                red: 1,
                green: 2,
                blue: 3
            }),
            LedCommand::On(Rgb::new(1, 2, 3))
        );
        assert_eq!(
            led_command(&LedAction::Breathe {
                color: LedColor::Blue,
                intensity: 50,
                delay: 300
            }),
            LedCommand::Breathe {
                color: LedColor::Blue,
                intensity: 50,
                delay_ms: 300
            }
        );
        assert_eq!(
            led_command(&LedAction::Flash {
                color: LedColor::Red,
                intensity: 20,
                delay: Some(5)
            }),
            LedCommand::FlashOnce {
                color: LedColor::Red,
                intensity: 20,
                delay: Some(5)
            }
        );
        assert_eq!(led_command(&LedAction::Off), LedCommand::Off);
        assert!(matches!(led_command(&LedAction::Random), LedCommand::On(_)));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&LedCommand::On(Rgb::new(255, 0, 16))), "LED on #ff0010");
        assert_eq!(describe(&LedCommand::Off), "LED off");
        assert_eq!(
            describe(&LedCommand::Breathe {
                color: LedColor::Cyan,
                intensity: 20,
                delay_ms: 3500
            }),
            "LED breathing cyan at 20% every 3500 ms"
        );
    }
}
