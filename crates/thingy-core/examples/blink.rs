//! Example: LED and Speaker Commands
//!
//! This example connects to a Thingy:52, cycles the LED through each
//! command mode, plays a short tone and disconnects.
//!
//! Run with: `cargo run --example blink -- [NAME_OR_ADDRESS]`

use std::env;
use std::time::Duration;

use thingy_core::{LedColor, Session, SessionConfig, random_rgb};
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut config = SessionConfig::new();
    if let Some(identifier) = env::args().nth(1) {
        config = config.identifier(identifier);
    }

    let mut session = Session::ble(config).await?;
    let device = session.scan().await?;
    println!("Connected to {}", device);

    let rgb = random_rgb();
    println!("Constant #{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b);
    session.set_led(rgb.r, rgb.g, rgb.b).await?;
    sleep(Duration::from_secs(2)).await;

    for color in LedColor::ALL {
        println!("Flash {}", color);
        session.set_led_flash_once(color, 20, None).await?;
        sleep(Duration::from_millis(600)).await;
    }

    println!("Breathe cyan");
    session.set_led_breathe(LedColor::Cyan, 50, 1000).await?;
    sleep(Duration::from_secs(4)).await;

    println!("Beep");
    session.beep(880, 200, 60).await?;
    sleep(Duration::from_millis(300)).await;

    session.set_led_off().await?;
    session.disconnect().await?;
    println!("Done");
    Ok(())
}
