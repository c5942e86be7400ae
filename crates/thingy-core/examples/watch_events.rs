//! Example: Watching Thingy:52 Events
//!
//! This example connects to the first Thingy:52 in range (or the one
//! matching the optional argument), prints every event it publishes and
//! keeps running until Ctrl+C.
//!
//! Run with: `cargo run --example watch_events -- [NAME_OR_ADDRESS]`

use std::env;

use thingy_core::{EventKind, Session, SessionConfig, ThingyEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut config = SessionConfig::new();
    if let Some(identifier) = env::args().nth(1) {
        config = config.identifier(identifier);
    }

    let mut session = Session::ble(config).await?;
    for kind in EventKind::ALL {
        session.on(kind, print_event);
    }

    println!("Scanning for a Thingy:52...");
    let device = session.scan().await?;
    println!("Watching {} (press Ctrl+C to stop)", device);
    println!();

    loop {
        tokio::select! {
            running = session.pump() => {
                if !running {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    session.disconnect().await?;
    Ok(())
}

fn print_event(event: &ThingyEvent) {
    match event {
        ThingyEvent::BeforeConnect { device } => println!("  connecting    {}", device),
        ThingyEvent::Connect { device } => println!("  connected     {}", device),
        ThingyEvent::Disconnect { reason, .. } => println!("  disconnected  {:?}", reason),
        ThingyEvent::Battery { battery_level, .. } => println!("  battery       {}%", battery_level),
        ThingyEvent::Temperature { temperature, .. } => {
            println!("  temperature   {:.2} °C", temperature)
        }
        ThingyEvent::Accelerometer { x, y, z } => {
            println!("  gravity       x={:+.3} y={:+.3} z={:+.3}", x, y, z)
        }
        ThingyEvent::Button { pressed, .. } => {
            println!("  button        {}", if *pressed { "pressed" } else { "released" })
        }
        other => println!("  {:?}", other),
    }
}
