//! Hardware integration tests for thingy-core
//!
//! These tests require a powered Thingy:52 in range and should be run with:
//! ```
//! cargo test --package thingy-core --test hardware_tests -- --ignored --nocapture --test-threads=1
//! ```
//!
//! Select the device via an environment variable:
//! - `THINGY_DEVICE`: name or address fragment of the Thingy:52 to use
//!
//! Example:
//! ```
//! THINGY_DEVICE="Thingy" cargo test --package thingy-core --test hardware_tests -- --ignored --nocapture
//! ```

use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thingy_core::{
    BleCentral, DeviceFilter, Endpoint, EventKind, LedColor, Session, SessionConfig, SessionState,
    ThingyEvent,
};
use tokio::time::timeout;

/// Default timeout for BLE operations
const BLE_TIMEOUT: Duration = Duration::from_secs(45);

/// How long to listen for notifications
const LISTEN_WINDOW: Duration = Duration::from_secs(5);

fn session_config() -> SessionConfig {
    match env::var("THINGY_DEVICE").ok().filter(|s| !s.is_empty()) {
        Some(device) => SessionConfig::new().identifier(device),
        None => SessionConfig::new(),
    }
}

async fn open_session() -> Session<BleCentral> {
    let mut session = Session::ble(session_config())
        .await
        .expect("Bluetooth adapter available");
    match timeout(BLE_TIMEOUT, session.scan()).await {
        Ok(Ok(device)) => println!("Connected to {}", device),
        Ok(Err(e)) => panic!("Failed to open session: {}", e),
        Err(_) => panic!("Opening the session timed out"),
    }
    session
}

/// Drive the session for `window`, dispatching whatever arrives.
async fn listen(session: &mut Session<BleCentral>, window: Duration) {
    let _ = timeout(window, async {
        while session.pump().await {}
    })
    .await;
}

// --- Discovery ---

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_discover_devices() {
    let central = BleCentral::new().await.expect("Bluetooth adapter available");
    let devices = timeout(BLE_TIMEOUT, central.discover(&DeviceFilter::thingy52()))
        .await
        .expect("discovery timed out")
        .expect("discovery failed");

    println!("Discovered {} device(s):", devices.len());
    for device in &devices {
        println!("  - {}", device);
    }
}

// --- Session ---

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_open_resolves_mandatory_endpoints() {
    let mut session = open_session().await;

    assert_eq!(session.state(), SessionState::Active);
    for endpoint in Endpoint::MANDATORY {
        assert!(session.has_endpoint(endpoint), "{} not resolved", endpoint);
    }
    println!("Resolved endpoints: {:?}", session.endpoints());

    session.disconnect().await.unwrap();
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_receives_sensor_notifications() {
    let mut session = Session::ble(session_config())
        .await
        .expect("Bluetooth adapter available");
    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in [EventKind::Accelerometer, EventKind::Temperature] {
        let seen = Arc::clone(&seen);
        session.on(kind, move |event: &ThingyEvent| {
            seen.lock().unwrap().push(event.clone());
        });
    }

    timeout(BLE_TIMEOUT, session.scan())
        .await
        .expect("open timed out")
        .expect("open failed");
    listen(&mut session, LISTEN_WINDOW).await;

    let seen = seen.lock().unwrap().clone();
    println!("Received {} notification(s)", seen.len());
    assert!(
        seen.iter().any(|e| e.kind() == EventKind::Accelerometer),
        "no accelerometer samples in {:?}",
        LISTEN_WINDOW
    );
    for event in seen.iter().filter(|e| e.kind() == EventKind::Temperature) {
        if let ThingyEvent::Temperature { temperature, .. } = event {
            assert!((-40.0..=85.0).contains(temperature), "implausible {}", temperature);
        }
    }

    session.disconnect().await.unwrap();
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_reopen_replaces_session() {
    let mut session = open_session().await;
    let device = session.device().cloned().expect("device bound");

    timeout(BLE_TIMEOUT, session.open(device))
        .await
        .expect("reopen timed out")
        .expect("reopen failed");
    assert_eq!(session.state(), SessionState::Active);

    session.disconnect().await.unwrap();
}

// --- Commands ---

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_led_commands() {
    let mut session = open_session().await;

    session.set_led(0, 64, 0).await.expect("constant color");
    tokio::time::sleep(Duration::from_secs(1)).await;
    session
        .set_led_breathe(LedColor::Blue, 50, 300)
        .await
        .expect("breathe");
    tokio::time::sleep(Duration::from_secs(2)).await;
    session
        .set_led_flash_once(LedColor::Red, 20, None)
        .await
        .expect("flash once");
    tokio::time::sleep(Duration::from_secs(1)).await;
    session.set_led_off().await.expect("off");

    session.disconnect().await.unwrap();
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_beep() {
    let mut session = open_session().await;

    session.beep(1000, 100, 50).await.expect("beep");

    session.disconnect().await.unwrap();
}
