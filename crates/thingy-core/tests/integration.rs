//! Session integration tests for thingy-core.
//!
//! These tests drive the full session state machine through the mock
//! transport and need no BLE hardware:
//! `cargo test --package thingy-core --test integration`

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thingy_core::{
    ConnectionFailureReason, DisconnectReason, Endpoint, Error, EventKind, EventRelay, LedColor,
    MockCentral, Session, SessionConfig, SessionState, SharedSession, ThingyEvent,
};

type Log = Arc<Mutex<Vec<ThingyEvent>>>;

/// Record every event the session emits, in emission order.
fn record(session: &mut Session<MockCentral>) -> Log {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    for kind in EventKind::ALL {
        let log = Arc::clone(&log);
        session.on(kind, move |event| log.lock().unwrap().push(event.clone()));
    }
    log
}

fn kinds(log: &Log) -> Vec<EventKind> {
    log.lock().unwrap().iter().map(ThingyEvent::kind).collect()
}

fn session_with(central: &MockCentral) -> (Session<MockCentral>, Log) {
    let mut session = Session::new(central.clone());
    let log = record(&mut session);
    (session, log)
}

// --- Opening ---

#[tokio::test]
async fn test_scan_reaches_active() {
    let central = MockCentral::builder().address("AA:BB").battery(90).build();
    let (mut session, log) = session_with(&central);

    let device = session.scan().await.unwrap();

    assert_eq!(device.id, "AA:BB");
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.device(), Some(&device));
    assert_eq!(session.endpoints(), Endpoint::ALL.to_vec());
    assert_eq!(
        kinds(&log),
        vec![EventKind::BeforeConnect, EventKind::Battery, EventKind::Connect]
    );
}

#[tokio::test]
async fn test_open_resolves_and_subscribes_in_order() {
    let central = MockCentral::new();
    let (mut session, _log) = session_with(&central);

    session.open(central.device()).await.unwrap();

    assert_eq!(
        central.subscriptions(),
        vec![
            Endpoint::Accelerometer,
            Endpoint::Temperature,
            Endpoint::Button,
            Endpoint::Battery,
        ]
    );
}

#[tokio::test]
async fn test_battery_priming_read() {
    let central = MockCentral::builder().battery(64).build();
    let (mut session, log) = session_with(&central);
    let device = central.device();

    session.open(device.clone()).await.unwrap();

    assert_eq!(central.read_count(), 1);
    let events = log.lock().unwrap().clone();
    assert_eq!(
        events[1],
        ThingyEvent::Battery {
            device_id: device.id,
            battery_level: 64,
        }
    );
}

#[tokio::test]
async fn test_missing_battery_still_connects() {
    let central = MockCentral::builder().without(Endpoint::Battery).build();
    let (mut session, log) = session_with(&central);

    session.open(central.device()).await.unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert!(!session.has_endpoint(Endpoint::Battery));

    // The device keeps sending battery values; none reach the bus.
    central.notify(Endpoint::Battery, &[50]);
    session.dispatch_pending().await;

    assert_eq!(kinds(&log), vec![EventKind::BeforeConnect, EventKind::Connect]);
}

#[tokio::test]
async fn test_failed_priming_read_still_connects() {
    let central = MockCentral::builder().fail_reads().build();
    let (mut session, log) = session_with(&central);

    session.open(central.device()).await.unwrap();

    assert!(session.has_endpoint(Endpoint::Battery));
    assert_eq!(kinds(&log), vec![EventKind::BeforeConnect, EventKind::Connect]);
}

#[tokio::test]
async fn test_missing_mandatory_endpoint_fails() {
    let central = MockCentral::builder().without(Endpoint::Button).build();
    let (mut session, log) = session_with(&central);

    let err = session.open(central.device()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::ConnectionFailed {
            reason: ConnectionFailureReason::MissingEndpoint(Endpoint::Button),
            ..
        }
    ));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.device().is_none());
    assert!(session.endpoints().is_empty());
    assert!(!central.is_connected());
    assert_eq!(kinds(&log), vec![EventKind::BeforeConnect]);
}

#[tokio::test]
async fn test_failed_subscription_fails_open() {
    let central = MockCentral::builder()
        .fail_subscribe(Endpoint::Temperature)
        .build();
    let (mut session, _log) = session_with(&central);

    let err = session.open(central.device()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::ConnectionFailed {
            reason: ConnectionFailureReason::MissingEndpoint(Endpoint::Temperature),
            ..
        }
    ));
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_connect_failure_then_retry() {
    let central = MockCentral::builder().fail_connect().build();
    let (mut session, log) = session_with(&central);

    let err = session.scan().await.unwrap_err();
    assert!(matches!(
        err,
        Error::ConnectionFailed {
            reason: ConnectionFailureReason::Timeout,
            ..
        }
    ));
    assert_eq!(session.state(), SessionState::Failed);

    central.set_fail_connect(false);
    session.scan().await.unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(central.connect_count(), 2);
    assert_eq!(
        kinds(&log),
        vec![
            EventKind::BeforeConnect,
            EventKind::BeforeConnect,
            EventKind::Battery,
            EventKind::Connect,
        ]
    );
}

#[tokio::test]
async fn test_scan_without_device() {
    let central = MockCentral::new();
    central.set_advertising(false);
    let (mut session, log) = session_with(&central);

    assert!(matches!(
        session.scan().await,
        Err(Error::DeviceNotFound(_))
    ));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_scan_with_identifier() {
    let central = MockCentral::builder().name("Thingy-Kitchen").build();
    let mut session = Session::with_config(
        central.clone(),
        SessionConfig::new().identifier("kitchen"),
    );

    let device = session.scan().await.unwrap();
    assert_eq!(device.name.as_deref(), Some("Thingy-Kitchen"));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_open_is_busy_until_disconnect() {
    let central = MockCentral::new();
    central.set_connect_latency(Duration::from_millis(200));
    let (mut session, log) = session_with(&central);

    let cancelled =
        tokio::time::timeout(Duration::from_millis(20), session.open(central.device())).await;
    assert!(cancelled.is_err());
    assert_eq!(session.state(), SessionState::Connecting);

    let err = session.open(central.device()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::SessionBusy {
            state: SessionState::Connecting
        }
    ));
    assert!(matches!(
        session.scan().await,
        Err(Error::SessionBusy { .. })
    ));

    session.disconnect().await.unwrap();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(!kinds(&log).contains(&EventKind::Disconnect));

    central.set_connect_latency(Duration::ZERO);
    session.open(central.device()).await.unwrap();
    assert_eq!(session.state(), SessionState::Active);
}

// --- Replacing ---

#[tokio::test]
async fn test_open_while_active_replaces_session() {
    let central = MockCentral::new();
    let (mut session, log) = session_with(&central);
    let device = central.device();

    session.open(device.clone()).await.unwrap();
    log.lock().unwrap().clear();

    session.open(device.clone()).await.unwrap();

    let events = log.lock().unwrap().clone();
    assert_eq!(
        events[0],
        ThingyEvent::Disconnect {
            device_id: device.id.clone(),
            reason: DisconnectReason::SessionReplaced,
        }
    );
    assert_eq!(events[1].kind(), EventKind::BeforeConnect);
    assert_eq!(events.last().map(ThingyEvent::kind), Some(EventKind::Connect));
    assert_eq!(central.disconnect_count(), 1);
    assert_eq!(session.endpoints(), Endpoint::ALL.to_vec());
}

#[tokio::test]
async fn test_replaced_session_handles_are_fresh() {
    let central = MockCentral::new();
    let (mut session, log) = session_with(&central);

    session.open(central.device()).await.unwrap();
    central.set_missing(Endpoint::Battery, true);
    session.open(central.device()).await.unwrap();
    log.lock().unwrap().clear();

    assert!(!session.has_endpoint(Endpoint::Battery));
    central.notify(Endpoint::Battery, &[10]);
    central.notify(Endpoint::Button, &[1]);
    session.dispatch_pending().await;

    assert_eq!(kinds(&log), vec![EventKind::Button]);
}

// --- Notifications ---

#[tokio::test]
async fn test_notifications_become_events() {
    let central = MockCentral::builder().address("AA:BB").build();
    let (mut session, log) = session_with(&central);
    session.open(central.device()).await.unwrap();
    log.lock().unwrap().clear();

    central.notify(Endpoint::Temperature, &[20, 12]);
    central.notify(Endpoint::Button, &[1]);
    central.notify(Endpoint::Button, &[2]);
    let mut accel = Vec::new();
    for value in [0.5f32, -0.25, 1.0] {
        accel.extend_from_slice(&value.to_le_bytes());
    }
    central.notify(Endpoint::Accelerometer, &accel);

    assert_eq!(session.dispatch_pending().await, 4);

    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            ThingyEvent::Temperature {
                device_id: "AA:BB".to_string(),
                temperature: 20.12,
            },
            ThingyEvent::Button {
                device_id: "AA:BB".to_string(),
                pressed: true,
            },
            ThingyEvent::Button {
                device_id: "AA:BB".to_string(),
                pressed: false,
            },
            ThingyEvent::Accelerometer {
                x: 0.5,
                y: -0.25,
                z: 1.0,
            },
        ]
    );
}

#[tokio::test]
async fn test_malformed_notification_is_dropped() {
    let central = MockCentral::new();
    let (mut session, log) = session_with(&central);
    session.open(central.device()).await.unwrap();
    log.lock().unwrap().clear();

    central.notify(Endpoint::Temperature, &[20]);
    central.notify(Endpoint::Temperature, &[21, 5]);
    session.dispatch_pending().await;

    assert_eq!(kinds(&log), vec![EventKind::Temperature]);
    assert_eq!(session.state(), SessionState::Active);
}

#[tokio::test]
async fn test_pump_delivers_one_event() {
    let central = MockCentral::new();
    let mut session = Session::new(central.clone());
    let mut rx = session.subscribe();
    session.open(central.device()).await.unwrap();

    central.notify(Endpoint::Button, &[1]);
    assert!(session.pump().await);

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    assert_eq!(last.map(|e| e.kind()), Some(EventKind::Button));
}

// --- Disconnecting ---

#[tokio::test]
async fn test_explicit_disconnect() {
    let central = MockCentral::new();
    let (mut session, log) = session_with(&central);
    let device = central.device();
    session.open(device.clone()).await.unwrap();
    log.lock().unwrap().clear();

    session.disconnect().await.unwrap();

    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.device().is_none());
    assert!(session.endpoints().is_empty());
    assert!(!central.is_connected());
    assert_eq!(
        log.lock().unwrap().clone(),
        vec![ThingyEvent::Disconnect {
            device_id: device.id,
            reason: DisconnectReason::UserRequested,
        }]
    );
}

#[tokio::test]
async fn test_disconnect_when_idle_is_noop() {
    let central = MockCentral::new();
    let (mut session, log) = session_with(&central);

    session.disconnect().await.unwrap();

    assert_eq!(session.state(), SessionState::Idle);
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(central.disconnect_count(), 0);
}

#[tokio::test]
async fn test_hardware_disconnect() {
    let central = MockCentral::new();
    let (mut session, log) = session_with(&central);
    let device = central.device();
    session.open(device.clone()).await.unwrap();
    log.lock().unwrap().clear();

    central.drop_connection();
    session.dispatch_pending().await;

    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.device().is_none());
    assert!(session.endpoints().is_empty());
    assert_eq!(
        log.lock().unwrap().clone(),
        vec![ThingyEvent::Disconnect {
            device_id: device.id,
            reason: DisconnectReason::Remote,
        }]
    );
}

#[tokio::test]
async fn test_events_from_old_link_are_ignored() {
    let central = MockCentral::new();
    let (mut session, log) = session_with(&central);
    session.open(central.device()).await.unwrap();

    // Queued on the first link, delivered after the session moved on.
    central.notify(Endpoint::Button, &[1]);
    central.drop_connection();
    session.disconnect().await.unwrap();
    log.lock().unwrap().clear();

    assert_eq!(session.dispatch_pending().await, 2);
    assert!(log.lock().unwrap().is_empty());
}

// --- Commands ---

#[tokio::test]
async fn test_commands_while_idle_are_ignored() {
    let central = MockCentral::new();
    let session = Session::new(central.clone());

    session.set_led(255, 0, 0).await.unwrap();
    session
        .set_led_breathe(LedColor::Blue, 50, 300)
        .await
        .unwrap();
    session
        .set_led_flash_once(LedColor::Red, 20, None)
        .await
        .unwrap();
    session.set_led_off().await.unwrap();
    session.beep(440, 100, 50).await.unwrap();

    assert!(central.writes().is_empty());
}

#[tokio::test]
async fn test_led_commands_write_payloads() {
    let central = MockCentral::new();
    let mut session = Session::new(central.clone());
    session.open(central.device()).await.unwrap();

    session.set_led(255, 128, 0).await.unwrap();
    session
        .set_led_breathe(LedColor::Blue, 50, 300)
        .await
        .unwrap();
    session
        .set_led_flash_once(LedColor::Red, 20, None)
        .await
        .unwrap();
    session
        .set_led_flash_once(LedColor::Green, 20, Some(5))
        .await
        .unwrap();
    session.set_led_off().await.unwrap();

    assert_eq!(
        central.writes(),
        vec![
            (Endpoint::Led, vec![1, 255, 128, 0]),
            (Endpoint::Led, vec![2, 4, 50, 44, 1]),
            (Endpoint::Led, vec![3, 1, 20]),
            (Endpoint::Led, vec![3, 2, 20, 5]),
            (Endpoint::Led, vec![0]),
        ]
    );
}

#[tokio::test]
async fn test_beep_writes_mode_then_tone() {
    let central = MockCentral::new();
    let mut session = Session::new(central.clone());
    session.open(central.device()).await.unwrap();

    session.beep(440, 1000, 80).await.unwrap();

    assert_eq!(
        central.writes(),
        vec![
            (Endpoint::SoundConfig, vec![1, 1]),
            (Endpoint::Speaker, vec![0xB8, 0x01, 0xE8, 0x03, 80]),
        ]
    );
}

#[tokio::test]
async fn test_commands_without_handle_are_ignored() {
    let central = MockCentral::builder()
        .without(Endpoint::Led)
        .without(Endpoint::Speaker)
        .build();
    let mut session = Session::new(central.clone());
    session.open(central.device()).await.unwrap();

    session.set_led(1, 2, 3).await.unwrap();
    session.beep(1000, 100, 100).await.unwrap();

    assert!(central.writes().is_empty());
}

#[tokio::test]
async fn test_write_failure_is_reported() {
    let central = MockCentral::new();
    let mut session = Session::new(central.clone());
    session.open(central.device()).await.unwrap();
    central.set_fail_writes(true);

    assert!(matches!(
        session.set_led_off().await,
        Err(Error::WriteFailed { .. })
    ));
    // The tone is never sent when selecting the mode fails.
    assert!(session.beep(1000, 100, 100).await.is_err());
    assert!(central.writes().is_empty());
}

#[tokio::test]
async fn test_commands_after_disconnect_are_ignored() {
    let central = MockCentral::new();
    let mut session = Session::new(central.clone());
    session.open(central.device()).await.unwrap();
    session.disconnect().await.unwrap();

    session.set_led(255, 255, 255).await.unwrap();
    assert!(central.writes().is_empty());
}

// --- Relay ---

#[tokio::test(start_paused = true)]
async fn test_relay_throttles_accelerometer() {
    let central = MockCentral::new();
    let mut session = Session::new(central.clone());
    let (handle, mut rx) = EventRelay::attach(&mut session, Duration::from_millis(500));
    session.open(central.device()).await.unwrap();

    let accel = [0u8; 12];
    central.notify(Endpoint::Accelerometer, &accel);
    central.notify(Endpoint::Accelerometer, &accel);
    central.notify(Endpoint::Button, &[1]);
    session.dispatch_pending().await;

    tokio::time::advance(Duration::from_millis(600)).await;
    central.notify(Endpoint::Accelerometer, &accel);
    session.dispatch_pending().await;

    let mut relayed = Vec::new();
    while let Ok(event) = rx.try_recv() {
        relayed.push(event.kind());
    }
    assert_eq!(
        relayed,
        vec![
            EventKind::BeforeConnect,
            EventKind::Battery,
            EventKind::Connect,
            EventKind::Accelerometer,
            EventKind::Button,
            EventKind::Accelerometer,
        ]
    );

    handle.detach(&mut session);
    central.notify(Endpoint::Button, &[0]);
    session.dispatch_pending().await;
    assert!(rx.try_recv().is_err());
}

// --- Shared session ---

#[tokio::test(start_paused = true)]
async fn test_shared_session_rejects_overlapping_open() {
    let central = MockCentral::new();
    central.set_connect_latency(Duration::from_secs(1));
    let shared = SharedSession::new(Session::new(central.clone()));

    let first = {
        let shared = shared.clone();
        let device = central.device();
        tokio::spawn(async move { shared.open(device).await })
    };
    while shared.state() != SessionState::Connecting {
        tokio::task::yield_now().await;
    }

    let err = shared.open(central.device()).await.unwrap_err();
    assert!(matches!(err, Error::SessionBusy { .. }));
    assert!(matches!(
        shared.disconnect().await,
        Err(Error::SessionBusy { .. })
    ));

    first.await.unwrap().unwrap();
    assert_eq!(shared.state(), SessionState::Active);
    assert_eq!(central.connect_count(), 1);
}

#[tokio::test]
async fn test_shared_session_pump_and_commands() {
    let central = MockCentral::new();
    let shared = SharedSession::new(Session::new(central.clone()));
    let mut rx = shared.subscribe().await;

    shared.scan().await.unwrap();
    shared.set_led(0, 255, 0).await.unwrap();

    central.notify(Endpoint::Button, &[1]);
    assert!(shared.pump().await);

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(event.kind());
    }
    assert_eq!(kinds.last(), Some(&EventKind::Button));
    assert_eq!(central.writes(), vec![(Endpoint::Led, vec![1, 0, 255, 0])]);

    // The shared wrapper owns the event queue now.
    assert!(!shared.lock().await.pump().await);
}

#[tokio::test(start_paused = true)]
async fn test_shared_pump_waits_across_reconnect() {
    let central = MockCentral::new();
    let shared = SharedSession::new(Session::new(central.clone()));
    shared.scan().await.unwrap();

    central.drop_connection();
    assert!(shared.pump().await);
    assert_eq!(shared.state(), SessionState::Idle);

    let idle = tokio::time::timeout(Duration::from_secs(5), shared.pump()).await;
    assert!(idle.is_err(), "pump should keep waiting while idle");

    shared.open(central.device()).await.unwrap();
    central.notify(Endpoint::Button, &[1]);
    assert!(shared.pump().await);
}
