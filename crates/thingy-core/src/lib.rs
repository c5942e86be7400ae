//! BLE session driver for the Nordic Thingy:52.
//!
//! This crate turns one Thingy:52 into a typed event source plus a small set
//! of actuator commands. It discovers the device, resolves its endpoints,
//! subscribes to sensor notifications, decodes them and publishes typed
//! events.
//!
//! # Features
//!
//! - **Device discovery**: Scan for a Thingy:52 via BLE
//! - **Session state machine**: Connect, resolve, subscribe and tear down in a fixed order
//! - **Typed events**: Battery, temperature, accelerometer and button readings
//! - **Commands**: LED (constant, breathe, flash once, off) and tones
//! - **Event relay**: Re-publish events with accelerometer rate limiting
//! - **Mock transport**: Drive the session in tests without hardware
//!
//! # Endpoints
//!
//! | Endpoint | Direction | Required |
//! |----------|-----------|----------|
//! | Accelerometer | notify | yes |
//! | Temperature | notify | yes |
//! | Button | notify | yes |
//! | Battery | read + notify | no |
//! | LED, sound | write | for commands only |
//!
//! # Platform Differences
//!
//! - **macOS**: Devices are identified by a UUID assigned by CoreBluetooth.
//! - **Linux/Windows**: Devices are identified by their Bluetooth MAC address.
//!
//! # Quick Start
//!
//! ```no_run
//! use thingy_core::{EventKind, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::ble(SessionConfig::default()).await?;
//!     session.on(EventKind::Button, |event| println!("{:?}", event));
//!
//!     let device = session.scan().await?;
//!     println!("Connected to {}", device);
//!     session.set_led(255, 255, 255).await?;
//!
//!     while session.pump().await {}
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod error;
pub mod events;
pub mod mock;
pub mod relay;
pub mod router;
pub mod scan;
pub mod session;
pub mod shared;
pub mod transport;
pub mod util;

// Core exports
pub use ble::{BleCentral, BleLink, ConnectionConfig};
pub use error::{ConnectionFailureReason, DeviceNotFoundReason, Error, Result};
pub use events::{
    DisconnectReason, EVENT_NAMESPACE, EventBus, EventKind, EventReceiver, Subscription,
    ThingyEvent,
};
pub use mock::{MockCentral, MockCentralBuilder, MockLink};
pub use relay::{DEFAULT_THROTTLE_WINDOW, EventRelay, RelayHandle, RelayReceiver, Throttle};
pub use router::NotificationRouter;
pub use scan::{DiscoveredDevice, ScanOptions};
pub use session::{Session, SessionConfig, SessionState};
pub use shared::SharedSession;
pub use transport::{
    Central, CharacteristicHandle, DeviceFilter, DeviceIdentity, Link, LinkEvent,
    LinkEventSender, ServiceHandle,
};
pub use util::{create_identifier, format_peripheral_id, random_color, random_rgb};

/// A session on the platform Bluetooth stack.
pub type ThingySession = Session<BleCentral>;

/// A session shared between tasks on the platform Bluetooth stack.
pub type SharedThingySession = SharedSession<BleCentral>;

// Re-export from thingy-types
pub use thingy_types::uuids;
pub use thingy_types::{
    Endpoint, LedColor, LedCommand, ParseError, Reading, Rgb, SoundConfig, Tone,
};
