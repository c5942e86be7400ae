//! Session event surface.
//!
//! Every lifecycle transition and every decoded notification becomes a
//! [`ThingyEvent`]. The [`EventBus`] owned by the session delivers it to
//! synchronous handlers registered with [`EventBus::on`], in registration
//! order, then to async consumers holding a [`EventBus::subscribe`]
//! receiver. Nothing is buffered for handlers registered later.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use thingy_types::{ParseError, Reading};

use crate::transport::DeviceIdentity;

/// Prefix applied to event names published outside the driver.
pub const EVENT_NAMESPACE: &str = "thingy52";

/// Events emitted by a session.
///
/// All events are serializable for logging and IPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ThingyEvent {
    /// A connection attempt is starting; emitted before any radio activity.
    BeforeConnect { device: DeviceIdentity },
    /// The session is active.
    Connect { device: DeviceIdentity },
    /// The session ended.
    Disconnect {
        device_id: String,
        reason: DisconnectReason,
    },
    /// Battery level in percent.
    Battery { device_id: String, battery_level: u8 },
    /// Temperature in degrees Celsius.
    Temperature { device_id: String, temperature: f64 },
    /// Gravity vector in g.
    Accelerometer { x: f64, y: f64, z: f64 },
    /// Button state changed.
    Button { device_id: String, pressed: bool },
}

impl ThingyEvent {
    /// Build the event for a decoded reading.
    pub fn from_reading(device_id: &str, reading: Reading) -> Self {
        let device_id = device_id.to_string();
        match reading {
            Reading::BatteryLevel(battery_level) => ThingyEvent::Battery {
                device_id,
                battery_level,
            },
            Reading::Temperature(temperature) => ThingyEvent::Temperature {
                device_id,
                temperature,
            },
            Reading::Acceleration(a) => ThingyEvent::Accelerometer {
                x: a.x,
                y: a.y,
                z: a.z,
            },
            Reading::Button(pressed) => ThingyEvent::Button { device_id, pressed },
        }
    }

    /// Kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            ThingyEvent::BeforeConnect { .. } => EventKind::BeforeConnect,
            ThingyEvent::Connect { .. } => EventKind::Connect,
            ThingyEvent::Disconnect { .. } => EventKind::Disconnect,
            ThingyEvent::Battery { .. } => EventKind::Battery,
            ThingyEvent::Temperature { .. } => EventKind::Temperature,
            ThingyEvent::Accelerometer { .. } => EventKind::Accelerometer,
            ThingyEvent::Button { .. } => EventKind::Button,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DisconnectReason {
    /// `disconnect()` was called.
    UserRequested,
    /// `open()` was called for another device while this one was active.
    SessionReplaced,
    /// The device or platform dropped the link.
    Remote,
}

/// Event names handlers register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BeforeConnect,
    Connect,
    Disconnect,
    Battery,
    Temperature,
    Accelerometer,
    Button,
}

impl EventKind {
    /// Every kind, lifecycle first.
    pub const ALL: [EventKind; 7] = [
        EventKind::BeforeConnect,
        EventKind::Connect,
        EventKind::Disconnect,
        EventKind::Battery,
        EventKind::Temperature,
        EventKind::Accelerometer,
        EventKind::Button,
    ];

    /// Public event name.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::BeforeConnect => "before_connect",
            EventKind::Connect => "connect",
            EventKind::Disconnect => "disconnect",
            EventKind::Battery => "battery",
            EventKind::Temperature => "temperature",
            EventKind::Accelerometer => "accelerometer",
            EventKind::Button => "button",
        }
    }

    /// Name prefixed with [`EVENT_NAMESPACE`], e.g. `thingy52_battery`.
    pub fn namespaced(&self) -> String {
        format!("{}_{}", EVENT_NAMESPACE, self.name())
    }

    /// Whether events of this kind carry a sensor reading.
    pub fn is_reading(&self) -> bool {
        !matches!(
            self,
            EventKind::BeforeConnect | EventKind::Connect | EventKind::Disconnect
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = ParseError;

    /// Accepts both plain (`battery`) and namespaced (`thingy52_battery`)
    /// names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let bare = lowered
            .strip_prefix(EVENT_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(&lowered);
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == bare)
            .ok_or_else(|| ParseError::UnknownEvent(s.to_string()))
    }
}

/// Synchronous event handler.
pub type Handler = Box<dyn FnMut(&ThingyEvent) + Send + Sync>;

/// Token returned by [`EventBus::on`], used to unregister the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    /// Kind the handler was registered for.
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// Receiver for broadcast events.
pub type EventReceiver = broadcast::Receiver<ThingyEvent>;

/// Publish/subscribe surface of a session.
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<(u64, Handler)>>,
    next_id: u64,
    sender: broadcast::Sender<ThingyEvent>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handler_count())
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

impl EventBus {
    /// Create a bus whose broadcast channel holds `capacity` events
    /// (at least one).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            handlers: HashMap::new(),
            next_id: 0,
            sender,
        }
    }

    /// Register `handler` for events of `kind`.
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> Subscription
    where
        F: FnMut(&ThingyEvent) + Send + Sync + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));
        Subscription { kind, id }
    }

    /// Unregister a handler. Returns `false` if it was already removed.
    pub fn off(&mut self, subscription: Subscription) -> bool {
        let Some(list) = self.handlers.get_mut(&subscription.kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != subscription.id);
        list.len() != before
    }

    /// Subscribe to every event through a broadcast channel.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Number of registered synchronous handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub(crate) fn emit(&mut self, event: ThingyEvent) {
        debug!(event = event.kind().name(), ?event, "Emitting event");
        if let Some(list) = self.handlers.get_mut(&event.kind()) {
            for (_, handler) in list.iter_mut() {
                handler(&event);
            }
        }
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
