//! The device session state machine.
//!
//! A [`Session`] owns at most one connection to a Thingy:52. Opening walks
//! the addressing table in a fixed order, subscribes the sensor endpoints
//! and keeps the actuator handles for later writes:
//!
//! ```text
//! Idle ─ open ─▶ Connecting ─▶ Resolving ─▶ Active ─ disconnect ─▶ Disconnecting ─▶ Idle
//!                    │             │
//!                    └──────┬──────┘
//!                           ▼
//!                         Failed
//! ```
//!
//! Transport events (notifications, unsolicited disconnects) are queued by
//! the transport and delivered by [`Session::pump`] or
//! [`Session::dispatch_pending`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use thingy_types::{Endpoint, LedColor, LedCommand, Rgb, SoundConfig, Tone, codec};

use crate::error::{ConnectionFailureReason, DeviceNotFoundReason, Error, Result};
use crate::events::{
    DisconnectReason, EventBus, EventKind, EventReceiver, Subscription, ThingyEvent,
};
use crate::router::NotificationRouter;
use crate::transport::{
    Central, CharacteristicHandle, DeviceFilter, DeviceIdentity, Link, LinkEvent, LinkEventSender,
};

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No device bound.
    #[default]
    Idle,
    /// Establishing the connection.
    Connecting,
    /// Resolving endpoint handles and subscribing.
    Resolving,
    /// Notifications flow and commands are accepted.
    Active,
    /// Releasing the connection.
    Disconnecting,
    /// The last `open` failed; no device is bound.
    Failed,
}

impl SessionState {
    /// Whether an `open`, `scan` or `disconnect` is in progress.
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::Resolving | SessionState::Disconnecting
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Resolving => "resolving",
            SessionState::Active => "active",
            SessionState::Disconnecting => "disconnecting",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Filter used by [`Session::scan`].
    pub filter: DeviceFilter,
    /// Capacity of the broadcast channel behind [`Session::subscribe`].
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filter: DeviceFilter::thingy52(),
            event_capacity: 100,
        }
    }
}

impl SessionConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept a device whose name or address contains `identifier`.
    #[must_use]
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.filter = self.filter.identifier(identifier);
        self
    }

    /// Set the broadcast channel capacity.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

/// Queued transport events for a session.
pub(crate) type LinkEvents = mpsc::UnboundedReceiver<(u64, LinkEvent)>;

/// One logical connection to one Thingy:52.
pub struct Session<C: Central> {
    central: C,
    config: SessionConfig,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    link: Option<C::Link>,
    device: Option<DeviceIdentity>,
    handles: HashMap<Endpoint, CharacteristicHandle>,
    router: NotificationRouter,
    bus: EventBus,
    generation: u64,
    link_tx: mpsc::UnboundedSender<(u64, LinkEvent)>,
    link_rx: Option<LinkEvents>,
}

impl<C: Central> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("device", &self.device)
            .field("handles", &self.handles.keys().collect::<Vec<_>>())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl<C: Central> Session<C> {
    /// Create an idle session on top of `central`.
    pub fn new(central: C) -> Self {
        Self::with_config(central, SessionConfig::default())
    }

    /// Create an idle session with a custom configuration.
    pub fn with_config(central: C, config: SessionConfig) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        Self {
            central,
            bus: EventBus::new(config.event_capacity),
            config,
            state: SessionState::Idle,
            state_tx: watch::Sender::new(SessionState::Idle),
            link: None,
            device: None,
            handles: HashMap::new(),
            router: NotificationRouter::new(),
            generation: 0,
            link_tx,
            link_rx: Some(link_rx),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Observe state changes.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Whether the session is active.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Identity of the bound device.
    pub fn device(&self) -> Option<&DeviceIdentity> {
        self.device.as_ref()
    }

    /// Whether a handle is resolved for `endpoint`.
    pub fn has_endpoint(&self, endpoint: Endpoint) -> bool {
        self.handles.contains_key(&endpoint)
    }

    /// Resolved endpoints in addressing-table order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        Endpoint::ALL
            .into_iter()
            .filter(|endpoint| self.handles.contains_key(endpoint))
            .collect()
    }

    /// The transport this session connects through.
    pub fn central(&self) -> &C {
        &self.central
    }

    /// Register an event handler. See [`EventBus::on`].
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> Subscription
    where
        F: FnMut(&ThingyEvent) + Send + Sync + 'static,
    {
        self.bus.on(kind, handler)
    }

    /// Unregister an event handler. See [`EventBus::off`].
    pub fn off(&mut self, subscription: Subscription) -> bool {
        self.bus.off(subscription)
    }

    /// Receive every event through a broadcast channel.
    pub fn subscribe(&self) -> EventReceiver {
        self.bus.subscribe()
    }

    /// Find a Thingy:52 and open it.
    #[tracing::instrument(level = "info", skip(self), fields(identifier = ?self.config.filter.identifier))]
    pub async fn scan(&mut self) -> Result<DeviceIdentity> {
        self.ensure_settled()?;
        let device = self.central.request_device(&self.config.filter).await?;
        info!("Found {}", device);
        self.open(device.clone()).await?;
        Ok(device)
    }

    /// Open `device`, replacing the active session if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionBusy`] if a previous call was interrupted
    /// mid-flight and [`Error::ConnectionFailed`] if the link cannot be
    /// established or a mandatory endpoint is missing. In the latter case
    /// the session is left in [`SessionState::Failed`].
    #[tracing::instrument(level = "info", skip_all, fields(device_id = %device.id))]
    pub async fn open(&mut self, device: DeviceIdentity) -> Result<()> {
        self.ensure_settled()?;
        if self.state == SessionState::Active {
            self.teardown(DisconnectReason::SessionReplaced).await;
        }

        self.set_state(SessionState::Connecting);
        self.device = Some(device.clone());
        self.bus.emit(ThingyEvent::BeforeConnect {
            device: device.clone(),
        });

        info!("Connecting to {}", device);
        self.generation += 1;
        let events = LinkEventSender::new(self.generation, self.link_tx.clone());
        match self.central.connect(&device, events).await {
            Ok(link) => self.link = Some(link),
            Err(e) => {
                warn!("Failed to connect to {}: {}", device, e);
                self.fail().await;
                return Err(Error::connection_failed(
                    Some(device.id),
                    failure_reason(&e),
                ));
            }
        }

        self.set_state(SessionState::Resolving);
        for endpoint in Endpoint::MANDATORY {
            if let Err(e) = self.resolve(endpoint).await {
                warn!("Mandatory endpoint {} unavailable: {}", endpoint, e);
                self.fail().await;
                return Err(Error::connection_failed(
                    Some(device.id),
                    ConnectionFailureReason::MissingEndpoint(endpoint),
                ));
            }
        }
        if let Err(e) = self.resolve(Endpoint::Battery).await {
            warn!("{} ({})", Error::EndpointUnavailable(Endpoint::Battery), e);
        }
        for endpoint in Endpoint::ACTUATORS {
            if let Err(e) = self.resolve(endpoint).await {
                warn!("Commands for {} disabled: {}", endpoint, e);
            }
        }

        for endpoint in Endpoint::MANDATORY {
            if let Err(e) = self.start_notifications(endpoint).await {
                warn!("Could not subscribe to {}: {}", endpoint, e);
                self.fail().await;
                return Err(Error::connection_failed(
                    Some(device.id),
                    ConnectionFailureReason::MissingEndpoint(endpoint),
                ));
            }
        }
        if self.handles.contains_key(&Endpoint::Battery) {
            self.prime_battery(&device.id).await;
            if let Err(e) = self.start_notifications(Endpoint::Battery).await {
                warn!("{} ({})", Error::EndpointUnavailable(Endpoint::Battery), e);
                self.handles.remove(&Endpoint::Battery);
            }
        }

        self.set_state(SessionState::Active);
        info!(endpoints = ?self.endpoints(), "Session active for {}", device);
        self.bus.emit(ThingyEvent::Connect { device });
        Ok(())
    }

    /// Close the session.
    ///
    /// A no-op when nothing is open. Also recovers a session left in a
    /// transitional state by an interrupted call.
    #[tracing::instrument(level = "info", skip(self), fields(state = %self.state))]
    pub async fn disconnect(&mut self) -> Result<()> {
        match self.state {
            SessionState::Idle | SessionState::Failed => {
                debug!("Nothing to disconnect");
                Ok(())
            }
            _ => {
                self.teardown(DisconnectReason::UserRequested).await;
                Ok(())
            }
        }
    }

    /// Wait for the next transport event and dispatch it.
    ///
    /// Returns `false` if the event queue has been handed to a
    /// [`crate::SharedSession`].
    pub async fn pump(&mut self) -> bool {
        let Some(rx) = self.link_rx.as_mut() else {
            return false;
        };
        match rx.recv().await {
            Some((generation, event)) => {
                self.handle_link_event(generation, event).await;
                true
            }
            None => false,
        }
    }

    /// Dispatch every transport event already queued, without waiting.
    /// Returns how many were processed.
    pub async fn dispatch_pending(&mut self) -> usize {
        let mut processed = 0;
        loop {
            let Some(rx) = self.link_rx.as_mut() else {
                return processed;
            };
            let Ok((generation, event)) = rx.try_recv() else {
                return processed;
            };
            self.handle_link_event(generation, event).await;
            processed += 1;
        }
    }

    /// Light the LED with a constant RGB color.
    pub async fn set_led(&self, r: u8, g: u8, b: u8) -> Result<()> {
        self.write_led(LedCommand::On(Rgb::new(r, g, b))).await
    }

    /// Pulse a palette color. `delay_ms` is the breathe period.
    pub async fn set_led_breathe(&self, color: LedColor, intensity: u8, delay_ms: u16) -> Result<()> {
        self.write_led(LedCommand::Breathe {
            color,
            intensity,
            delay_ms,
        })
        .await
    }

    /// Flash a palette color once. A `delay` selects the 4-byte payload.
    pub async fn set_led_flash_once(
        &self,
        color: LedColor,
        intensity: u8,
        delay: Option<u8>,
    ) -> Result<()> {
        self.write_led(LedCommand::FlashOnce {
            color,
            intensity,
            delay,
        })
        .await
    }

    /// Turn the LED off.
    pub async fn set_led_off(&self) -> Result<()> {
        self.write_led(LedCommand::Off).await
    }

    /// Send any LED command.
    pub async fn write_led(&self, command: LedCommand) -> Result<()> {
        self.write_command(Endpoint::Led, &codec::encode_led(&command))
            .await
    }

    /// Play a tone.
    pub async fn beep(&self, frequency_hz: u16, duration_ms: u16, volume: u8) -> Result<()> {
        self.play_tone(Tone::new(frequency_hz, duration_ms, volume))
            .await
    }

    /// Play a tone: select frequency mode, then send the tone once the mode
    /// write has been acknowledged.
    pub async fn play_tone(&self, tone: Tone) -> Result<()> {
        if self.writable(Endpoint::SoundConfig).is_none()
            || self.writable(Endpoint::Speaker).is_none()
        {
            return Ok(());
        }
        self.write_command(
            Endpoint::SoundConfig,
            &codec::encode_sound_config(&SoundConfig::TONE),
        )
        .await?;
        self.write_command(Endpoint::Speaker, &codec::encode_tone(&tone))
            .await
    }

    fn set_state(&mut self, state: SessionState) {
        debug!(from = %self.state, to = %state, "Session state change");
        self.state = state;
        self.state_tx.send_replace(state);
    }

    fn ensure_settled(&self) -> Result<()> {
        if self.state.is_transitional() {
            return Err(Error::SessionBusy { state: self.state });
        }
        Ok(())
    }

    fn writable(&self, endpoint: Endpoint) -> Option<(&C::Link, &CharacteristicHandle)> {
        if self.state != SessionState::Active {
            debug!("Ignoring {} command: session is {}", endpoint, self.state);
            return None;
        }
        match (self.link.as_ref(), self.handles.get(&endpoint)) {
            (Some(link), Some(handle)) => Some((link, handle)),
            _ => {
                debug!("Ignoring {} command: endpoint not resolved", endpoint);
                None
            }
        }
    }

    async fn write_command(&self, endpoint: Endpoint, payload: &[u8]) -> Result<()> {
        let Some((link, handle)) = self.writable(endpoint) else {
            return Ok(());
        };
        debug!("Writing {:02x?} to {}", payload, endpoint);
        link.write(handle, payload).await.map_err(|e| match e {
            Error::WriteFailed { .. } => e,
            other => Error::write_failed(handle.uuid.to_string(), other.to_string()),
        })
    }

    async fn resolve(&mut self, endpoint: Endpoint) -> Result<()> {
        let link = self.link.as_ref().ok_or(Error::NotConnected)?;
        let address = endpoint.address();
        let service = link.primary_service(address.service).await?;
        let handle = link.characteristic(&service, address.characteristic).await?;
        debug!("Resolved {} -> {}", endpoint, handle.uuid);
        self.handles.insert(endpoint, handle);
        Ok(())
    }

    async fn start_notifications(&mut self, endpoint: Endpoint) -> Result<()> {
        let link = self.link.as_ref().ok_or(Error::NotConnected)?;
        let handle = self
            .handles
            .get(&endpoint)
            .copied()
            .ok_or(Error::EndpointUnavailable(endpoint))?;
        link.subscribe(&handle).await?;
        self.router.attach(endpoint, &handle);
        Ok(())
    }

    async fn prime_battery(&mut self, device_id: &str) {
        let Some(handle) = self.handles.get(&Endpoint::Battery).copied() else {
            return;
        };
        let Some(link) = self.link.as_ref() else {
            return;
        };
        let reading = match link.read(&handle).await {
            Ok(value) => codec::decode(Endpoint::Battery, &value).map_err(Error::from),
            Err(e) => Err(e),
        };
        match reading {
            Ok(reading) => self.bus.emit(ThingyEvent::from_reading(device_id, reading)),
            Err(e) => warn!("Initial battery read failed: {}", e),
        }
    }

    async fn handle_link_event(&mut self, generation: u64, event: LinkEvent) {
        if generation != self.generation || self.link.is_none() {
            debug!(generation, current = self.generation, "Dropping stale link event");
            return;
        }
        match event {
            LinkEvent::Notification {
                characteristic,
                value,
            } => {
                let Some(decoded) = self.router.route(&characteristic, &value) else {
                    debug!("Notification from unrouted characteristic {}", characteristic);
                    return;
                };
                let Some(device_id) = self.device.as_ref().map(|d| d.id.clone()) else {
                    return;
                };
                match decoded {
                    Ok(reading) => self.bus.emit(ThingyEvent::from_reading(&device_id, reading)),
                    Err(e) => warn!("Dropping notification: {}", e),
                }
            }
            LinkEvent::Disconnected => {
                info!("Device dropped the connection");
                self.teardown(DisconnectReason::Remote).await;
            }
        }
    }

    /// Release the link and return to `Idle`. A `disconnect` event is
    /// emitted only for a session that reached `Active`.
    async fn teardown(&mut self, reason: DisconnectReason) {
        let was_active = self.state == SessionState::Active;
        let device = self.device.take();
        self.set_state(SessionState::Disconnecting);
        self.release_link().await;
        self.set_state(SessionState::Idle);

        if let Some(device) = device {
            info!(?reason, "Disconnected from {}", device);
            if was_active {
                self.bus.emit(ThingyEvent::Disconnect {
                    device_id: device.id,
                    reason,
                });
            }
        }
    }

    async fn fail(&mut self) {
        self.device = None;
        self.release_link().await;
        self.set_state(SessionState::Failed);
    }

    async fn release_link(&mut self) {
        self.router.clear();
        self.handles.clear();
        self.generation += 1;
        if let Some(link) = self.link.take()
            && let Err(e) = link.disconnect().await
        {
            warn!("Error while releasing link: {}", e);
        }
    }

    pub(crate) fn take_link_events(&mut self) -> Option<LinkEvents> {
        self.link_rx.take()
    }

    pub(crate) async fn deliver(&mut self, generation: u64, event: LinkEvent) {
        self.handle_link_event(generation, event).await;
    }
}

fn failure_reason(error: &Error) -> ConnectionFailureReason {
    match error {
        Error::Timeout { .. } => ConnectionFailureReason::Timeout,
        Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter) => {
            ConnectionFailureReason::AdapterUnavailable
        }
        Error::DeviceNotFound(_) => ConnectionFailureReason::OutOfRange,
        Error::Bluetooth(e) => ConnectionFailureReason::BleError(e.to_string()),
        other => ConnectionFailureReason::Other(other.to_string()),
    }
}
