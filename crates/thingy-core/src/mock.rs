//! Mock transport for testing.
//!
//! [`MockCentral`] implements [`Central`] against a simulated Thingy:52 so
//! the session state machine can be driven without BLE hardware.
//!
//! # Features
//!
//! - **Missing endpoints**: remove characteristics to exercise resolution failures
//! - **Failure injection**: fail connects, reads, writes or subscriptions
//! - **Scripted traffic**: push notifications and unsolicited disconnects
//! - **Recording**: inspect every write and subscription the session made
//!
//! # Example
//!
//! ```
//! use thingy_core::{MockCentral, Session, SessionState};
//! use thingy_types::Endpoint;
//!
//! #[tokio::main]
//! async fn main() {
//!     let central = MockCentral::builder().battery(77).build();
//!     let mock = central.clone();
//!     let mut session = Session::new(central);
//!
//!     session.scan().await.unwrap();
//!     assert_eq!(session.state(), SessionState::Active);
//!
//!     mock.notify(Endpoint::Button, &[1]);
//!     session.dispatch_pending().await;
//! }
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use thingy_types::Endpoint;

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::transport::{
    Central, CharacteristicHandle, DeviceFilter, DeviceIdentity, Link, LinkEventSender,
    ServiceHandle,
};

#[derive(Debug)]
struct MockState {
    device: DeviceIdentity,
    advertising: bool,
    battery: u8,
    missing: HashSet<Endpoint>,
    fail_connect: bool,
    fail_reads: bool,
    fail_writes: bool,
    fail_subscribe: HashSet<Endpoint>,
    connect_latency: Duration,
    events: Option<LinkEventSender>,
    connected: bool,
    connect_count: u32,
    disconnect_count: u32,
    read_count: u32,
    writes: Vec<(Endpoint, Vec<u8>)>,
    subscriptions: Vec<Endpoint>,
}

/// A simulated Thingy:52 and the radio it is reached through.
///
/// Clones share state, so a test can keep one clone for scripting and
/// inspection while the session owns another.
#[derive(Debug, Clone)]
pub struct MockCentral {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockCentral {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCentral {
    /// Create a mock with every endpoint present.
    pub fn new() -> Self {
        MockCentralBuilder::new().build()
    }

    /// Start building a mock.
    pub fn builder() -> MockCentralBuilder {
        MockCentralBuilder::new()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Identity of the simulated device.
    pub fn device(&self) -> DeviceIdentity {
        self.lock().device.clone()
    }

    /// Push a notification for `endpoint` on the current link.
    ///
    /// Returns `false` if no link was ever opened or the session is gone.
    pub fn notify(&self, endpoint: Endpoint, value: &[u8]) -> bool {
        let state = self.lock();
        match &state.events {
            Some(events) => events.notification(endpoint.address().characteristic, value.to_vec()),
            None => false,
        }
    }

    /// Simulate the device dropping the connection.
    pub fn drop_connection(&self) -> bool {
        let mut state = self.lock();
        state.connected = false;
        match &state.events {
            Some(events) => events.disconnected(),
            None => false,
        }
    }

    /// Whether the simulated device is connected.
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Every write made so far, in order.
    pub fn writes(&self) -> Vec<(Endpoint, Vec<u8>)> {
        self.lock().writes.clone()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Endpoints currently subscribed, in subscription order.
    pub fn subscriptions(&self) -> Vec<Endpoint> {
        self.lock().subscriptions.clone()
    }

    /// Number of connection attempts.
    pub fn connect_count(&self) -> u32 {
        self.lock().connect_count
    }

    /// Number of link releases.
    pub fn disconnect_count(&self) -> u32 {
        self.lock().disconnect_count
    }

    /// Number of characteristic reads.
    pub fn read_count(&self) -> u32 {
        self.lock().read_count
    }

    /// Set the battery level returned by reads.
    pub fn set_battery(&self, level: u8) {
        self.lock().battery = level;
    }

    /// Remove or restore an endpoint's characteristic.
    pub fn set_missing(&self, endpoint: Endpoint, missing: bool) {
        let mut state = self.lock();
        if missing {
            state.missing.insert(endpoint);
        } else {
            state.missing.remove(&endpoint);
        }
    }

    /// Make connection attempts fail.
    pub fn set_fail_connect(&self, fail: bool) {
        self.lock().fail_connect = fail;
    }

    /// Make writes fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make reads fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Stop or resume advertising.
    pub fn set_advertising(&self, advertising: bool) {
        self.lock().advertising = advertising;
    }

    /// Delay every connection attempt.
    pub fn set_connect_latency(&self, latency: Duration) {
        self.lock().connect_latency = latency;
    }
}

#[async_trait]
impl Central for MockCentral {
    type Link = MockLink;

    async fn request_device(&self, filter: &DeviceFilter) -> Result<DeviceIdentity> {
        let state = self.lock();
        if !state.advertising {
            return Err(Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange));
        }
        if !filter.matches_identity(&state.device) {
            let identifier = filter.identifier.clone().unwrap_or_default();
            return Err(Error::device_not_found(identifier));
        }
        Ok(state.device.clone())
    }

    async fn connect(&self, device: &DeviceIdentity, events: LinkEventSender) -> Result<MockLink> {
        let latency = {
            let mut state = self.lock();
            state.connect_count += 1;
            state.connect_latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        if state.fail_connect || !state.advertising || state.device.id != device.id {
            return Err(Error::timeout("connect to device", Duration::from_secs(15)));
        }
        state.connected = true;
        state.subscriptions.clear();
        state.events = Some(events);
        Ok(MockLink {
            state: Arc::clone(&self.state),
        })
    }
}

/// A link to the simulated device.
#[derive(Debug)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl MockLink {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn endpoint(&self, handle: &CharacteristicHandle) -> Result<Endpoint> {
        Endpoint::from_characteristic(handle.uuid).ok_or_else(|| {
            Error::characteristic_not_found(handle.uuid.to_string(), handle.service.to_string())
        })
    }

    fn ensure_connected(state: &MockState) -> Result<()> {
        if state.connected {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

#[async_trait]
impl Link for MockLink {
    async fn primary_service(&self, uuid: Uuid) -> Result<ServiceHandle> {
        let state = self.lock();
        Self::ensure_connected(&state)?;
        let present = Endpoint::ALL
            .iter()
            .any(|e| e.address().service == uuid && !state.missing.contains(e));
        if !present {
            return Err(Error::service_not_found(uuid.to_string()));
        }
        Ok(ServiceHandle { uuid })
    }

    async fn characteristic(
        &self,
        service: &ServiceHandle,
        uuid: Uuid,
    ) -> Result<CharacteristicHandle> {
        let state = self.lock();
        Self::ensure_connected(&state)?;
        let found = Endpoint::from_characteristic(uuid)
            .filter(|e| e.address().service == service.uuid && !state.missing.contains(e));
        match found {
            Some(_) => Ok(CharacteristicHandle {
                service: service.uuid,
                uuid,
            }),
            None => Err(Error::characteristic_not_found(
                uuid.to_string(),
                service.uuid.to_string(),
            )),
        }
    }

    async fn read(&self, handle: &CharacteristicHandle) -> Result<Vec<u8>> {
        let endpoint = self.endpoint(handle)?;
        let mut state = self.lock();
        Self::ensure_connected(&state)?;
        state.read_count += 1;
        if state.fail_reads {
            return Err(Error::timeout(
                format!("read characteristic {}", handle.uuid),
                Duration::from_secs(10),
            ));
        }
        match endpoint {
            Endpoint::Battery => Ok(vec![state.battery]),
            _ => Ok(Vec::new()),
        }
    }

    async fn write(&self, handle: &CharacteristicHandle, data: &[u8]) -> Result<()> {
        let endpoint = self.endpoint(handle)?;
        let mut state = self.lock();
        Self::ensure_connected(&state)?;
        if state.fail_writes {
            return Err(Error::write_failed(handle.uuid.to_string(), "Mock failure"));
        }
        state.writes.push((endpoint, data.to_vec()));
        Ok(())
    }

    async fn subscribe(&self, handle: &CharacteristicHandle) -> Result<()> {
        let endpoint = self.endpoint(handle)?;
        let mut state = self.lock();
        Self::ensure_connected(&state)?;
        if state.fail_subscribe.contains(&endpoint) {
            return Err(Error::characteristic_not_found(
                handle.uuid.to_string(),
                handle.service.to_string(),
            ));
        }
        state.subscriptions.push(endpoint);
        Ok(())
    }

    async fn unsubscribe(&self, handle: &CharacteristicHandle) -> Result<()> {
        let endpoint = self.endpoint(handle)?;
        self.lock().subscriptions.retain(|e| *e != endpoint);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.lock();
        state.connected = false;
        state.subscriptions.clear();
        state.disconnect_count += 1;
        Ok(())
    }
}

/// Builder for creating mock centrals with custom settings.
#[derive(Debug)]
pub struct MockCentralBuilder {
    name: String,
    address: Option<String>,
    battery: u8,
    missing: HashSet<Endpoint>,
    fail_subscribe: HashSet<Endpoint>,
    fail_connect: bool,
    fail_reads: bool,
}

impl Default for MockCentralBuilder {
    fn default() -> Self {
        Self {
            name: "Thingy".to_string(),
            address: None,
            battery: 85,
            missing: HashSet::new(),
            fail_subscribe: HashSet::new(),
            fail_connect: false,
            fail_reads: false,
        }
    }
}

impl MockCentralBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the advertised name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the device address.
    #[must_use]
    pub fn address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Set the battery level returned by reads.
    #[must_use]
    pub fn battery(mut self, level: u8) -> Self {
        self.battery = level;
        self
    }

    /// Remove an endpoint's characteristic.
    #[must_use]
    pub fn without(mut self, endpoint: Endpoint) -> Self {
        self.missing.insert(endpoint);
        self
    }

    /// Make subscribing to an endpoint fail.
    #[must_use]
    pub fn fail_subscribe(mut self, endpoint: Endpoint) -> Self {
        self.fail_subscribe.insert(endpoint);
        self
    }

    /// Make connection attempts fail.
    #[must_use]
    pub fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Make reads fail.
    #[must_use]
    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Build the mock.
    #[must_use]
    pub fn build(self) -> MockCentral {
        let address = self
            .address
            .unwrap_or_else(|| format!("MOCK-{:06X}", rand::random::<u32>() % 0xFFFFFF));
        MockCentral {
            state: Arc::new(Mutex::new(MockState {
                device: DeviceIdentity::with_name(address, self.name),
                advertising: true,
                battery: self.battery,
                missing: self.missing,
                fail_connect: self.fail_connect,
                fail_reads: self.fail_reads,
                fail_writes: false,
                fail_subscribe: self.fail_subscribe,
                connect_latency: Duration::ZERO,
                events: None,
                connected: false,
                connect_count: 0,
                disconnect_count: 0,
                read_count: 0,
                writes: Vec::new(),
                subscriptions: Vec::new(),
            })),
        }
    }
}
