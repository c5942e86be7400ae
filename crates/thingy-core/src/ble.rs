//! btleplug transport.
//!
//! [`BleCentral`] and [`BleLink`] implement the transport traits on top of
//! the platform Bluetooth stack.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central as _, CentralEvent, Characteristic, Peripheral as _, WriteType,
};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::scan::{self, DiscoveredDevice, ScanOptions, get_adapter};
use crate::session::{Session, SessionConfig};
use crate::transport::{
    Central, CharacteristicHandle, DeviceFilter, DeviceIdentity, Link, LinkEventSender,
    ServiceHandle,
};

/// Default timeout for BLE characteristic read operations.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE characteristic write operations.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE connection operations.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for BLE connection timeouts.
///
/// Use this to customize timeout values for different environments.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use thingy_core::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .read_timeout(Duration::from_secs(15));
/// assert_eq!(config.write_timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing a BLE connection.
    pub connection_timeout: Duration,
    /// Timeout for BLE read operations.
    pub read_timeout: Duration,
    /// Timeout for BLE write operations.
    pub write_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config for challenging RF environments.
    ///
    /// Uses longer timeouts to accommodate signal interference,
    /// thick walls, or long distances.
    pub fn challenging_environment() -> Self {
        Self {
            connection_timeout: Duration::from_secs(25),
            read_timeout: Duration::from_secs(15),
            write_timeout: Duration::from_secs(15),
            discovery_timeout: Duration::from_secs(15),
        }
    }

    /// Create a config for fast, reliable environments.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(8),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            discovery_timeout: Duration::from_secs(5),
        }
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }
}

/// The platform Bluetooth adapter as a [`Central`].
pub struct BleCentral {
    adapter: Adapter,
    connection: ConnectionConfig,
    scan: ScanOptions,
    /// Peripherals returned by earlier discoveries, by identity id.
    discovered: Mutex<HashMap<String, Peripheral>>,
}

impl std::fmt::Debug for BleCentral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleCentral")
            .field("connection", &self.connection)
            .field("scan", &self.scan)
            .finish_non_exhaustive()
    }
}

impl BleCentral {
    /// Use the first Bluetooth adapter with default settings.
    pub async fn new() -> Result<Self> {
        Self::with_options(ConnectionConfig::default(), ScanOptions::default()).await
    }

    /// Use the first Bluetooth adapter.
    pub async fn with_options(connection: ConnectionConfig, scan: ScanOptions) -> Result<Self> {
        let adapter = get_adapter().await?;
        Ok(Self::from_adapter(adapter, connection, scan))
    }

    /// Use a specific adapter.
    pub fn from_adapter(adapter: Adapter, connection: ConnectionConfig, scan: ScanOptions) -> Self {
        Self {
            adapter,
            connection,
            scan,
            discovered: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Scan once and list every Thingy:52 in range, strongest first.
    pub async fn discover(&self, filter: &DeviceFilter) -> Result<Vec<DeviceIdentity>> {
        let devices = scan::scan_for_devices(&self.adapter, filter, &self.scan).await?;
        let mut discovered = self.discovered.lock().await;
        Ok(devices
            .into_iter()
            .map(|device| {
                discovered.insert(device.identity.id.clone(), device.peripheral);
                device.identity
            })
            .collect())
    }

    async fn peripheral_for(&self, device: &DeviceIdentity) -> Result<Peripheral> {
        if let Some(peripheral) = self.discovered.lock().await.get(&device.id) {
            return Ok(peripheral.clone());
        }
        let filter = DeviceFilter::thingy52().identifier(device.id.clone());
        let DiscoveredDevice {
            identity,
            peripheral,
            ..
        } = scan::find_device(&self.adapter, &filter, &self.scan).await?;
        self.discovered
            .lock()
            .await
            .insert(identity.id, peripheral.clone());
        Ok(peripheral)
    }

    async fn watch_link(
        &self,
        peripheral: &Peripheral,
        events: LinkEventSender,
        token: CancellationToken,
    ) -> Result<()> {
        let mut notifications = peripheral.notifications().await?;
        let mut central_events = self.adapter.events().await?;
        let peripheral_id = peripheral.id();

        let forward = events.clone();
        let forward_token = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = forward_token.cancelled() => break,
                    notification = notifications.next() => match notification {
                        Some(n) => {
                            if !forward.notification(n.uuid, n.value) {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            debug!("Notification forwarder stopped");
        });

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = central_events.next() => match event {
                        Some(CentralEvent::DeviceDisconnected(id)) if id == peripheral_id => {
                            events.disconnected();
                            break;
                        }
                        Some(_) => {}
                        None => break,
                    },
                }
            }
            debug!("Disconnect watcher stopped");
        });

        Ok(())
    }
}

#[async_trait]
impl Central for BleCentral {
    type Link = BleLink;

    #[tracing::instrument(level = "debug", skip_all)]
    async fn request_device(&self, filter: &DeviceFilter) -> Result<DeviceIdentity> {
        let device = scan::find_device(&self.adapter, filter, &self.scan).await?;
        self.discovered
            .lock()
            .await
            .insert(device.identity.id.clone(), device.peripheral);
        Ok(device.identity)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(device_id = %device.id))]
    async fn connect(&self, device: &DeviceIdentity, events: LinkEventSender) -> Result<BleLink> {
        let peripheral = self.peripheral_for(device).await?;
        let config = self.connection.clone();

        let establish = async {
            info!("Connecting to device...");
            timeout(config.connection_timeout, peripheral.connect())
                .await
                .map_err(|_| Error::timeout("connect to device", config.connection_timeout))??;

            info!("Discovering services...");
            timeout(config.discovery_timeout, peripheral.discover_services())
                .await
                .map_err(|_| Error::timeout("discover services", config.discovery_timeout))??;
            Ok::<_, Error>(())
        };
        // A timed-out connect may still complete on the platform side.
        release_on_error(establish, release_peripheral(&peripheral)).await?;

        let mut characteristics = HashMap::new();
        for service in peripheral.services() {
            debug!("  Service: {}", service.uuid);
            for characteristic in service.characteristics {
                debug!("    Characteristic: {}", characteristic.uuid);
                characteristics.insert(
                    (characteristic.service_uuid, characteristic.uuid),
                    characteristic,
                );
            }
        }

        let token = CancellationToken::new();
        release_on_error(self.watch_link(&peripheral, events, token.clone()), async {
            token.cancel();
            release_peripheral(&peripheral).await;
        })
        .await?;

        Ok(BleLink {
            peripheral,
            config,
            characteristics,
            token,
        })
    }
}

/// Await `work`; if it fails, await `release` before returning the error.
async fn release_on_error<T>(
    work: impl Future<Output = Result<T>>,
    release: impl Future<Output = ()>,
) -> Result<T> {
    match work.await {
        Ok(value) => Ok(value),
        Err(e) => {
            release.await;
            Err(e)
        }
    }
}

async fn release_peripheral(peripheral: &Peripheral) {
    if let Err(e) = peripheral.disconnect().await {
        debug!("Disconnect after failed connect: {}", e);
    }
}

/// A live connection to a Thingy:52 over btleplug.
pub struct BleLink {
    peripheral: Peripheral,
    config: ConnectionConfig,
    /// Characteristics by (service, characteristic) UUID.
    characteristics: HashMap<(Uuid, Uuid), Characteristic>,
    /// Stops the notification forwarder and disconnect watcher.
    token: CancellationToken,
}

impl std::fmt::Debug for BleLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleLink")
            .field("characteristics", &self.characteristics.len())
            .finish_non_exhaustive()
    }
}

impl BleLink {
    fn find(&self, handle: &CharacteristicHandle) -> Result<&Characteristic> {
        self.characteristics
            .get(&(handle.service, handle.uuid))
            .ok_or_else(|| {
                Error::characteristic_not_found(handle.uuid.to_string(), handle.service.to_string())
            })
    }
}

#[async_trait]
impl Link for BleLink {
    async fn primary_service(&self, uuid: Uuid) -> Result<ServiceHandle> {
        if self.characteristics.keys().any(|(service, _)| *service == uuid) {
            Ok(ServiceHandle { uuid })
        } else {
            Err(Error::service_not_found(uuid.to_string()))
        }
    }

    async fn characteristic(
        &self,
        service: &ServiceHandle,
        uuid: Uuid,
    ) -> Result<CharacteristicHandle> {
        let handle = CharacteristicHandle {
            service: service.uuid,
            uuid,
        };
        self.find(&handle)?;
        Ok(handle)
    }

    async fn read(&self, handle: &CharacteristicHandle) -> Result<Vec<u8>> {
        let characteristic = self.find(handle)?;
        let data = timeout(self.config.read_timeout, self.peripheral.read(characteristic))
            .await
            .map_err(|_| {
                Error::timeout(
                    format!("read characteristic {}", handle.uuid),
                    self.config.read_timeout,
                )
            })??;
        Ok(data)
    }

    async fn write(&self, handle: &CharacteristicHandle, data: &[u8]) -> Result<()> {
        let characteristic = self.find(handle)?;
        timeout(
            self.config.write_timeout,
            self.peripheral
                .write(characteristic, data, WriteType::WithResponse),
        )
        .await
        .map_err(|_| {
            Error::timeout(
                format!("write characteristic {}", handle.uuid),
                self.config.write_timeout,
            )
        })?
        .map_err(|e| Error::write_failed(handle.uuid.to_string(), e.to_string()))
    }

    async fn subscribe(&self, handle: &CharacteristicHandle) -> Result<()> {
        let characteristic = self.find(handle)?;
        self.peripheral.subscribe(characteristic).await?;
        Ok(())
    }

    async fn unsubscribe(&self, handle: &CharacteristicHandle) -> Result<()> {
        let characteristic = self.find(handle)?;
        self.peripheral.unsubscribe(characteristic).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from device...");
        self.token.cancel();
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

impl Drop for BleLink {
    fn drop(&mut self) {
        if !self.token.is_cancelled() {
            warn!("BleLink dropped without disconnect");
            self.token.cancel();
        }
    }
}

impl Session<BleCentral> {
    /// Create a session on the first Bluetooth adapter.
    pub async fn ble(config: SessionConfig) -> Result<Self> {
        Ok(Session::with_config(BleCentral::new().await?, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.connection_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
        assert_eq!(config.write_timeout, DEFAULT_WRITE_TIMEOUT);
        assert_eq!(config.discovery_timeout, DEFAULT_DISCOVERY_TIMEOUT);
    }

    #[test]
    fn test_connection_config_presets() {
        let fast = ConnectionConfig::fast();
        let slow = ConnectionConfig::challenging_environment();
        assert!(fast.connection_timeout < DEFAULT_CONNECT_TIMEOUT);
        assert!(slow.connection_timeout > DEFAULT_CONNECT_TIMEOUT);
        assert!(fast.read_timeout < slow.read_timeout);
    }

    #[tokio::test]
    async fn test_release_runs_when_connect_fails() {
        let released = std::sync::atomic::AtomicBool::new(false);
        let result: Result<()> = release_on_error(
            async { Err(Error::timeout("discover services", Duration::from_secs(1))) },
            async { released.store(true, std::sync::atomic::Ordering::SeqCst) },
        )
        .await;

        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_release_skipped_on_success() {
        let released = std::sync::atomic::AtomicBool::new(false);
        let result = release_on_error(async { Ok(7) }, async {
            released.store(true, std::sync::atomic::Ordering::SeqCst)
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert!(!released.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::new()
            .connection_timeout(Duration::from_secs(1))
            .read_timeout(Duration::from_secs(2))
            .write_timeout(Duration::from_secs(3))
            .discovery_timeout(Duration::from_secs(4));
        assert_eq!(config.connection_timeout, Duration::from_secs(1));
        assert_eq!(config.read_timeout, Duration::from_secs(2));
        assert_eq!(config.write_timeout, Duration::from_secs(3));
        assert_eq!(config.discovery_timeout, Duration::from_secs(4));
    }
}
