//! Device discovery.
//!
//! This module finds Thingy:52 devices using Bluetooth Low Energy.

use std::time::Duration;

use btleplug::api::{Central as _, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::transport::{DeviceFilter, DeviceIdentity};
use crate::util::{create_identifier, format_peripheral_id};

/// Name prefix the Thingy:52 firmware advertises by default.
const DEFAULT_NAME: &str = "thingy";

/// A Thingy:52 seen during a scan.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// Identity used to open the device.
    pub identity: DeviceIdentity,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// The peripheral to connect to.
    pub peripheral: Peripheral,
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long one scan attempt lasts.
    pub duration: Duration,
    /// Number of scan attempts before giving up. Each attempt is longer
    /// than the one before.
    pub attempts: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            attempts: 3,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    #[must_use]
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    /// Set the number of scan attempts (at least one).
    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter))
}

/// Scan once for `options.duration` and return every matching device,
/// strongest signal first.
pub async fn scan_for_devices(
    adapter: &Adapter,
    filter: &DeviceFilter,
    options: &ScanOptions,
) -> Result<Vec<DiscoveredDevice>> {
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );
    adapter
        .start_scan(ScanFilter {
            services: vec![filter.required],
        })
        .await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let devices = known_devices(adapter, filter).await?;
    info!("Scan complete. Found {} device(s)", devices.len());
    Ok(devices)
}

/// Find the best matching device, scanning with increasing durations.
///
/// Peripherals the adapter already knows about are checked first, so a
/// device seen by an earlier scan is returned without scanning again.
pub async fn find_device(
    adapter: &Adapter,
    filter: &DeviceFilter,
    options: &ScanOptions,
) -> Result<DiscoveredDevice> {
    if let Some(device) = known_devices(adapter, filter).await?.into_iter().next() {
        info!("Found device in cache (no scan needed)");
        return Ok(device);
    }

    let attempts = options.attempts.max(1);
    for attempt in 1..=attempts {
        let attempt_options = ScanOptions {
            duration: options.duration * attempt,
            attempts: 1,
        };
        info!("Scan attempt {}/{}", attempt, attempts);
        if let Some(device) = scan_for_devices(adapter, filter, &attempt_options)
            .await?
            .into_iter()
            .next()
        {
            return Ok(device);
        }
        if attempt < attempts {
            warn!("No Thingy:52 found, retrying...");
        }
    }

    match &filter.identifier {
        Some(identifier) => Err(Error::device_not_found(identifier.clone())),
        None => Err(Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange)),
    }
}

async fn known_devices(adapter: &Adapter, filter: &DeviceFilter) -> Result<Vec<DiscoveredDevice>> {
    let mut devices = Vec::new();
    for peripheral in adapter.peripherals().await? {
        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            Ok(None) => continue,
            Err(e) => {
                debug!("Error reading peripheral properties: {}", e);
                continue;
            }
        };
        if !advertises_thingy(&properties, filter) {
            continue;
        }
        let id = create_identifier(&properties.address.to_string(), &peripheral.id());
        let identity = DeviceIdentity {
            id,
            name: properties.local_name.clone(),
        };
        if !filter.matches_identity(&identity)
            && !filter
                .identifier
                .as_deref()
                .is_some_and(|wanted| format_peripheral_id(&peripheral.id()).contains(wanted))
        {
            continue;
        }
        debug!("Candidate {} (rssi {:?})", identity, properties.rssi);
        devices.push(DiscoveredDevice {
            identity,
            rssi: properties.rssi,
            peripheral,
        });
    }
    devices.sort_by_key(|d| std::cmp::Reverse(d.rssi.unwrap_or(i16::MIN)));
    Ok(devices)
}

/// Matches the required service or the default advertised name.
fn advertises_thingy(properties: &PeripheralProperties, filter: &DeviceFilter) -> bool {
    if properties.services.contains(&filter.required) {
        return true;
    }
    properties
        .local_name
        .as_deref()
        .is_some_and(|name| name.to_lowercase().starts_with(DEFAULT_NAME))
}
