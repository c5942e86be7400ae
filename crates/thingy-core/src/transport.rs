//! Transport capability the session is driven through.
//!
//! [`Central`] discovers and connects devices; [`Link`] is one live GATT
//! connection. The btleplug implementation lives in [`crate::ble`] and a
//! scriptable one in [`crate::mock`], so the session state machine can be
//! exercised without hardware.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use thingy_types::uuids::{CONFIGURATION_SERVICE, OPTIONAL_SERVICES};

use crate::error::Result;

/// Identity of a discovered device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Platform identifier (peripheral ID or MAC address).
    pub id: String,
    /// Advertised local name, if any.
    pub name: Option<String>,
}

impl DeviceIdentity {
    /// Create an identity without a name.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// Create an identity with an advertised name.
    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// Criteria a device must match to be returned by [`Central::request_device`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    /// Service the device must advertise.
    pub required: Uuid,
    /// Services the session may use if present.
    pub optional: Vec<Uuid>,
    /// Name or address substring; `None` accepts any matching device.
    pub identifier: Option<String>,
}

impl DeviceFilter {
    /// Filter for a Thingy:52: the configuration service plus battery,
    /// environment, UI, motion and sound as optional services.
    pub fn thingy52() -> Self {
        Self {
            required: CONFIGURATION_SERVICE,
            optional: OPTIONAL_SERVICES.to_vec(),
            identifier: None,
        }
    }

    /// Restrict the filter to a device whose name or address contains
    /// `identifier`.
    #[must_use]
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Check a candidate's identity against the identifier, if one is set.
    ///
    /// Matching is case-insensitive and ignores `:` and `-` separators so
    /// that `aabb` matches `AA:BB:..`.
    pub fn matches_identity(&self, identity: &DeviceIdentity) -> bool {
        let Some(wanted) = &self.identifier else {
            return true;
        };
        let wanted = normalize(wanted);
        if normalize(&identity.id).contains(&wanted) {
            return true;
        }
        identity
            .name
            .as_deref()
            .is_some_and(|name| normalize(name).contains(&wanted))
    }
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// A primary service found on a connected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceHandle {
    pub uuid: Uuid,
}

/// A characteristic resolved on the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle {
    pub service: Uuid,
    pub uuid: Uuid,
}

/// Something the transport observed on a live link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A subscribed characteristic changed value.
    Notification { characteristic: Uuid, value: Vec<u8> },
    /// The device dropped the connection.
    Disconnected,
}

/// Delivers [`LinkEvent`]s from a transport back to the session that
/// opened the link.
///
/// Every connection attempt gets its own generation; events from an older
/// generation are discarded by the session.
#[derive(Debug, Clone)]
pub struct LinkEventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, LinkEvent)>,
}

impl LinkEventSender {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, LinkEvent)>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the link this sender belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Forward a notification. Returns `false` once the session is gone.
    pub fn notification(&self, characteristic: Uuid, value: Vec<u8>) -> bool {
        self.send(LinkEvent::Notification {
            characteristic,
            value,
        })
    }

    /// Report that the device disconnected. Returns `false` once the
    /// session is gone.
    pub fn disconnected(&self) -> bool {
        self.send(LinkEvent::Disconnected)
    }

    fn send(&self, event: LinkEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

/// Device discovery and connection.
#[async_trait]
pub trait Central: Send + Sync {
    /// Connection type produced by [`Central::connect`].
    type Link: Link;

    /// Find one device matching `filter`.
    async fn request_device(&self, filter: &DeviceFilter) -> Result<DeviceIdentity>;

    /// Connect to `device`. The transport reports notifications and
    /// unsolicited disconnects for this link through `events`.
    async fn connect(&self, device: &DeviceIdentity, events: LinkEventSender)
    -> Result<Self::Link>;
}

/// One live GATT connection.
#[async_trait]
pub trait Link: Send + Sync {
    /// Look up a primary service by UUID.
    async fn primary_service(&self, uuid: Uuid) -> Result<ServiceHandle>;

    /// Look up a characteristic within `service`.
    async fn characteristic(
        &self,
        service: &ServiceHandle,
        uuid: Uuid,
    ) -> Result<CharacteristicHandle>;

    /// Read the current value of a characteristic.
    async fn read(&self, handle: &CharacteristicHandle) -> Result<Vec<u8>>;

    /// Write a value and wait for the device to acknowledge it.
    async fn write(&self, handle: &CharacteristicHandle, data: &[u8]) -> Result<()>;

    /// Start value-change notifications.
    async fn subscribe(&self, handle: &CharacteristicHandle) -> Result<()>;

    /// Stop value-change notifications.
    async fn unsubscribe(&self, handle: &CharacteristicHandle) -> Result<()>;

    /// Release the connection.
    async fn disconnect(&self) -> Result<()>;
}
