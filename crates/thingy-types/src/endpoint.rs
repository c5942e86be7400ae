//! Addressing table for Thingy:52 endpoints.
//!
//! Every sensor or actuator the driver talks to is an [`Endpoint`]: a logical
//! name bound to one GATT (service, characteristic) pair. The table is fixed
//! at build time; nothing here touches a transport.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ParseError, ParseResult};
use crate::uuid::{
    ACCELEROMETER, BATTERY_LEVEL, BATTERY_SERVICE, BUTTON, ENVIRONMENT_SERVICE, LED,
    MOTION_SERVICE, SOUND_CONFIG, SOUND_SERVICE, SPEAKER_DATA, TEMPERATURE, UI_SERVICE,
};

/// How the driver uses an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Direction {
    /// Values arrive only as notifications.
    Notify,
    /// Values can be read on demand and arrive as notifications.
    ReadNotify,
    /// The driver only writes to the endpoint.
    Write,
}

impl Direction {
    /// Whether notifications are subscribed for this direction.
    pub fn is_notify(&self) -> bool {
        matches!(self, Direction::Notify | Direction::ReadNotify)
    }

    /// Whether the endpoint accepts writes.
    pub fn is_write(&self) -> bool {
        matches!(self, Direction::Write)
    }
}

/// GATT coordinates of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EndpointAddress {
    /// Primary service containing the characteristic.
    pub service: Uuid,
    /// The characteristic itself.
    pub characteristic: Uuid,
}

/// A logical sensor or actuator channel on the Thingy:52.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Endpoint {
    /// Battery level percentage.
    Battery,
    /// Environment temperature.
    Temperature,
    /// Gravity vector from the motion processor.
    Accelerometer,
    /// The single push button.
    Button,
    /// The RGB LED.
    Led,
    /// Speaker/microphone mode selection.
    SoundConfig,
    /// Speaker tone data.
    Speaker,
}

impl Endpoint {
    /// Every endpoint in the table.
    pub const ALL: [Endpoint; 7] = [
        Endpoint::Battery,
        Endpoint::Temperature,
        Endpoint::Accelerometer,
        Endpoint::Button,
        Endpoint::Led,
        Endpoint::SoundConfig,
        Endpoint::Speaker,
    ];

    /// Endpoints whose resolution failure aborts a connection, in resolution order.
    pub const MANDATORY: [Endpoint; 3] = [
        Endpoint::Accelerometer,
        Endpoint::Temperature,
        Endpoint::Button,
    ];

    /// Write endpoints resolved best-effort after the sensors.
    pub const ACTUATORS: [Endpoint; 3] = [Endpoint::Led, Endpoint::SoundConfig, Endpoint::Speaker];

    /// Public name, also used as the event name for notify endpoints.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Battery => "battery",
            Endpoint::Temperature => "temperature",
            Endpoint::Accelerometer => "accelerometer",
            Endpoint::Button => "button",
            Endpoint::Led => "led",
            Endpoint::SoundConfig => "sound_config",
            Endpoint::Speaker => "speaker",
        }
    }

    /// GATT service and characteristic for this endpoint.
    pub fn address(&self) -> EndpointAddress {
        let (service, characteristic) = match self {
            Endpoint::Battery => (BATTERY_SERVICE, BATTERY_LEVEL),
            Endpoint::Temperature => (ENVIRONMENT_SERVICE, TEMPERATURE),
            Endpoint::Accelerometer => (MOTION_SERVICE, ACCELEROMETER),
            Endpoint::Button => (UI_SERVICE, BUTTON),
            Endpoint::Led => (UI_SERVICE, LED),
            Endpoint::SoundConfig => (SOUND_SERVICE, SOUND_CONFIG),
            Endpoint::Speaker => (SOUND_SERVICE, SPEAKER_DATA),
        };
        EndpointAddress {
            service,
            characteristic,
        }
    }

    /// How the driver uses this endpoint.
    pub fn direction(&self) -> Direction {
        match self {
            Endpoint::Battery => Direction::ReadNotify,
            Endpoint::Temperature | Endpoint::Accelerometer | Endpoint::Button => Direction::Notify,
            Endpoint::Led | Endpoint::SoundConfig | Endpoint::Speaker => Direction::Write,
        }
    }

    /// Find the endpoint bound to a characteristic UUID.
    pub fn from_characteristic(characteristic: Uuid) -> Option<Endpoint> {
        Self::ALL
            .into_iter()
            .find(|endpoint| endpoint.address().characteristic == characteristic)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Endpoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match wanted.as_str() {
            "battery" | "battery_level" => Ok(Endpoint::Battery),
            "temperature" | "thermometer" => Ok(Endpoint::Temperature),
            "accelerometer" | "gravity" => Ok(Endpoint::Accelerometer),
            "button" => Ok(Endpoint::Button),
            "led" => Ok(Endpoint::Led),
            "sound_config" => Ok(Endpoint::SoundConfig),
            "speaker" => Ok(Endpoint::Speaker),
            _ => Err(ParseError::UnknownEndpoint(s.to_string())),
        }
    }
}

/// Look up the GATT coordinates for an endpoint by name.
///
/// # Examples
///
/// ```
/// use thingy_types::endpoint::lookup;
/// use thingy_types::uuids;
///
/// let address = lookup("battery level").unwrap();
/// assert_eq!(address.service, uuids::BATTERY_SERVICE);
/// assert_eq!(address.characteristic, uuids::BATTERY_LEVEL);
/// assert!(lookup("humidity").is_err());
/// ```
pub fn lookup(name: &str) -> ParseResult<EndpointAddress> {
    name.parse::<Endpoint>().map(|endpoint| endpoint.address())
}
