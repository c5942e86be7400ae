//! Error types for thingy-core.
//!
//! This module defines all error types that can occur while driving a
//! Thingy:52 session over Bluetooth Low Energy.
//!
//! # How the session treats each error
//!
//! | Error | Raised by | Session outcome |
//! |-------|-----------|-----------------|
//! | [`Error::ConnectionFailed`] | `open`, `scan` | Session ends in `Failed`, no `connect` event |
//! | [`Error::EndpointUnavailable`] | battery resolution | Logged, endpoint absent, `open` succeeds |
//! | [`Error::Parse`] | notification decode | Logged, notification dropped, subscription kept |
//! | [`Error::SessionBusy`] | `open`, `scan`, `disconnect` | Call rejected, session untouched |
//! | [`Error::WriteFailed`] | LED/sound commands while active | Returned to caller |
//!
//! Commands issued while the session is not active are not errors: they
//! return `Ok(())` without writing anything.
//!
//! The driver never retries. Callers re-invoke `scan()` or `open()` after a
//! failed connection.

use std::time::Duration;

use thiserror::Error;

use thingy_types::{Endpoint, ParseError};

use crate::session::SessionState;

/// Errors that can occur when communicating with a Thingy:52.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Device not found during scan or connection.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Operation attempted without a live connection.
    #[error("Not connected to device")]
    NotConnected,

    /// Primary service missing from the connected device.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The service UUID that was not found.
        uuid: String,
    },

    /// Characteristic missing from an otherwise present service.
    #[error("Characteristic not found: {uuid} (in service {service})")]
    CharacteristicNotFound {
        /// The characteristic UUID that was not found.
        uuid: String,
        /// The service that was searched.
        service: String,
    },

    /// Connecting or resolving a mandatory endpoint failed.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// The device identifier that failed to connect.
        device_id: Option<String>,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// An optional endpoint could not be resolved for this session.
    #[error("Endpoint unavailable: {0}")]
    EndpointUnavailable(Endpoint),

    /// A payload could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Write operation failed.
    #[error("Write failed to characteristic {uuid}: {reason}")]
    WriteFailed {
        /// The characteristic UUID.
        uuid: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Another open, scan or disconnect is still in flight.
    #[error("Session busy: a previous call is still {state}")]
    SessionBusy {
        /// State the session was found in.
        state: SessionState,
    },
}

/// Structured reasons for connection failures.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// Bluetooth adapter not available or powered off.
    AdapterUnavailable,
    /// Device is out of range or no longer advertising.
    OutOfRange,
    /// Connection attempt timed out.
    Timeout,
    /// A mandatory endpoint could not be resolved or subscribed.
    MissingEndpoint(Endpoint),
    /// Generic BLE error.
    BleError(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdapterUnavailable => write!(f, "Bluetooth adapter unavailable"),
            Self::OutOfRange => write!(f, "device out of range"),
            Self::Timeout => write!(f, "connection timed out"),
            Self::MissingEndpoint(endpoint) => {
                write!(f, "mandatory endpoint '{}' unavailable", endpoint)
            }
            Self::BleError(msg) => write!(f, "BLE error: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Reason why a device was not found.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// No Thingy:52 advertised during the scan.
    NoDevicesInRange,
    /// Device with specified name/address not found.
    NotFound { identifier: String },
    /// No Bluetooth adapter available.
    NoAdapter,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDevicesInRange => write!(f, "no devices in range"),
            Self::NotFound { identifier } => write!(f, "device '{}' not found", identifier),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a service not found error.
    pub fn service_not_found(uuid: impl Into<String>) -> Self {
        Self::ServiceNotFound { uuid: uuid.into() }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service: impl Into<String>) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service: service.into(),
        }
    }

    /// Create a connection failure with structured reason.
    pub fn connection_failed(device_id: Option<String>, reason: ConnectionFailureReason) -> Self {
        Self::ConnectionFailed { device_id, reason }
    }

    /// Create a write failure.
    pub fn write_failed(uuid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            uuid: uuid.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using thingy-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::device_not_found("Thingy");
        assert!(err.to_string().contains("Thingy"));

        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to device");

        let err = Error::characteristic_not_found("ef680301", "ef680300");
        assert!(err.to_string().contains("ef680301"));
        assert!(err.to_string().contains("ef680300"));

        let err = Error::timeout("connect", Duration::from_secs(10));
        assert!(err.to_string().contains("connect"));
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn test_connection_failure_reason_display() {
        let err = Error::connection_failed(
            Some("AA:BB".to_string()),
            ConnectionFailureReason::MissingEndpoint(Endpoint::Button),
        );
        assert!(err.to_string().contains("button"));

        let reason = ConnectionFailureReason::BleError("gatt".to_string());
        assert_eq!(reason.to_string(), "BLE error: gatt");
    }

    #[test]
    fn test_session_busy_display() {
        let err = Error::SessionBusy {
            state: SessionState::Resolving,
        };
        assert!(err.to_string().contains("resolving"));
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = ParseError::decode(Endpoint::Battery, 1, 0).into();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("battery"));
    }

    #[test]
    fn test_device_not_found_reasons() {
        let err = Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter);
        assert!(err.to_string().contains("no Bluetooth adapter"));

        let err = Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange);
        assert!(err.to_string().contains("no devices"));
    }

    #[test]
    fn test_btleplug_error_conversion() {
        fn _assert_from_impl<T: From<btleplug::Error>>() {}
        _assert_from_impl::<Error>();
    }
}
