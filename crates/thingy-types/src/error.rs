//! Error types for data parsing in thingy-types.

use thiserror::Error;

use crate::endpoint::Endpoint;

/// Errors that can occur when decoding Thingy:52 payloads or looking up
/// endpoints.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in thingy-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A notification or read payload was too short for its endpoint.
    #[error("Malformed {endpoint} payload: requires {expected} bytes, got {actual}")]
    Decode {
        /// The endpoint the payload arrived on.
        endpoint: Endpoint,
        /// Minimum payload length for the endpoint.
        expected: usize,
        /// Raw payload length received.
        actual: usize,
    },

    /// An endpoint name is not part of the addressing table.
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// An event name is neither a plain nor a namespaced event kind.
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// Decoding was requested for an endpoint that never produces readings.
    #[error("Endpoint {0} is write-only and cannot be decoded")]
    NotDecodable(Endpoint),

    /// A byte or name does not map to an LED palette color.
    #[error("Unknown LED color: {0}")]
    UnknownColor(String),
}

impl ParseError {
    /// Create a decode error for a short payload.
    pub fn decode(endpoint: Endpoint, expected: usize, actual: usize) -> Self {
        Self::Decode {
            endpoint,
            expected,
            actual,
        }
    }
}

/// Result type alias using thingy-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
