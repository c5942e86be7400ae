//! Platform-agnostic types for the Nordic Thingy:52 sensor.
//!
//! This crate holds everything about the Thingy:52 protocol that does not
//! need a Bluetooth stack, so it can be shared by native and embedded
//! front-ends alike.
//!
//! # Features
//!
//! - Addressing table mapping logical endpoints to GATT UUIDs
//! - Decoders for battery, temperature, accelerometer and button payloads
//! - Encoders for LED and sound commands
//! - Error types for data parsing
//!
//! # Example
//!
//! ```
//! use thingy_types::{Endpoint, Reading, codec};
//!
//! let reading = codec::decode(Endpoint::Temperature, &[23, 4]).unwrap();
//! assert_eq!(reading, Reading::Temperature(23.4));
//! ```

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod types;
pub mod uuid;

pub use endpoint::{Direction, Endpoint, EndpointAddress, lookup};
pub use error::{ParseError, ParseResult};
pub use types::{
    Acceleration, LedColor, LedCommand, LedMode, MicrophoneMode, Reading, Rgb, SoundConfig,
    SpeakerMode, Tone,
};
pub use uuid as uuids;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_then_endpoint_roundtrip() {
        let readings = [
            (Endpoint::Battery, vec![90]),
            (Endpoint::Temperature, vec![22, 7]),
            (Endpoint::Accelerometer, vec![0; 12]),
            (Endpoint::Button, vec![1]),
        ];

        for (endpoint, payload) in readings {
            let reading = codec::decode(endpoint, &payload).unwrap();
            assert_eq!(reading.endpoint(), endpoint);
        }
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::decode(Endpoint::Button, 1, 0);
        assert_eq!(
            err.to_string(),
            "Malformed button payload: requires 1 bytes, got 0"
        );
    }

    #[test]
    fn test_parse_error_debug() {
        let err = ParseError::UnknownEndpoint("humidity".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("UnknownEndpoint"));
        assert!(debug_str.contains("humidity"));
    }

    #[test]
    fn test_endpoint_serialization() {
        assert_eq!(
            serde_json::to_string(&Endpoint::SoundConfig).unwrap(),
            "\"sound_config\""
        );
        let endpoint: Endpoint = serde_json::from_str("\"battery\"").unwrap();
        assert_eq!(endpoint, Endpoint::Battery);
    }

    #[test]
    fn test_endpoint_address_serialization() {
        let json = serde_json::to_string(&Endpoint::Battery.address()).unwrap();
        assert!(json.contains("0000180f-0000-1000-8000-00805f9b34fb"));
        assert!(json.contains("00002a19-0000-1000-8000-00805f9b34fb"));
    }
}
