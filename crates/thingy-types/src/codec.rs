//! Binary codec for Thingy:52 characteristics.
//!
//! Decoders turn raw notification/read payloads into [`Reading`]s; encoders
//! turn commands into the byte layouts written to the LED and sound
//! characteristics. Everything here is pure.
//!
//! Payloads longer than required are accepted; trailing bytes are ignored.

use bytes::{Buf, BufMut};

use crate::endpoint::Endpoint;
use crate::error::{ParseError, ParseResult};
use crate::types::{Acceleration, LedCommand, Reading, SoundConfig, Tone};

/// Minimum payload length for the battery endpoint.
pub const BATTERY_BYTES: usize = 1;

/// Minimum payload length for the temperature endpoint.
pub const TEMPERATURE_BYTES: usize = 2;

/// Minimum payload length for the accelerometer endpoint.
pub const ACCELEROMETER_BYTES: usize = 12;

/// Minimum payload length for the button endpoint.
pub const BUTTON_BYTES: usize = 1;

/// Significant digits kept on each acceleration axis.
pub const ACCELERATION_PRECISION: usize = 5;

fn require(endpoint: Endpoint, data: &[u8], expected: usize) -> ParseResult<()> {
    if data.len() < expected {
        return Err(ParseError::decode(endpoint, expected, data.len()));
    }
    Ok(())
}

/// Decode a payload received on `endpoint`.
///
/// # Errors
///
/// Returns [`ParseError::Decode`] for short payloads and
/// [`ParseError::NotDecodable`] for write-only endpoints.
pub fn decode(endpoint: Endpoint, data: &[u8]) -> ParseResult<Reading> {
    match endpoint {
        Endpoint::Battery => decode_battery(data).map(Reading::BatteryLevel),
        Endpoint::Temperature => decode_temperature(data).map(Reading::Temperature),
        Endpoint::Accelerometer => decode_acceleration(data).map(Reading::Acceleration),
        Endpoint::Button => decode_button(data).map(Reading::Button),
        Endpoint::Led | Endpoint::SoundConfig | Endpoint::Speaker => {
            Err(ParseError::NotDecodable(endpoint))
        }
    }
}

/// Battery level: one unsigned byte, not clamped to 100.
pub fn decode_battery(data: &[u8]) -> ParseResult<u8> {
    require(Endpoint::Battery, data, BATTERY_BYTES)?;
    Ok(data[0])
}

/// Temperature: `[integer, fraction]` joined as the text `"{integer}.{fraction}"`.
///
/// The fraction byte is concatenated, not scaled, so a fraction of 12
/// yields `.12` and a fraction of 5 yields `.5`.
///
/// ```
/// use thingy_types::codec::decode_temperature;
///
/// assert_eq!(decode_temperature(&[20, 5]).unwrap(), 20.5);
/// assert_eq!(decode_temperature(&[20, 12]).unwrap(), 20.12);
/// ```
pub fn decode_temperature(data: &[u8]) -> ParseResult<f64> {
    require(Endpoint::Temperature, data, TEMPERATURE_BYTES)?;
    let mut buf = data;
    let integer = buf.get_u8();
    let fraction = buf.get_u8();
    format!("{integer}.{fraction}")
        .parse::<f64>()
        .map_err(|_| ParseError::decode(Endpoint::Temperature, TEMPERATURE_BYTES, data.len()))
}

/// Gravity vector: three little-endian `f32` at offsets 0, 4 and 8.
pub fn decode_acceleration(data: &[u8]) -> ParseResult<Acceleration> {
    require(Endpoint::Accelerometer, data, ACCELEROMETER_BYTES)?;
    let mut buf = data;
    let mut axis = || round_significant(f64::from(buf.get_f32_le()), ACCELERATION_PRECISION);
    let x = axis();
    let y = axis();
    let z = axis();
    Ok(Acceleration { x, y, z })
}

/// Button: pressed iff the first byte is exactly 1.
pub fn decode_button(data: &[u8]) -> ParseResult<bool> {
    require(Endpoint::Button, data, BUTTON_BYTES)?;
    Ok(data[0] == 1)
}

/// Round to `digits` significant decimal digits.
///
/// Zero, NaN and infinities are returned unchanged.
pub fn round_significant(value: f64, digits: usize) -> f64 {
    if digits == 0 || value == 0.0 || !value.is_finite() {
        return value;
    }
    format!("{:.*e}", digits - 1, value)
        .parse()
        .unwrap_or(value)
}

/// Encode an LED command.
///
/// | Mode | Payload |
/// |------|---------|
/// | Off | `[0]` |
/// | On | `[1, r, g, b]` |
/// | Breathe | `[2, color, intensity, delay_lo, delay_hi]` |
/// | FlashOnce | `[3, color, intensity]` or `[3, color, intensity, delay]` |
///
/// ```
/// use thingy_types::{LedColor, LedCommand};
/// use thingy_types::codec::encode_led;
///
/// let cmd = LedCommand::Breathe { color: LedColor::Blue, intensity: 50, delay_ms: 300 };
/// assert_eq!(encode_led(&cmd), vec![2, 4, 50, 44, 1]);
/// ```
pub fn encode_led(command: &LedCommand) -> Vec<u8> {
    let mut buf = Vec::with_capacity(5);
    buf.put_u8(command.mode() as u8);
    match *command {
        LedCommand::Off => {}
        LedCommand::On(rgb) => {
            buf.put_u8(rgb.r);
            buf.put_u8(rgb.g);
            buf.put_u8(rgb.b);
        }
        LedCommand::Breathe {
            color,
            intensity,
            delay_ms,
        } => {
            buf.put_u8(color.index());
            buf.put_u8(intensity);
            buf.put_u16_le(delay_ms);
        }
        LedCommand::FlashOnce {
            color,
            intensity,
            delay,
        } => {
            buf.put_u8(color.index());
            buf.put_u8(intensity);
            if let Some(delay) = delay {
                buf.put_u8(delay);
            }
        }
    }
    buf
}

/// Encode the sound configuration packet `[speaker_mode, microphone_mode]`.
pub fn encode_sound_config(config: &SoundConfig) -> Vec<u8> {
    vec![config.speaker as u8, config.microphone as u8]
}

/// Encode a tone packet: frequency (u16 LE), duration (u16 LE), volume.
///
/// Must be written only after [`SoundConfig::TONE`] has been acknowledged.
pub fn encode_tone(tone: &Tone) -> Vec<u8> {
    let mut buf = Vec::with_capacity(5);
    buf.put_u16_le(tone.frequency_hz);
    buf.put_u16_le(tone.duration_ms);
    buf.put_u8(tone.volume);
    buf
}
