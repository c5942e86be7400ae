//! Core types for Thingy:52 readings and commands.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;
use crate::error::ParseError;

/// Three-axis acceleration in g, each axis rounded to 5 significant digits.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Acceleration {
    /// X axis.
    pub x: f64,
    /// Y axis.
    pub y: f64,
    /// Z axis.
    pub z: f64,
}

/// A typed value decoded from one notification or read payload.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value", rename_all = "snake_case"))]
pub enum Reading {
    /// Battery level as reported (nominally 0-100, not clamped).
    BatteryLevel(u8),
    /// Temperature in degrees Celsius.
    Temperature(f64),
    /// Gravity vector.
    Acceleration(Acceleration),
    /// Button state, `true` while pressed.
    Button(bool),
}

impl Reading {
    /// The endpoint this reading belongs to.
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Reading::BatteryLevel(_) => Endpoint::Battery,
            Reading::Temperature(_) => Endpoint::Temperature,
            Reading::Acceleration(_) => Endpoint::Accelerometer,
            Reading::Button(_) => Endpoint::Button,
        }
    }
}

/// LED mode tag, the first byte of every LED payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum LedMode {
    /// LED off.
    Off = 0,
    /// Constant RGB color.
    On = 1,
    /// Pulsing palette color.
    Breathe = 2,
    /// Single flash of a palette color.
    FlashOnce = 3,
}

/// Palette colors accepted by the breathe and flash-once modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum LedColor {
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Purple = 5,
    Cyan = 6,
    White = 7,
}

impl LedColor {
    /// Every palette color in index order.
    pub const ALL: [LedColor; 7] = [
        LedColor::Red,
        LedColor::Green,
        LedColor::Yellow,
        LedColor::Blue,
        LedColor::Purple,
        LedColor::Cyan,
        LedColor::White,
    ];

    /// Palette index sent on the wire.
    pub fn index(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for LedColor {
    type Error = ParseError;

    /// Convert a palette index to a `LedColor`.
    ///
    /// # Examples
    ///
    /// ```
    /// use thingy_types::LedColor;
    ///
    /// assert_eq!(LedColor::try_from(4), Ok(LedColor::Blue));
    /// assert!(LedColor::try_from(0).is_err());
    /// ```
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        LedColor::ALL
            .into_iter()
            .find(|color| color.index() == value)
            .ok_or_else(|| ParseError::UnknownColor(value.to_string()))
    }
}

impl FromStr for LedColor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<u8>() {
            return LedColor::try_from(index);
        }
        match s.to_ascii_lowercase().as_str() {
            "red" => Ok(LedColor::Red),
            "green" => Ok(LedColor::Green),
            "yellow" => Ok(LedColor::Yellow),
            "blue" => Ok(LedColor::Blue),
            "purple" => Ok(LedColor::Purple),
            "cyan" => Ok(LedColor::Cyan),
            "white" => Ok(LedColor::White),
            _ => Err(ParseError::UnknownColor(s.to_string())),
        }
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedColor::Red => "red",
            LedColor::Green => "green",
            LedColor::Yellow => "yellow",
            LedColor::Blue => "blue",
            LedColor::Purple => "purple",
            LedColor::Cyan => "cyan",
            LedColor::White => "white",
        };
        f.write_str(name)
    }
}

/// An arbitrary RGB color for [`LedMode::On`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Create a color from its components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Full-brightness white.
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
}

/// An outbound LED command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "snake_case"))]
pub enum LedCommand {
    /// Turn the LED off.
    Off,
    /// Constant RGB color.
    On(Rgb),
    /// Pulse a palette color; `delay_ms` is the breathe period.
    Breathe {
        color: LedColor,
        intensity: u8,
        delay_ms: u16,
    },
    /// Flash a palette color once.
    ///
    /// Two payload layouts exist in deployed firmware clients: the 3-byte
    /// form without delay and a 4-byte form with a trailing delay byte.
    /// `delay: None` selects the former.
    FlashOnce {
        color: LedColor,
        intensity: u8,
        delay: Option<u8>,
    },
}

impl LedCommand {
    /// Mode tag for this command.
    pub fn mode(&self) -> LedMode {
        match self {
            LedCommand::Off => LedMode::Off,
            LedCommand::On(_) => LedMode::On,
            LedCommand::Breathe { .. } => LedMode::Breathe,
            LedCommand::FlashOnce { .. } => LedMode::FlashOnce,
        }
    }
}

/// Speaker mode selected before streaming speaker data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum SpeakerMode {
    /// Play a tone described by frequency, duration and volume.
    Frequency = 1,
    /// Stream 8-bit PCM.
    Pcm = 2,
    /// Play one of the built-in samples.
    Sample = 3,
}

/// Microphone mode selected alongside the speaker mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum MicrophoneMode {
    Adpcm = 1,
    Spl = 2,
}

/// Contents of the sound configuration characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SoundConfig {
    pub speaker: SpeakerMode,
    pub microphone: MicrophoneMode,
}

impl SoundConfig {
    /// The configuration a tone requires.
    pub const TONE: SoundConfig = SoundConfig {
        speaker: SpeakerMode::Frequency,
        microphone: MicrophoneMode::Adpcm,
    };
}

/// A tone played in [`SpeakerMode::Frequency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tone {
    /// Frequency in Hz.
    pub frequency_hz: u16,
    /// Duration in milliseconds.
    pub duration_ms: u16,
    /// Volume 0-100.
    pub volume: u8,
}

impl Tone {
    /// Create a tone.
    pub const fn new(frequency_hz: u16, duration_ms: u16, volume: u8) -> Self {
        Self {
            frequency_hz,
            duration_ms,
            volume,
        }
    }
}

impl Default for Tone {
    fn default() -> Self {
        Tone::new(1000, 100, 100)
    }
}
