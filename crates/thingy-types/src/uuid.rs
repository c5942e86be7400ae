//! Bluetooth UUIDs for the Nordic Thingy:52.
//!
//! All Thingy-specific UUIDs share the base `ef68xxxx-9b35-4933-9b10-52ffa9740042`;
//! the battery endpoint uses the standard 16-bit Bluetooth SIG assignments.

use uuid::{Uuid, uuid};

// --- Thingy:52 Service UUIDs ---

/// Thingy configuration service. Every Thingy:52 advertises this service,
/// so it is the mandatory filter when requesting a device.
pub const CONFIGURATION_SERVICE: Uuid = uuid!("ef680100-9b35-4933-9b10-52ffa9740042");

/// Environment service (temperature, pressure, humidity, gas, color).
pub const ENVIRONMENT_SERVICE: Uuid = uuid!("ef680200-9b35-4933-9b10-52ffa9740042");

/// User interface service (LED, button).
pub const UI_SERVICE: Uuid = uuid!("ef680300-9b35-4933-9b10-52ffa9740042");

/// Motion service (accelerometer, orientation, gravity vector).
pub const MOTION_SERVICE: Uuid = uuid!("ef680400-9b35-4933-9b10-52ffa9740042");

/// Sound service (speaker, microphone).
pub const SOUND_SERVICE: Uuid = uuid!("ef680500-9b35-4933-9b10-52ffa9740042");

// --- Thingy:52 Characteristic UUIDs ---

/// Temperature characteristic: `[integer, fraction]`.
pub const TEMPERATURE: Uuid = uuid!("ef680201-9b35-4933-9b10-52ffa9740042");

/// LED characteristic: `[mode, ...]`.
pub const LED: Uuid = uuid!("ef680301-9b35-4933-9b10-52ffa9740042");

/// Button characteristic: one byte, `1` while pressed.
pub const BUTTON: Uuid = uuid!("ef680302-9b35-4933-9b10-52ffa9740042");

/// Gravity vector characteristic: three little-endian `f32` values.
pub const ACCELEROMETER: Uuid = uuid!("ef68040a-9b35-4933-9b10-52ffa9740042");

/// Sound configuration characteristic: `[speaker_mode, microphone_mode]`.
pub const SOUND_CONFIG: Uuid = uuid!("ef680501-9b35-4933-9b10-52ffa9740042");

/// Speaker data characteristic.
pub const SPEAKER_DATA: Uuid = uuid!("ef680502-9b35-4933-9b10-52ffa9740042");

// --- Standard BLE UUIDs ---

/// Battery service.
pub const BATTERY_SERVICE: Uuid = uuid!("0000180f-0000-1000-8000-00805f9b34fb");

/// Battery level characteristic.
pub const BATTERY_LEVEL: Uuid = uuid!("00002a19-0000-1000-8000-00805f9b34fb");

/// Services requested alongside [`CONFIGURATION_SERVICE`] when scanning.
pub const OPTIONAL_SERVICES: [Uuid; 5] = [
    BATTERY_SERVICE,
    ENVIRONMENT_SERVICE,
    UI_SERVICE,
    MOTION_SERVICE,
    SOUND_SERVICE,
];
