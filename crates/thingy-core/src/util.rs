//! Utility functions for thingy-core.

use btleplug::platform::PeripheralId;
use rand::Rng;

use thingy_types::{LedColor, Rgb};

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms, they may be
/// MAC addresses or other formats. This function extracts the useful
/// identifier string.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Create an identifier string from an address and peripheral ID.
///
/// On macOS where addresses are 00:00:00:00:00:00, uses the peripheral ID.
/// On other platforms, uses the Bluetooth address.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if is_placeholder_address(address) {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

fn is_placeholder_address(address: &str) -> bool {
    address == "00:00:00:00:00:00"
}

/// Pick a palette color at random.
pub fn random_color() -> LedColor {
    let index = rand::rng().random_range(0..LedColor::ALL.len());
    LedColor::ALL[index]
}

/// Pick an RGB color with random components.
pub fn random_rgb() -> Rgb {
    let mut rng = rand::rng();
    Rgb::new(rng.random(), rng.random(), rng.random())
}
