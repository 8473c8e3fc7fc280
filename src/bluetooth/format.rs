/// Beacon layout definitions for Tilt hydrometer advertisements
///
/// Tilt hydrometers broadcast an iBeacon frame inside the manufacturer
/// specific data of a BLE advertisement. All offsets below are relative to
/// the start of that manufacturer data (i.e. right after the AD type byte):
///
/// - Bytes 0-1: Company identifier (little-endian, Apple 0x004C)
/// - Byte 2: Beacon sub-type (0x02)
/// - Byte 3: Length of the remaining beacon data (0x15)
/// - Bytes 4-19: Beacon identifier (selects the hydrometer colour)
/// - Bytes 20-21: Temperature (unsigned 16-bit, big-endian)
/// - Bytes 22-23: Specific gravity (unsigned 16-bit, big-endian)
/// - Byte 24: Calibrated TX power (not used here)
use std::ops::Range;

use crate::models::TiltColor;

/// AD structure type carrying manufacturer specific data
pub const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// Byte layout and value scaling of one beacon variant
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconFormat {
    pub company_id: u16,
    pub sub_type: u8,
    pub length: u8,
    pub company_offset: usize,
    pub sub_type_offset: usize,
    pub length_offset: usize,
    pub identifier: Range<usize>,
    pub temperature_offset: usize,
    pub gravity_offset: usize,
    /// Raw temperature divided by this gives degrees Fahrenheit
    pub temperature_scale: f64,
    /// Raw gravity divided by this gives specific gravity
    pub gravity_scale: f64,
    /// Inclusive plausibility bounds, degrees Fahrenheit
    pub temperature_bounds: (f64, f64),
    /// Inclusive plausibility bounds, specific gravity
    pub gravity_bounds: (f64, f64),
}

impl BeaconFormat {
    /// Tilt hydrometer as carried in Apple iBeacon frames
    pub const TILT: BeaconFormat = BeaconFormat {
        company_id: 0x004C,
        sub_type: 0x02,
        length: 0x15,
        company_offset: 0,
        sub_type_offset: 2,
        length_offset: 3,
        identifier: 4..20,
        temperature_offset: 20,
        gravity_offset: 22,
        temperature_scale: 100.0,
        gravity_scale: 1000.0,
        temperature_bounds: (0.0, 120.0),
        gravity_bounds: (0.900, 1.200),
    };

    /// Bytes of manufacturer data needed before any field can be read
    pub const fn header_len(&self) -> usize {
        self.length_offset + 1
    }

    /// Total manufacturer data length the header promises
    pub const fn frame_len(&self) -> usize {
        self.header_len() + self.length as usize
    }

    /// Same layout with a different temperature divisor
    pub fn with_temperature_scale(mut self, scale: f64) -> Self {
        self.temperature_scale = scale;
        self
    }

    pub fn temperature_plausible(&self, temperature_f: f64) -> bool {
        temperature_f >= self.temperature_bounds.0 && temperature_f <= self.temperature_bounds.1
    }

    pub fn gravity_plausible(&self, specific_gravity: f64) -> bool {
        specific_gravity >= self.gravity_bounds.0 && specific_gravity <= self.gravity_bounds.1
    }
}

impl Default for BeaconFormat {
    fn default() -> Self {
        Self::TILT
    }
}

/// Identifier table: one row per hydrometer colour
pub const TILT_IDENTIFIERS: [(TiltColor, [u8; 16]); 8] = [
    (TiltColor::Red, tilt_identifier(0x10)),
    (TiltColor::Green, tilt_identifier(0x20)),
    (TiltColor::Black, tilt_identifier(0x30)),
    (TiltColor::Purple, tilt_identifier(0x40)),
    (TiltColor::Orange, tilt_identifier(0x50)),
    (TiltColor::Blue, tilt_identifier(0x60)),
    (TiltColor::Yellow, tilt_identifier(0x70)),
    (TiltColor::Pink, tilt_identifier(0x80)),
];

// a495bbX0-c5b1-4b44-b512-1370f02d74de
const fn tilt_identifier(color_byte: u8) -> [u8; 16] {
    [
        0xa4, 0x95, 0xbb, color_byte, 0xc5, 0xb1, 0x4b, 0x44, 0xb5, 0x12, 0x13, 0x70, 0xf0, 0x2d,
        0x74, 0xde,
    ]
}

/// Look up the hydrometer colour for a beacon identifier
pub fn color_for_identifier(identifier: &[u8]) -> Option<TiltColor> {
    TILT_IDENTIFIERS
        .iter()
        .find(|(_, id)| id.as_slice() == identifier)
        .map(|(color, _)| *color)
}

/// Beacon identifier for a colour
pub fn identifier_for_color(color: TiltColor) -> [u8; 16] {
    TILT_IDENTIFIERS[color.index()].1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilt_layout_is_contiguous() {
        let format = BeaconFormat::TILT;
        assert_eq!(format.header_len(), 4);
        assert_eq!(format.identifier.start, format.header_len());
        assert_eq!(format.temperature_offset, format.identifier.end);
        assert_eq!(format.gravity_offset, format.temperature_offset + 2);
        // identifier + temperature + gravity + tx power
        assert_eq!(format.length as usize, 16 + 2 + 2 + 1);
        assert_eq!(format.frame_len(), 25);
    }

    #[test]
    fn identifier_table_round_trips() {
        for color in TiltColor::ALL {
            let id = identifier_for_color(color);
            assert_eq!(color_for_identifier(&id), Some(color));
        }
    }

    #[test]
    fn identifier_table_matches_known_red() {
        let red = identifier_for_color(TiltColor::Red);
        let hex: String = red.iter().map(|b| format!("{:02x}", b)).collect();
        assert_eq!(hex, "a495bb10c5b14b44b5121370f02d74de");
    }

    #[test]
    fn unknown_identifier() {
        let mut id = identifier_for_color(TiltColor::Blue);
        id[3] = 0x90;
        assert_eq!(color_for_identifier(&id), None);
        assert_eq!(color_for_identifier(&[0xa4, 0x95]), None);
    }

    #[test]
    fn plausibility_bounds_are_inclusive() {
        let format = BeaconFormat::TILT;
        assert!(format.temperature_plausible(0.0));
        assert!(format.temperature_plausible(120.0));
        assert!(!format.temperature_plausible(120.01));
        assert!(format.gravity_plausible(900.0 / 1000.0));
        assert!(format.gravity_plausible(1200.0 / 1000.0));
        assert!(!format.gravity_plausible(1201.0 / 1000.0));
        assert!(!format.gravity_plausible(899.0 / 1000.0));
    }
}
