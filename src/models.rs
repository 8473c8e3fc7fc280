use std::fmt;

use time::OffsetDateTime;

/// One BLE advertisement as delivered by the host radio stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementRecord {
    pub address: [u8; 6],
    pub rssi: i16,
    pub payload: Vec<u8>,
}

impl AdvertisementRecord {
    pub fn new(address: [u8; 6], rssi: i16, payload: Vec<u8>) -> Self {
        Self {
            address,
            rssi,
            payload,
        }
    }

    /// Address in the usual colon separated upper case form
    pub fn address_string(&self) -> String {
        self.address
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// The eight Tilt hydrometer identities, in beacon identifier order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TiltColor {
    Red,
    Green,
    Black,
    Purple,
    Orange,
    Blue,
    Yellow,
    Pink,
}

impl TiltColor {
    pub const ALL: [TiltColor; 8] = [
        TiltColor::Red,
        TiltColor::Green,
        TiltColor::Black,
        TiltColor::Purple,
        TiltColor::Orange,
        TiltColor::Blue,
        TiltColor::Yellow,
        TiltColor::Pink,
    ];

    /// Position in [`TiltColor::ALL`], used to index per-colour state
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            TiltColor::Red => "RED",
            TiltColor::Green => "GREEN",
            TiltColor::Black => "BLACK",
            TiltColor::Purple => "PURPLE",
            TiltColor::Orange => "ORANGE",
            TiltColor::Blue => "BLUE",
            TiltColor::Yellow => "YELLOW",
            TiltColor::Pink => "PINK",
        }
    }
}

impl fmt::Display for TiltColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated, smoothed hydrometer reading
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub color: TiltColor,
    pub temperature_f: f32,
    pub specific_gravity: f32,
    pub timestamp: OffsetDateTime,
    /// Number of raw samples the smoothed values are based on
    pub samples: usize,
}

impl SensorReading {
    pub fn temperature_c(&self) -> f32 {
        (self.temperature_f - 32.0) * 5.0 / 9.0
    }

    /// Gravity expressed in degrees Plato (cubic brewing approximation)
    pub fn plato(&self) -> f32 {
        let sg = f64::from(self.specific_gravity);
        let plato = -616.868 + 1111.14 * sg - 630.272 * sg.powi(2) + 135.997 * sg.powi(3);
        plato as f32
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn reading(temperature_f: f32, specific_gravity: f32) -> SensorReading {
        SensorReading {
            color: TiltColor::Red,
            temperature_f,
            specific_gravity,
            timestamp: OffsetDateTime::UNIX_EPOCH,
            samples: 1,
        }
    }

    #[test]
    fn address_formatting() {
        let record = AdvertisementRecord::new([0xaa, 0xbb, 0x01, 0x02, 0x0c, 0xff], -70, vec![]);
        assert_eq!(record.address_string(), "AA:BB:01:02:0C:FF");
    }

    #[test]
    fn color_indices_follow_declaration_order() {
        for (i, color) in TiltColor::ALL.iter().enumerate() {
            assert_eq!(color.index(), i);
        }
        assert_eq!(TiltColor::Pink.to_string(), "PINK");
    }

    #[test]
    fn celsius_conversion() {
        assert!((reading(212.0, 1.0).temperature_c() - 100.0).abs() < 1e-4);
        assert!((reading(68.0, 1.0).temperature_c() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn plato_conversion() {
        // Water is close to zero, 1.050 is roughly 12.4 degrees Plato
        assert!(reading(68.0, 1.0).plato().abs() < 0.01);
        assert!((reading(68.0, 1.050).plato() - 12.39).abs() < 0.05);
    }
}
