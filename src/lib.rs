//! Tilt hydrometer beacons and three-colour e-paper frames.
//!
//! The pieces of a "what's on tap" display that wakes, updates and sleeps:
//! - [`bluetooth`]: pick Tilt beacons out of BLE advertisements, decode and
//!   smooth their temperature/gravity readings, and scan for them with BlueZ
//! - [`display`]: dither an RGB image onto the white/black/red palette and
//!   pack it into the two bit-planes the panel takes
//!
//! Everything except [`bluetooth::scanner`] is synchronous and pure.

pub mod bluetooth;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod utils;

pub use error::{DecodeError, ImageError};
pub use models::{AdvertisementRecord, SensorReading, TiltColor};
