/// Tilt hydrometer decoding and per-colour smoothing
use log::debug;
use std::collections::HashMap;
use time::OffsetDateTime;

use crate::bluetooth::filter::{filter, find_beacon};
use crate::bluetooth::format::{color_for_identifier, BeaconFormat};
use crate::error::DecodeError;
use crate::models::{AdvertisementRecord, SensorReading, TiltColor};

/// Samples kept per hydrometer for smoothing
pub const WINDOW_SIZE: usize = 5;

/// One validated reading in raw transport units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    pub temperature: u16,
    pub gravity: u16,
}

/// Fixed-capacity ring buffer of the most recent raw samples
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SmoothingWindow {
    samples: [RawSample; WINDOW_SIZE],
    cursor: usize,
    len: usize,
}

impl SmoothingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add a sample, overwriting the oldest one once full
    pub fn push(&mut self, sample: RawSample) {
        self.samples[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % WINDOW_SIZE;
        self.len = (self.len + 1).min(WINDOW_SIZE);
    }

    /// Samples currently held, in no particular order
    pub fn samples(&self) -> &[RawSample] {
        // Until the buffer wraps the live samples are the first `len` slots
        &self.samples[..self.len]
    }

    /// Arithmetic mean of (temperature, gravity), in raw units
    pub fn mean(&self) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }
        let (temp_sum, gravity_sum) = self
            .samples()
            .iter()
            .fold((0u32, 0u32), |(t, g), s| {
                (t + u32::from(s.temperature), g + u32::from(s.gravity))
            });
        let count = self.len as f32;
        Some((temp_sum as f32 / count, gravity_sum as f32 / count))
    }
}

/// Decodes matched beacon advertisements into smoothed readings
///
/// Each hydrometer colour keeps its own smoothing window. Windows live only
/// as long as the decoder, i.e. one wake cycle.
#[derive(Debug, Clone, Default)]
pub struct TiltDecoder {
    format: BeaconFormat,
    windows: [SmoothingWindow; 8],
}

impl TiltDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(format: BeaconFormat) -> Self {
        Self {
            format,
            windows: Default::default(),
        }
    }

    pub fn window(&self, color: TiltColor) -> &SmoothingWindow {
        &self.windows[color.index()]
    }

    /// Decode one advertisement
    ///
    /// A validated sample is pushed into the colour's window and the returned
    /// reading carries the window mean. Rejected samples leave every window
    /// untouched.
    pub fn decode(&mut self, record: &AdvertisementRecord) -> Result<SensorReading, DecodeError> {
        let (color, sample) = self.parse(&record.payload)?;

        let window = &mut self.windows[color.index()];
        window.push(sample);
        let (temp_mean, gravity_mean) = window
            .mean()
            .ok_or_else(|| DecodeError::malformed(record.payload.len()))?;

        Ok(SensorReading {
            color,
            temperature_f: temp_mean / self.format.temperature_scale as f32,
            specific_gravity: gravity_mean / self.format.gravity_scale as f32,
            timestamp: OffsetDateTime::now_utc(),
            samples: window.len(),
        })
    }

    /// Extract and validate the raw sample without touching any window
    pub fn parse(&self, payload: &[u8]) -> Result<(TiltColor, RawSample), DecodeError> {
        let format = &self.format;
        let data = find_beacon(payload, format).ok_or(DecodeError::malformed(payload.len()))?;
        if data.len() < format.frame_len() {
            return Err(DecodeError::malformed(payload.len()));
        }

        let identifier = &data[format.identifier.clone()];
        let color = color_for_identifier(identifier).ok_or_else(|| {
            let mut id = [0u8; 16];
            id.copy_from_slice(identifier);
            DecodeError::unknown_device(id)
        })?;

        let t = format.temperature_offset;
        let g = format.gravity_offset;
        let sample = RawSample {
            temperature: u16::from_be_bytes([data[t], data[t + 1]]),
            gravity: u16::from_be_bytes([data[g], data[g + 1]]),
        };

        let temperature_f = f64::from(sample.temperature) / format.temperature_scale;
        let specific_gravity = f64::from(sample.gravity) / format.gravity_scale;
        if !format.temperature_plausible(temperature_f) || !format.gravity_plausible(specific_gravity)
        {
            return Err(DecodeError::implausible(temperature_f, specific_gravity));
        }

        Ok((color, sample))
    }

    /// Decode a whole scan batch
    ///
    /// Records not shaped like a beacon are skipped, decode failures are
    /// logged and dropped. Returns the latest smoothed reading per colour;
    /// an empty map means no hydrometer was heard.
    pub fn decode_batch(
        &mut self,
        records: &[AdvertisementRecord],
    ) -> HashMap<TiltColor, SensorReading> {
        let mut readings = HashMap::new();

        for record in filter(records, &self.format) {
            match self.decode(&record) {
                Ok(reading) => {
                    debug!(
                        "Tilt {} from {}: {:.2}F, SG {:.3} ({} samples)",
                        reading.color,
                        record.address_string(),
                        reading.temperature_f,
                        reading.specific_gravity,
                        reading.samples
                    );
                    readings.insert(reading.color, reading);
                }
                Err(e) => {
                    debug!("Dropping advertisement from {}: {}", record.address_string(), e);
                }
            }
        }

        readings
    }
}
