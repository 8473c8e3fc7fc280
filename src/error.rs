//! Error types for beacon decoding and image loading.

use thiserror::Error;

/// Reasons a matched advertisement does not yield a reading.
///
/// None of these abort a wake cycle: the record is dropped and the sensor
/// is treated as absent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Payload has the beacon shape but carries an identifier we don't know.
    #[error("unknown device identifier {}", hex(.identifier))]
    UnknownDevice {
        /// The 16-byte beacon identifier as received.
        identifier: [u8; 16],
    },

    /// Decoded values are outside physical bounds.
    #[error("implausible reading: {temperature_f} F, gravity {specific_gravity}")]
    ImplausibleReading {
        /// Scaled temperature in degrees Fahrenheit.
        temperature_f: f64,
        /// Scaled specific gravity.
        specific_gravity: f64,
    },

    /// Payload length or shape does not match the fixed beacon layout.
    #[error("malformed payload ({len} bytes)")]
    MalformedPayload {
        /// Length of the offending payload.
        len: usize,
    },
}

impl DecodeError {
    /// Creates an unknown device error.
    #[must_use]
    pub const fn unknown_device(identifier: [u8; 16]) -> Self {
        Self::UnknownDevice { identifier }
    }

    /// Creates an implausible reading error.
    #[must_use]
    pub const fn implausible(temperature_f: f64, specific_gravity: f64) -> Self {
        Self::ImplausibleReading {
            temperature_f,
            specific_gravity,
        }
    }

    /// Creates a malformed payload error.
    #[must_use]
    pub const fn malformed(len: usize) -> Self {
        Self::MalformedPayload { len }
    }
}

/// Errors loading the panel image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("png decoding failed: {0}")]
    Png(#[from] png::DecodingError),

    #[error("unsupported image format: {0}")]
    Unsupported(String),
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_device_shows_identifier() {
        let mut identifier = [0u8; 16];
        identifier[0] = 0xa4;
        identifier[15] = 0xde;
        let err = DecodeError::unknown_device(identifier);
        let text = err.to_string();
        assert!(text.contains("unknown device"));
        assert!(text.ends_with("a40000000000000000000000000000de"));
    }

    #[test]
    fn implausible_reading_message() {
        let err = DecodeError::implausible(200.0, 1.05);
        assert!(err.to_string().contains("implausible reading"));
        assert!(err.to_string().contains("200"));
    }

    #[test]
    fn malformed_payload_message() {
        let err = DecodeError::malformed(7);
        assert!(err.to_string().contains("malformed payload"));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn unsupported_image_message() {
        let err = ImageError::Unsupported("16-bit samples".into());
        assert!(err.to_string().contains("16-bit samples"));
    }
}
