/// Utility functions for formatting readings and frames
use time::{format_description, OffsetDateTime};

use crate::display::{FrameBuffer, PaletteIndex};
use crate::models::SensorReading;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format.
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Display strings for a reading, as drawn under the beer image
///
/// Returns (gravity in degrees Plato, temperature in Celsius), one decimal each.
pub fn reading_labels(reading: &SensorReading) -> (String, String) {
    (
        format!("{:.1} P", reading.plato()),
        format!("{:.1} C", reading.temperature_c()),
    )
}

/// Count of (white, black, red) pixels in a packed frame
pub fn ink_counts(frame: &FrameBuffer) -> (usize, usize, usize) {
    let mut counts = (0, 0, 0);
    for y in 0..frame.height {
        for x in 0..frame.width {
            match frame.index_at(x, y) {
                PaletteIndex::White => counts.0 += 1,
                PaletteIndex::Black => counts.1 += 1,
                PaletteIndex::Red => counts.2 += 1,
            }
        }
    }
    counts
}
