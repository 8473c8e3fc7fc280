//! PNG images as pixel source for the panel.
//!
//! Every PNG colour type is accepted. Palette and low bit depth images are
//! expanded, 16-bit samples are stripped to 8 bits, and transparency is
//! composited over white, the colour of an unpainted panel.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use png::{BitDepth, ColorType, Decoder, Transformations};

use crate::display::palette::Pixel;
use crate::error::ImageError;

/// A decoded RGB image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Pixel>,
}

/// Read a PNG image from disk
pub fn read_png(path: &Path) -> Result<RgbImage, ImageError> {
    let file = File::open(path)?;
    decode_png(BufReader::new(file))
}

/// Decode a PNG stream into row-major RGB pixels
pub fn decode_png<R: Read>(source: R) -> Result<RgbImage, ImageError> {
    let mut decoder = Decoder::new(source);
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    if info.bit_depth != BitDepth::Eight {
        return Err(ImageError::Unsupported(format!(
            "{:?} bit samples after expansion",
            info.bit_depth
        )));
    }

    let data = &buf[..info.buffer_size()];
    let pixels: Vec<Pixel> = match info.color_type {
        ColorType::Rgb => data
            .chunks_exact(3)
            .map(|c| Pixel::new(c[0], c[1], c[2]))
            .collect(),
        ColorType::Rgba => data
            .chunks_exact(4)
            .map(|c| over_white([c[0], c[1], c[2]], c[3]))
            .collect(),
        ColorType::Grayscale => data.iter().map(|&g| Pixel::new(g, g, g)).collect(),
        ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .map(|c| over_white([c[0]; 3], c[1]))
            .collect(),
        ColorType::Indexed => {
            return Err(ImageError::Unsupported("unexpanded palette image".into()));
        }
    };

    let (width, height) = (info.width as usize, info.height as usize);
    if pixels.len() != width * height {
        return Err(ImageError::Unsupported(format!(
            "{} pixels decoded for a {}x{} image",
            pixels.len(),
            width,
            height
        )));
    }

    Ok(RgbImage {
        width,
        height,
        pixels,
    })
}

fn over_white(rgb: [u8; 3], alpha: u8) -> Pixel {
    let alpha = u16::from(alpha);
    let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
    Pixel::new(blend(rgb[0]), blend(rgb[1]), blend(rgb[2]))
}
