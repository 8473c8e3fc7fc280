pub mod dither;
pub mod frame;
pub mod image;
pub mod palette;

pub use dither::{quantize, DitherReport, QuantizedGrid, Quantizer};
pub use frame::{pack, FrameBuffer};
pub use palette::{ColorMetric, Palette, PaletteIndex, Pixel};
pub use image::{decode_png, read_png, RgbImage};
