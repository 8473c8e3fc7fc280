/// Bit-plane packing for three-colour e-paper panels
///
/// The panel takes two 1-bit planes of equal size. Each row is packed MSB
/// first, eight pixels per byte, and padded with zero bits up to the next
/// byte boundary:
/// - black plane: bit set for black pixels
/// - red plane: bit set for red pixels
/// White pixels clear both bits; both bits set is never produced.
use crate::display::dither::QuantizedGrid;
use crate::display::palette::PaletteIndex;

/// Device-ready frame: black and red planes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub black: Vec<u8>,
    pub red: Vec<u8>,
}

impl FrameBuffer {
    /// Bytes per row in each plane
    pub fn stride(&self) -> usize {
        row_stride(self.width)
    }

    /// Palette index at (x, y), read back from the planes
    pub fn index_at(&self, x: usize, y: usize) -> PaletteIndex {
        let byte = y * self.stride() + x / 8;
        let mask = 0x80 >> (x % 8);
        match (self.black[byte] & mask != 0, self.red[byte] & mask != 0) {
            (true, _) => PaletteIndex::Black,
            (false, true) => PaletteIndex::Red,
            (false, false) => PaletteIndex::White,
        }
    }
}

/// Bytes needed for one row of `width` pixels
pub fn row_stride(width: usize) -> usize {
    width.div_ceil(8)
}

/// Pack a quantized grid into black and red bit-planes
///
/// Width and height come from the grid itself, which cannot be built with a
/// zero dimension or a cell count other than `width * height`, so there is
/// no dimension mismatch left to report here.
pub fn pack(grid: &QuantizedGrid) -> FrameBuffer {
    let width = grid.width();
    let height = grid.height();
    let stride = row_stride(width);
    let mut black = vec![0u8; stride * height];
    let mut red = vec![0u8; stride * height];

    for (y, row) in grid.rows().enumerate() {
        for (x, index) in row.iter().enumerate() {
            let byte = y * stride + x / 8;
            let mask = 0x80u8 >> (x % 8);
            let (black_bit, red_bit) = index.plane_bits();
            if black_bit {
                black[byte] |= mask;
            }
            if red_bit {
                red[byte] |= mask;
            }
        }
    }

    FrameBuffer {
        width,
        height,
        black,
        red,
    }
}
