//! Floyd-Steinberg error diffusion onto the three-ink palette.
//!
//! Pixels are visited strictly row-major, left to right. Each pixel's
//! effective colour is its source colour plus the error pushed to it by
//! already visited pixels; the difference between that and the chosen ink
//! is spread to the four unvisited neighbours. Error that would land outside
//! the image is dropped.

use crate::display::palette::{ColorMetric, Palette, PaletteIndex, Pixel};

/// Neighbour offsets (dx, dy) and their share of the error, in sixteenths
pub const DIFFUSION: [(isize, isize, f32); 4] = [
    (1, 0, 7.0 / 16.0),
    (-1, 1, 3.0 / 16.0),
    (0, 1, 5.0 / 16.0),
    (1, 1, 1.0 / 16.0),
];

/// Palette index per pixel, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedGrid {
    width: usize,
    height: usize,
    cells: Vec<PaletteIndex>,
}

impl QuantizedGrid {
    /// Wrap existing indices
    ///
    /// # Panics
    /// If a dimension is zero or `cells` is not `width * height` long.
    pub fn new(width: usize, height: usize, cells: Vec<PaletteIndex>) -> Self {
        check_dimensions(width, height, cells.len());
        Self {
            width,
            height,
            cells,
        }
    }

    /// All-white grid
    pub fn blank(width: usize, height: usize) -> Self {
        Self::new(width, height, vec![PaletteIndex::White; width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> PaletteIndex {
        self.cells[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, index: PaletteIndex) {
        self.cells[y * self.width + x] = index;
    }

    pub fn row(&self, y: usize) -> &[PaletteIndex] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[PaletteIndex]> {
        self.cells.chunks_exact(self.width)
    }

    pub fn as_slice(&self) -> &[PaletteIndex] {
        &self.cells
    }

    pub fn count(&self, index: PaletteIndex) -> usize {
        self.cells.iter().filter(|&&cell| cell == index).count()
    }
}

/// Pending per-channel error for every pixel of the image
#[derive(Debug, Clone, PartialEq)]
struct ErrorBuffer {
    width: usize,
    height: usize,
    errors: Vec<[f32; 3]>,
}

impl ErrorBuffer {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            errors: vec![[0.0; 3]; width * height],
        }
    }

    fn get(&self, x: usize, y: usize) -> [f32; 3] {
        self.errors[y * self.width + x]
    }

    /// Accumulate `error * weight` at (x, y), or report it as dropped when
    /// the position is outside the image
    fn add(&mut self, x: isize, y: isize, error: [f32; 3], weight: f32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        let cell = &mut self.errors[y as usize * self.width + x as usize];
        for (acc, e) in cell.iter_mut().zip(error) {
            *acc += e * weight;
        }
        true
    }
}

/// Outcome of one diffusion pass: the grid plus where the error went
#[derive(Debug, Clone)]
pub struct DitherReport {
    grid: QuantizedGrid,
    error: ErrorBuffer,
    dropped: [f32; 3],
}

impl DitherReport {
    pub fn grid(&self) -> &QuantizedGrid {
        &self.grid
    }

    pub fn into_grid(self) -> QuantizedGrid {
        self.grid
    }

    /// Error that had accumulated at (x, y) by the time it was visited
    pub fn pending_error(&self, x: usize, y: usize) -> [f32; 3] {
        self.error.get(x, y)
    }

    /// Per-channel error that fell outside the image
    pub fn dropped_error(&self) -> [f32; 3] {
        self.dropped
    }
}

/// Error-diffusion quantizer with a configurable palette and colour metric
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quantizer {
    pub palette: Palette,
    pub metric: ColorMetric,
}

impl Quantizer {
    pub fn new(palette: Palette, metric: ColorMetric) -> Self {
        Self { palette, metric }
    }

    /// Quantize a row-major pixel grid
    ///
    /// # Panics
    /// If a dimension is zero or `pixels` is not `width * height` long.
    pub fn quantize(&self, pixels: &[Pixel], width: usize, height: usize) -> QuantizedGrid {
        self.dither(pixels, width, height).into_grid()
    }

    /// Quantize and keep the diffusion bookkeeping
    ///
    /// # Panics
    /// If a dimension is zero or `pixels` is not `width * height` long.
    pub fn dither(&self, pixels: &[Pixel], width: usize, height: usize) -> DitherReport {
        check_dimensions(width, height, pixels.len());

        let mut cells = Vec::with_capacity(width * height);
        let mut error = ErrorBuffer::new(width, height);
        let mut dropped = [0.0f32; 3];

        for y in 0..height {
            for x in 0..width {
                let source = pixels[y * width + x].to_rgb();
                let pending = error.get(x, y);
                let effective = [
                    source[0] + pending[0],
                    source[1] + pending[1],
                    source[2] + pending[2],
                ];

                let index = self.palette.nearest(effective, self.metric);
                cells.push(index);

                let ink = self.palette.rgb(index);
                let residual = [
                    effective[0] - ink[0],
                    effective[1] - ink[1],
                    effective[2] - ink[2],
                ];

                for (dx, dy, weight) in DIFFUSION {
                    if !error.add(x as isize + dx, y as isize + dy, residual, weight) {
                        for (d, r) in dropped.iter_mut().zip(residual) {
                            *d += r * weight;
                        }
                    }
                }
            }
        }

        DitherReport {
            grid: QuantizedGrid {
                width,
                height,
                cells,
            },
            error,
            dropped,
        }
    }
}

/// Quantize with the default white/black/red palette and Euclidean distance
///
/// # Panics
/// If a dimension is zero or `pixels` is not `width * height` long.
pub fn quantize(pixels: &[Pixel], width: usize, height: usize) -> QuantizedGrid {
    Quantizer::default().quantize(pixels, width, height)
}

fn check_dimensions(width: usize, height: usize, len: usize) {
    assert!(
        width > 0 && height > 0,
        "image dimensions must be positive, got {}x{}",
        width,
        height
    );
    assert_eq!(
        len,
        width * height,
        "expected {} pixels for a {}x{} image",
        width * height,
        width,
        height
    );
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    const WHITE: Pixel = Pixel::new(255, 255, 255);
    const BLACK: Pixel = Pixel::new(0, 0, 0);
    const RED: Pixel = Pixel::new(255, 0, 0);

    /// Deterministic pseudo-random test image
    fn noise_image(width: usize, height: usize, seed: u32) -> Vec<Pixel> {
        let mut state = seed;
        (0..width * height)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let [r, g, b, _] = state.to_be_bytes();
                Pixel::new(r, g, b)
            })
            .collect()
    }

    #[test]
    fn weights_sum_to_one() {
        let total: f32 = DIFFUSION.iter().map(|(_, _, w)| w).sum();
        assert_eq!(total, 1.0);
        // Only unvisited neighbours receive error
        for (dx, dy, _) in DIFFUSION {
            assert!(dy > 0 || (dy == 0 && dx > 0));
        }
    }

    #[test]
    fn exact_inks_leave_no_error() {
        let report = Quantizer::default().dither(&[WHITE, BLACK], 2, 1);
        assert_eq!(
            report.grid().as_slice(),
            &[PaletteIndex::White, PaletteIndex::Black]
        );
        assert!((0..2).all(|x| report.pending_error(x, 0) == [0.0; 3]));
        assert_eq!(report.dropped_error(), [0.0; 3]);
    }

    #[test]
    fn error_goes_right_and_edges_drop() {
        // Grey 100 maps to black with error 100 per channel; 7/16 of it lands
        // on the white pixel, the rest falls off the bottom edge
        let report = Quantizer::default().dither(&[Pixel::new(100, 100, 100), WHITE], 2, 1);
        assert_eq!(
            report.grid().as_slice(),
            &[PaletteIndex::Black, PaletteIndex::White]
        );
        assert_eq!(report.pending_error(1, 0), [43.75; 3]);
        // 9/16 of 100 from the first pixel, all 43.75 of the second
        for d in report.dropped_error() {
            assert!((d - (56.25 + 43.75)).abs() < 1e-3);
        }
    }

    #[test]
    fn error_reaches_the_next_row() {
        let pixels = [
            Pixel::new(100, 100, 100),
            WHITE,
            WHITE,
            WHITE,
            WHITE,
            WHITE,
        ];
        let report = Quantizer::default().dither(&pixels, 3, 2);
        assert_eq!(report.grid().get(0, 0), PaletteIndex::Black);
        // 5/16 of the first pixel's error plus 3/16 of what (1,0) passes on
        assert_eq!(report.pending_error(0, 1), [31.25 + 8.203125; 3]);
        assert!(report.pending_error(1, 1)[0] > 6.25);
    }

    #[test]
    fn error_is_conserved() {
        let (width, height) = (13, 9);
        let pixels = noise_image(width, height, 7);
        let quantizer = Quantizer::default();
        let report = quantizer.dither(&pixels, width, height);

        let mut introduced = [0.0f64; 3];
        let mut received = [0.0f64; 3];
        for y in 0..height {
            for x in 0..width {
                let source = pixels[y * width + x].to_rgb();
                let pending = report.pending_error(x, y);
                let ink = quantizer.palette.rgb(report.grid().get(x, y));
                for c in 0..3 {
                    introduced[c] += f64::from(source[c] + pending[c] - ink[c]);
                    received[c] += f64::from(pending[c]);
                }
            }
        }
        for c in 0..3 {
            let accounted = received[c] + f64::from(report.dropped_error()[c]);
            assert!(
                (introduced[c] - accounted).abs() < 0.5,
                "channel {}: introduced {} accounted {}",
                c,
                introduced[c],
                accounted
            );
        }
    }

    #[test]
    fn flat_grey_dithers_to_a_mix() {
        let pixels = vec![Pixel::new(128, 128, 128); 16 * 16];
        let grid = quantize(&pixels, 16, 16);
        let black = grid.count(PaletteIndex::Black);
        let white = grid.count(PaletteIndex::White);
        assert!(black > 64 && white > 64, "black {} white {}", black, white);
        assert_eq!(black + white + grid.count(PaletteIndex::Red), 256);
    }

    #[test]
    fn is_deterministic() {
        let pixels = noise_image(20, 11, 99);
        assert_eq!(quantize(&pixels, 20, 11), quantize(&pixels, 20, 11));
    }

    #[test]
    fn solid_inks_stay_solid() {
        let grid = quantize(&vec![RED; 12], 4, 3);
        assert_eq!(grid.count(PaletteIndex::Red), 12);
        assert_eq!(grid.rows().count(), 3);
        assert_eq!(grid.row(2), &[PaletteIndex::Red; 4]);
    }

    #[test]
    #[should_panic(expected = "dimensions must be positive")]
    fn zero_width_panics() {
        quantize(&[], 0, 4);
    }

    #[test]
    #[should_panic(expected = "expected 6 pixels")]
    fn pixel_count_mismatch_panics() {
        quantize(&[WHITE; 5], 3, 2);
    }

    #[test]
    fn grid_accessors() {
        let mut grid = QuantizedGrid::blank(3, 2);
        grid.set(2, 1, PaletteIndex::Red);
        assert_eq!(grid.get(2, 1), PaletteIndex::Red);
        assert_eq!(grid.row(0), &[PaletteIndex::White; 3]);
        assert_eq!(grid.count(PaletteIndex::White), 5);
    }
}
