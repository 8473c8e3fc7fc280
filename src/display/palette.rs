//! Three-colour e-paper palette and nearest-colour lookup

/// An 8-bit RGB source pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgb(self) -> [f32; 3] {
        [f32::from(self.r), f32::from(self.g), f32::from(self.b)]
    }
}

/// Ink colour of one display pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaletteIndex {
    #[default]
    White = 0,
    Black = 1,
    Red = 2,
}

impl PaletteIndex {
    /// Declaration order, which is also the tie-break order
    pub const ALL: [PaletteIndex; 3] = [PaletteIndex::White, PaletteIndex::Black, PaletteIndex::Red];

    /// (black plane bit, red plane bit)
    pub const fn plane_bits(self) -> (bool, bool) {
        match self {
            PaletteIndex::White => (false, false),
            PaletteIndex::Black => (true, false),
            PaletteIndex::Red => (false, true),
        }
    }
}

/// How "near" two colours are
///
/// Distances are compared, never reported, so both metrics return squared
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ColorMetric {
    /// Plain squared Euclidean distance in RGB space
    #[default]
    Euclidean,
    /// Channel differences weighted by their luminance contribution (Rec. 601)
    Luminance,
}

impl ColorMetric {
    pub fn distance(self, a: [f32; 3], b: [f32; 3]) -> f32 {
        let dr = a[0] - b[0];
        let dg = a[1] - b[1];
        let db = a[2] - b[2];
        match self {
            ColorMetric::Euclidean => dr * dr + dg * dg + db * db,
            ColorMetric::Luminance => 0.299 * dr * dr + 0.587 * dg * dg + 0.114 * db * db,
        }
    }
}

/// RGB values of the three inks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    colors: [[f32; 3]; 3],
}

impl Palette {
    pub const WHITE_BLACK_RED: Palette = Palette {
        colors: [[255.0, 255.0, 255.0], [0.0, 0.0, 0.0], [255.0, 0.0, 0.0]],
    };

    /// Palette with custom ink colours, given in White, Black, Red order
    pub fn new(white: Pixel, black: Pixel, red: Pixel) -> Self {
        Self {
            colors: [white.to_rgb(), black.to_rgb(), red.to_rgb()],
        }
    }

    pub fn rgb(&self, index: PaletteIndex) -> [f32; 3] {
        self.colors[index as usize]
    }

    /// Closest ink to `color`; ties go to the earliest declared entry
    pub fn nearest(&self, color: [f32; 3], metric: ColorMetric) -> PaletteIndex {
        let mut best = PaletteIndex::White;
        let mut best_distance = metric.distance(color, self.rgb(best));
        for index in &PaletteIndex::ALL[1..] {
            let distance = metric.distance(color, self.rgb(*index));
            if distance < best_distance {
                best = *index;
                best_distance = distance;
            }
        }
        best
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::WHITE_BLACK_RED
    }
}
