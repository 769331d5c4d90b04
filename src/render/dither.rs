//! # Rasterization and Dithering
//!
//! Converts continuous-tone pixel sources into the 1-bit-per-dot bitmaps
//! that `GS v 0` prints.
//!
//! ## What is Dithering?
//!
//! Dithering simulates grayscale on a device that can only print black or white.
//! By varying the density of black dots, we create the illusion of different
//! gray levels.
//!
//! ```text
//! Grayscale:    White    Light    Medium    Dark    Black
//!               ░░░░░░   ░░▒░░░   ░▒░▒░▒   ▒▓▒▓▒▓   ██████
//! ```
//!
//! ## Modes
//!
//! | Mode | Speed | Quality | Artifacts |
//! |------|-------|---------|-----------|
//! | Threshold | Fastest | Poor | Banding |
//! | Bayer | Fast | Good | Regular pattern |
//! | Floyd-Steinberg | Slow | Better | Noise, worms |
//!
//! Threshold is the right choice for material that is already black and
//! white (logos, barcodes, QR matrices). Photos want one of the dithers.
//!
//! ## Usage Example
//!
//! ```
//! use recibo::render::dither::{GrayPixels, RasterMode, Rasterizer};
//!
//! // 2×2 image: black, white / black, white
//! let pixels = GrayPixels::new(2, 2, vec![0, 255, 0, 255]).unwrap();
//! let bitmap = Rasterizer::new(384)
//!     .rasterize(&pixels, RasterMode::Threshold(128))
//!     .unwrap();
//! assert_eq!(bitmap.data(), &[0x80, 0x80]);
//! ```

use image::{DynamicImage, GenericImageView, GrayImage, RgbImage, RgbaImage};
use rayon::prelude::*;

use crate::error::EncodingError;

// ============================================================================
// PIXEL SOURCES
// ============================================================================

/// Anything that can report a luminance per pixel.
///
/// Luminance is 0 (black) to 255 (white).
pub trait PixelSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn luminance(&self, x: u32, y: u32) -> u8;
}

/// Weighted RGB to gray conversion (ITU-R BT.601).
///
/// ```
/// use recibo::render::dither::luminance;
///
/// assert_eq!(luminance(255, 255, 255), 255);
/// assert_eq!(luminance(0, 0, 0), 0);
/// assert_eq!(luminance(255, 0, 0), 76);
/// ```
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
}

/// Composite a pixel over white paper.
#[inline]
fn over_white(luma: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((luma as u32 * a + 255 * (255 - a) + 127) / 255) as u8
}

/// An owned 8-bit luminance buffer, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayPixels {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayPixels {
    /// Wrap a luminance buffer. `data.len()` must equal `width × height`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, EncodingError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(EncodingError::InvalidRaster {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a buffer from a function of `(x, y)`.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Self {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Capture the luminance of another source.
    pub fn from_source<S: PixelSource + ?Sized>(source: &S) -> Self {
        Self::from_fn(source.width(), source.height(), |x, y| source.luminance(x, y))
    }
}

impl PixelSource for GrayPixels {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn luminance(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }
}

impl PixelSource for GrayImage {
    fn width(&self) -> u32 {
        GenericImageView::width(self)
    }

    fn height(&self) -> u32 {
        GenericImageView::height(self)
    }

    fn luminance(&self, x: u32, y: u32) -> u8 {
        self.get_pixel(x, y).0[0]
    }
}

impl PixelSource for RgbImage {
    fn width(&self) -> u32 {
        GenericImageView::width(self)
    }

    fn height(&self) -> u32 {
        GenericImageView::height(self)
    }

    fn luminance(&self, x: u32, y: u32) -> u8 {
        let [r, g, b] = self.get_pixel(x, y).0;
        luminance(r, g, b)
    }
}

impl PixelSource for RgbaImage {
    fn width(&self) -> u32 {
        GenericImageView::width(self)
    }

    fn height(&self) -> u32 {
        GenericImageView::height(self)
    }

    fn luminance(&self, x: u32, y: u32) -> u8 {
        let [r, g, b, a] = self.get_pixel(x, y).0;
        over_white(luminance(r, g, b), a)
    }
}

impl PixelSource for DynamicImage {
    fn width(&self) -> u32 {
        GenericImageView::width(self)
    }

    fn height(&self) -> u32 {
        GenericImageView::height(self)
    }

    fn luminance(&self, x: u32, y: u32) -> u8 {
        let [r, g, b, a] = GenericImageView::get_pixel(self, x, y).0;
        over_white(luminance(r, g, b), a)
    }
}

// ============================================================================
// MONO BITMAP
// ============================================================================

/// A 1-bit image: row-major, MSB = leftmost dot, 1 = ink.
///
/// Rows are `ceil(width / 8)` bytes; padding bits are always 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoBitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl MonoBitmap {
    /// Wrap already-packed raster data, checking its length.
    ///
    /// Set bits past `width` in a row's last byte would print as dots, so
    /// they are rejected.
    pub fn from_packed(width: u32, height: u32, data: Vec<u8>) -> Result<Self, EncodingError> {
        let width_bytes = width.div_ceil(8) as usize;
        let expected = width_bytes * height as usize;
        if data.len() != expected {
            return Err(EncodingError::InvalidRaster {
                expected,
                actual: data.len(),
            });
        }

        let padding = (width_bytes * 8) as u32 - width;
        if padding > 0 {
            let mask = (1u8 << padding) - 1;
            if let Some(row) = data
                .chunks(width_bytes)
                .position(|row| row[width_bytes - 1] & mask != 0)
            {
                return Err(EncodingError::InvalidParameter {
                    command: "raster",
                    detail: format!("row {} has ink in its padding bits", row),
                });
            }
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row
    pub fn width_bytes(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Packed bytes of rows `start..end`.
    pub fn rows(&self, start: u32, end: u32) -> &[u8] {
        let wb = self.width_bytes();
        &self.data[start as usize * wb..end as usize * wb]
    }

    /// Whether the dot at `(x, y)` is inked.
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        let byte = self.data[y as usize * self.width_bytes() + x as usize / 8];
        byte & (0x80 >> (x % 8)) != 0
    }
}

// ============================================================================
// RASTERIZER
// ============================================================================

/// How continuous tone is reduced to ink / no ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterMode {
    /// Ink where luminance is below the level.
    Threshold(u8),
    /// Error diffusion with the classic 7/16, 3/16, 5/16, 1/16 weights.
    FloydSteinberg,
    /// 8×8 ordered dither.
    Bayer,
}

impl Default for RasterMode {
    fn default() -> Self {
        RasterMode::Threshold(128)
    }
}

/// Turns pixel sources into [`MonoBitmap`]s no wider than the print head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rasterizer {
    pub max_dots_per_line: u32,
}

impl Rasterizer {
    pub fn new(max_dots_per_line: u32) -> Self {
        Self { max_dots_per_line }
    }

    /// Rasterize `source` with `mode`.
    ///
    /// Images wider than the print head are rejected, not scaled.
    pub fn rasterize<S>(&self, source: &S, mode: RasterMode) -> Result<MonoBitmap, EncodingError>
    where
        S: PixelSource + Sync + ?Sized,
    {
        let (width, height) = (source.width(), source.height());
        if width > self.max_dots_per_line {
            return Err(EncodingError::ImageTooWide {
                width,
                max: self.max_dots_per_line,
            });
        }

        let data = match mode {
            RasterMode::Threshold(level) => pack_rows(width, height, |x, y| {
                source.luminance(x, y) < level
            }),
            RasterMode::Bayer => pack_rows(width, height, |x, y| {
                let intensity = 1.0 - source.luminance(x, y) as f32 / 255.0;
                should_print(x as usize, y as usize, intensity)
            }),
            RasterMode::FloydSteinberg => floyd_steinberg(source),
        };

        MonoBitmap::from_packed(width, height, data)
    }
}

/// Pack rows in parallel from a per-pixel ink decision.
fn pack_rows<F>(width: u32, height: u32, ink: F) -> Vec<u8>
where
    F: Fn(u32, u32) -> bool + Sync,
{
    (0..height)
        .into_par_iter()
        .map(|y| {
            let row: Vec<bool> = (0..width).map(|x| ink(x, y)).collect();
            pack_row(&row)
        })
        .collect::<Vec<_>>()
        .concat()
}

/// Row-major error diffusion. Error that would land outside the image is
/// dropped.
fn floyd_steinberg<S: PixelSource + ?Sized>(source: &S) -> Vec<u8> {
    let (width, height) = (source.width() as usize, source.height() as usize);
    let mut data = Vec::with_capacity(width.div_ceil(8) * height);

    let mut current: Vec<i32> = vec![0; width];
    let mut next: Vec<i32> = vec![0; width];
    let mut row = vec![false; width];

    for y in 0..height {
        for (x, carried) in current.iter_mut().enumerate() {
            *carried += source.luminance(x as u32, y as u32) as i32;
        }

        for x in 0..width {
            let value = current[x];
            let ink = value < 128;
            row[x] = ink;
            let err = value - if ink { 0 } else { 255 };

            if x + 1 < width {
                current[x + 1] += err * 7 / 16;
                next[x + 1] += err / 16;
            }
            if x > 0 {
                next[x - 1] += err * 3 / 16;
            }
            next[x] += err * 5 / 16;
        }

        data.extend(pack_row(&row));
        std::mem::swap(&mut current, &mut next);
        next.iter_mut().for_each(|e| *e = 0);
    }

    data
}

// ============================================================================
// BAYER MATRIX
// ============================================================================

/// Bayer 8x8 dithering matrix
///
/// ```text
///     0   1   2   3   4   5   6   7   (x mod 8)
///   ┌───┬───┬───┬───┬───┬───┬───┬───┐
/// 0 │ 0 │32 │ 8 │40 │ 2 │34 │10 │42 │
/// 1 │48 │16 │56 │24 │50 │18 │58 │26 │
/// 2 │12 │44 │ 4 │36 │14 │46 │ 6 │38 │
/// 3 │60 │28 │52 │20 │62 │30 │54 │22 │
/// 4 │ 3 │35 │11 │43 │ 1 │33 │ 9 │41 │
/// 5 │51 │19 │59 │27 │49 │17 │57 │25 │
/// 6 │15 │47 │ 7 │39 │13 │45 │ 5 │37 │
/// 7 │63 │31 │55 │23 │61 │29 │53 │21 │
///   └───┴───┴───┴───┴───┴───┴───┴───┘
/// ```
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Get the dithering threshold for a pixel position.
///
/// Returns a value in the range (0, 1), never exactly 0 or 1, so black
/// always prints and white never does.
#[inline]
pub fn threshold(x: usize, y: usize) -> f32 {
    let matrix_value = BAYER8[y & 7][x & 7];
    (matrix_value as f32 + 0.5) / 64.0
}

/// Determine if a dot should be printed at the given position.
///
/// `intensity` is 0.0 for white and 1.0 for black.
#[inline]
pub fn should_print(x: usize, y: usize, intensity: f32) -> bool {
    intensity > threshold(x, y)
}

/// Pack a row of boolean pixel values into bytes.
///
/// - Bit 7 (MSB) = leftmost pixel
/// - 1 = black (print dot), 0 = white (no dot)
/// - The last byte is padded with zeros on the right
///
/// ```
/// use recibo::render::dither::pack_row;
///
/// let row = vec![true, true, true, true, false, false, false, false];
/// assert_eq!(pack_row(&row), vec![0xF0]);
///
/// let row = vec![true; 12];
/// assert_eq!(pack_row(&row), vec![0xFF, 0xF0]);
/// ```
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let num_bytes = pixels.len().div_ceil(8);
    let mut bytes = vec![0u8; num_bytes];

    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            let byte_idx = i / 8;
            let bit_idx = 7 - (i % 8); // MSB first
            bytes[byte_idx] |= 1 << bit_idx;
        }
    }

    bytes
}

// ============================================================================
// TESTS
// ============================================================================
