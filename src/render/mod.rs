//! # Rendering Module
//!
//! Turns pixels into printable 1-bit raster data.
//!
//! ## Modules
//!
//! - [`dither`]: Pixel sources, threshold / Floyd-Steinberg / Bayer conversion
//!   and bit packing
//!
//! ## Usage Example
//!
//! ```
//! use recibo::render::dither::{GrayPixels, RasterMode, Rasterizer};
//!
//! // A horizontal gradient from white to black
//! let gradient = GrayPixels::from_fn(384, 100, |x, _y| 255 - (x * 255 / 383) as u8);
//!
//! let bitmap = Rasterizer::new(384)
//!     .rasterize(&gradient, RasterMode::FloydSteinberg)
//!     .unwrap();
//!
//! assert_eq!(bitmap.data().len(), 48 * 100);
//! ```

pub mod dither;
