//! Conversion between screen pixels and the native metric unit.
//!
//! The legacy window-metrics configuration stores sizes as negative twips:
//! one pixel at standard DPI is `-15` units.

/// Number of native units per pixel (negative by convention).
pub const TWIPS_PER_PIXEL: i32 = -15;

/// Convert a pixel size to native (negative twip) units.
///
/// Sizes beyond the representable range saturate at the `i32` bounds.
pub const fn pixels_to_twips(pixels: i32) -> i32 {
    pixels.saturating_mul(TWIPS_PER_PIXEL)
}

/// Convert a native (negative twip) value back to pixels.
pub const fn twips_to_pixels(twips: i32) -> i32 {
    twips / TWIPS_PER_PIXEL
}
