//! Illumination uniformity as the coefficient of variation of luminance.
//!
//! `U = σ_L / μ_L`. Evenly lit paint scores near zero; hot spots and
//! vignetting push it up.

use image::GrayImage;

use super::luminance::Moments;

/// `std / mean` of the luminance.
///
/// A black frame has no defined ratio: it scores `0.0` when it is perfectly
/// flat and `+∞` otherwise. With 8-bit samples a zero mean implies a zero
/// spread, so the infinite branch only matters for [`coefficient_of_variation`]
/// callers with signed data.
pub fn illumination_uniformity(luma: &GrayImage) -> f64 {
    let m = Moments::of(luma.as_raw());
    coefficient_of_variation(m.mean, m.std_dev())
}

/// `std / mean` with the zero-mean edge cases resolved.
pub fn coefficient_of_variation(mean: f64, std: f64) -> f64 {
    if mean == 0.0 {
        if std > 0.0 { f64::INFINITY } else { 0.0 }
    } else {
        std / mean
    }
}
