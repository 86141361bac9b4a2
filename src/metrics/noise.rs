//! Noise level as global luminance variance.
//!
//! This is a deliberately coarse proxy: structure and noise are not separated,
//! so a high-contrast but clean frame also scores high.

use image::GrayImage;

use super::luminance::Moments;

/// Population variance of the luminance values.
pub fn noise_variance(luma: &GrayImage) -> f64 {
    Moments::of(luma.as_raw()).variance
}
