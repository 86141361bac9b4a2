//! Luminance reduction and the summary statistics every extractor shares.
//!
//! All statistics are population statistics (divide by `N`), computed in
//! `f64`. An empty sample has mean and variance zero.

use image::{DynamicImage, GrayImage, Luma, Rgb};
use imageproc::map::map_colors;

/// BT.601 luma weights in 14-bit fixed point: 0.299, 0.587, 0.114.
const LUMA_WEIGHTS: [u32; 3] = [4899, 9617, 1868];
const LUMA_SHIFT: u32 = 14;

/// Reduce an image to 8-bit luminance.
///
/// Multi-channel images are weighted with BT.601 coefficients and rounded,
/// so calibrated rule tables see the same gray levels as the capture
/// software. Single-channel images pass through unchanged.
pub fn luminance(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageRgb8(rgb) => map_colors(rgb, luma),
        other => map_colors(&other.to_rgb8(), luma),
    }
}

fn luma(p: Rgb<u8>) -> Luma<u8> {
    let weighted: u32 = (0..3).map(|c| p[c] as u32 * LUMA_WEIGHTS[c]).sum();
    Luma([((weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8])
}

/// Mean and population variance of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
}

impl Moments {
    /// Two-pass mean/variance; the slice is walked twice to keep precision on
    /// large, bright frames.
    pub fn of<T: Copy + Into<f64>>(values: &[T]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                mean: 0.0,
                variance: 0.0,
            };
        }
        let n = count as f64;
        let mean = values.iter().map(|&v| v.into()).sum::<f64>() / n;
        let variance = values
            .iter()
            .map(|&v| {
                let d = v.into() - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        Self {
            count,
            mean,
            variance,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn moments_of_empty_sample_are_zero() {
        let m = Moments::of::<u8>(&[]);
        assert_eq!(m.count, 0);
        assert_eq!(m.mean, 0.0);
        assert_eq!(m.variance, 0.0);
    }

    #[test]
    fn moments_use_population_variance() {
        let m = Moments::of(&[2u8, 4, 4, 4, 5, 5, 7, 9]);
        assert_eq!(m.mean, 5.0);
        assert_eq!(m.variance, 4.0);
        assert_eq!(m.std_dev(), 2.0);
    }

    #[test]
    fn luminance_passes_gray_through() {
        let gray = GrayImage::from_fn(3, 3, |x, y| Luma([(x * 10 + y) as u8]));
        let out = luminance(&DynamicImage::ImageLuma8(gray.clone()));
        assert_eq!(out, gray);
    }

    #[test]
    fn luminance_of_white_rgb_is_white() {
        let rgb = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        let out = luminance(&DynamicImage::ImageRgb8(rgb));
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn luminance_uses_bt601_weights() {
        let rgb = RgbImage::from_fn(4, 1, |x, _| match x {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            2 => Rgb([0, 0, 255]),
            _ => Rgb([77, 77, 77]),
        });
        let out = luminance(&DynamicImage::ImageRgb8(rgb));
        let values: Vec<u8> = out.pixels().map(|p| p[0]).collect();
        assert_eq!(values, vec![76, 150, 29, 77]);
    }

    #[test]
    fn luminance_of_rgba_ignores_alpha() {
        let rgba = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 10]));
        let out = luminance(&DynamicImage::ImageRgba8(rgba));
        assert!(out.pixels().all(|p| p[0] == 76));
    }
}
