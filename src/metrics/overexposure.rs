//! Over-exposure as the fraction of clipped pixels.

use image::GrayImage;

/// Default clipping threshold on the 8-bit scale.
pub const DEFAULT_OVEREXPOSURE_THRESHOLD: u8 = 250;

/// Fraction of luminance samples at or above `threshold`. Empty images score 0.
pub fn overexposure_ratio(luma: &GrayImage, threshold: u8) -> f64 {
    let samples = luma.as_raw();
    if samples.is_empty() {
        return 0.0;
    }
    let clipped = samples.iter().filter(|&&v| v >= threshold).count();
    clipped as f64 / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn saturated_frame_is_fully_overexposed() {
        let white = GrayImage::from_pixel(10, 10, Luma([255]));
        assert_eq!(overexposure_ratio(&white, DEFAULT_OVEREXPOSURE_THRESHOLD), 1.0);
    }

    #[test]
    fn black_frame_has_no_overexposure() {
        let black = GrayImage::new(10, 10);
        assert_eq!(overexposure_ratio(&black, DEFAULT_OVEREXPOSURE_THRESHOLD), 0.0);
    }

    #[test]
    fn threshold_is_inclusive() {
        let img = GrayImage::from_fn(4, 1, |x, _| Luma([[249, 250, 251, 100][x as usize]]));
        assert_eq!(overexposure_ratio(&img, 250), 0.5);
        assert_eq!(overexposure_ratio(&img, 100), 1.0);
    }

    #[test]
    fn empty_image_scores_zero() {
        assert_eq!(overexposure_ratio(&GrayImage::new(0, 0), 250), 0.0);
    }
}
