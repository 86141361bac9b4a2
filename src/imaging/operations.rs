//! The enhancement operator catalog.
//!
//! Maps every [`EnhancementOpType`] plus a resolved strength onto backend
//! primitives. Strength clamping and parameter derivation live in
//! [`params`](super::params); the pixel work lives in the backend.

use image::RgbImage;

use super::backend::{BackendError, ImageBackend};
use super::params::{Bilateral, Clahe, CrossKernel, Gamma, NonLocalMeans, UnsharpMask};
use crate::planner::EnhancementOpType;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Apply one operator to `image` and return the new image.
///
/// `strength` is passed through as resolved by the executor, so the gamma
/// operators arrive already signed. [`EnhancementOpType::MarkAsLowQuality`]
/// is a flag and returns the image unchanged without touching the backend.
pub fn apply_operation(
    backend: &impl ImageBackend,
    op_type: EnhancementOpType,
    strength: f32,
    image: &RgbImage,
) -> Result<RgbImage> {
    match op_type {
        EnhancementOpType::DenoiseLight => {
            backend.bilateral(image, &Bilateral::from_strength(strength))
        }
        EnhancementOpType::DenoiseStrong => {
            backend.non_local_means(image, &NonLocalMeans::from_strength(strength))
        }
        EnhancementOpType::SharpenLight => {
            backend.unsharp_mask(image, &UnsharpMask::light(strength))
        }
        EnhancementOpType::SharpenMedium => {
            backend.unsharp_mask(image, &UnsharpMask::medium(strength))
        }
        EnhancementOpType::Deblur => backend.convolve(image, &CrossKernel::deblur(strength)),
        EnhancementOpType::DeblurAggressive => {
            backend.convolve(image, &CrossKernel::aggressive(strength))
        }
        EnhancementOpType::GammaIncrease | EnhancementOpType::GammaDecrease => {
            backend.gamma(image, &Gamma::from_strength(strength))
        }
        EnhancementOpType::Clahe => backend.clahe(image, &Clahe::from_strength(strength)),
        EnhancementOpType::MarkAsLowQuality => Ok(image.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use image::Rgb;

    fn sample() -> RgbImage {
        RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]))
    }

    #[test]
    fn denoise_light_uses_bilateral() {
        let backend = MockBackend::new();
        apply_operation(&backend, EnhancementOpType::DenoiseLight, 0.4, &sample()).unwrap();
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Bilateral {
                sigma: 10.0,
                window: 31,
                input: 100
            }]
        );
    }

    #[test]
    fn denoise_strong_uses_nlm() {
        let backend = MockBackend::new();
        apply_operation(&backend, EnhancementOpType::DenoiseStrong, 0.8, &sample()).unwrap();
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::NonLocalMeans { h: 8.0, input: 100 }]
        );
    }

    #[test]
    fn sharpen_variants_pick_sigma() {
        let backend = MockBackend::new();
        apply_operation(&backend, EnhancementOpType::SharpenLight, 0.5, &sample()).unwrap();
        apply_operation(&backend, EnhancementOpType::SharpenMedium, 1.2, &sample()).unwrap();
        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::UnsharpMask {
                    sigma: 1.0,
                    amount: 0.5,
                    input: 100
                },
                RecordedOp::UnsharpMask {
                    sigma: 1.5,
                    amount: 1.2,
                    input: 100
                },
            ]
        );
    }

    #[test]
    fn deblur_variants_pick_centre() {
        let backend = MockBackend::new();
        apply_operation(&backend, EnhancementOpType::Deblur, 1.0, &sample()).unwrap();
        apply_operation(&backend, EnhancementOpType::DeblurAggressive, 1.0, &sample()).unwrap();
        let centres: Vec<f32> = backend
            .get_operations()
            .into_iter()
            .map(|op| match op {
                RecordedOp::Convolve { centre, .. } => centre,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(centres, vec![6.0, 7.0]);
    }

    #[test]
    fn gamma_follows_signed_strength() {
        let backend = MockBackend::new();
        apply_operation(&backend, EnhancementOpType::GammaIncrease, 0.2, &sample()).unwrap();
        apply_operation(&backend, EnhancementOpType::GammaDecrease, -0.2, &sample()).unwrap();
        let gammas: Vec<f32> = backend
            .get_operations()
            .into_iter()
            .map(|op| match op {
                RecordedOp::Gamma { gamma, .. } => gamma,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(gammas, vec![0.9, 1.2]);
    }

    #[test]
    fn clahe_scales_clip_limit() {
        let backend = MockBackend::new();
        apply_operation(&backend, EnhancementOpType::Clahe, 1.0, &sample()).unwrap();
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Clahe {
                clip_limit: 2.0,
                input: 100
            }]
        );
    }

    #[test]
    fn low_quality_flag_is_identity() {
        let backend = MockBackend::new();
        let img = sample();
        let out =
            apply_operation(&backend, EnhancementOpType::MarkAsLowQuality, 1.0, &img).unwrap();
        assert_eq!(out, img);
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn every_pixel_operator_reaches_the_backend() {
        let backend = MockBackend::new();
        let pixel_ops: Vec<_> = EnhancementOpType::ALL
            .iter()
            .copied()
            .filter(|op| *op != EnhancementOpType::MarkAsLowQuality)
            .collect();
        for op in &pixel_ops {
            apply_operation(&backend, *op, 0.5, &sample()).unwrap();
        }
        assert_eq!(backend.get_operations().len(), pixel_ops.len());
    }

    #[test]
    fn backend_errors_propagate() {
        let backend = MockBackend::failing("convolve");
        let err = apply_operation(&backend, EnhancementOpType::Deblur, 1.0, &sample()).unwrap_err();
        assert!(err.to_string().contains("convolve"));
    }
}
