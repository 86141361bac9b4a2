//! Distortion metrics: four independent scalar measurements per image.
//!
//! | Metric | Definition | Module |
//! |---|---|---|
//! | **Sharpness** | `Var(∇²L)` | [`sharpness`] |
//! | **Noise variance** | `Var(L)` | [`noise`] |
//! | **Illumination uniformity** | `σ_L / μ_L` | [`illumination`] |
//! | **Over-exposure ratio** | `#(L ≥ t) / N` | [`overexposure`] |
//!
//! `L` is 8-bit luminance (see [`luminance::luminance`]). The extractors have
//! no dependency on one another; [`analyze_image`] computes the luminance once
//! and feeds it to all four.

pub mod illumination;
pub mod luminance;
pub mod noise;
pub mod overexposure;
pub mod sharpness;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MetricsConfig;
use crate::image_handle::{HandleError, ImageHandle};

pub use illumination::illumination_uniformity;
pub use luminance::luminance;
pub use noise::noise_variance;
pub use overexposure::{DEFAULT_OVEREXPOSURE_THRESHOLD, overexposure_ratio};
pub use sharpness::sharpness;

/// Metric names, in [`DistortionMetrics::as_vector`] order.
pub const METRIC_NAMES: [&str; 4] = [
    "sharpness",
    "noise_variance",
    "illumination_uniformity",
    "overexposure_ratio",
];

/// All distortion metrics for one image snapshot.
///
/// Field order is the canonical vector order consumed by downstream numeric
/// pipelines; do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistortionMetrics {
    /// Variance of the Laplacian. Higher is sharper.
    pub sharpness: f64,
    /// Variance of luminance.
    pub noise_variance: f64,
    /// `std / mean` of luminance; may be `+∞` for a zero-mean frame.
    pub illumination_uniformity: f64,
    /// Fraction of clipped pixels, in `[0, 1]`.
    pub overexposure_ratio: f64,
}

impl DistortionMetrics {
    /// Metrics as a fixed-order vector; see [`METRIC_NAMES`].
    pub fn as_vector(&self) -> [f64; 4] {
        [
            self.sharpness,
            self.noise_variance,
            self.illumination_uniformity,
            self.overexposure_ratio,
        ]
    }

    /// `(name, value)` pairs in vector order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        METRIC_NAMES.into_iter().zip(self.as_vector())
    }
}

/// Names of the metrics in the same order as [`DistortionMetrics::as_vector`].
pub fn metric_names() -> &'static [&'static str] {
    &METRIC_NAMES
}

/// Compute all metrics for an already-decoded image.
pub fn analyze_image(image: &DynamicImage, config: &MetricsConfig) -> DistortionMetrics {
    let luma = luminance(image);
    let metrics = DistortionMetrics {
        sharpness: sharpness(&luma),
        noise_variance: noise_variance(&luma),
        illumination_uniformity: illumination_uniformity(&luma),
        overexposure_ratio: overexposure_ratio(&luma, config.overexposure_threshold),
    };
    debug!(
        width = luma.width(),
        height = luma.height(),
        sharpness = metrics.sharpness,
        noise_variance = metrics.noise_variance,
        illumination_uniformity = metrics.illumination_uniformity,
        overexposure_ratio = metrics.overexposure_ratio,
        "distortion metrics"
    );
    metrics
}

/// Compute all metrics for the image bound to `handle`, decoding it if needed.
///
/// Fails with [`HandleError::Unbound`] when nothing is bound.
pub fn analyze(
    handle: &mut ImageHandle,
    config: &MetricsConfig,
) -> Result<DistortionMetrics, HandleError> {
    let image = handle.load()?;
    Ok(analyze_image(image, config))
}
