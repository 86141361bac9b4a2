//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the pixel primitives every backend must
//! support: bilateral smoothing, non-local means, unsharp masking, 3×3 cross
//! convolution, gamma and CLAHE. Every primitive takes an RGB8 image and
//! returns a new one; the input is never mutated.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on `imageproc`
//! plus the in-crate kernels for what `imageproc` lacks.

use image::RgbImage;
use thiserror::Error;

use super::params::{Bilateral, Clahe, CrossKernel, Gamma, NonLocalMeans, UnsharpMask};
use crate::types::ErrorKind;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::ProcessingFailed(_) => ErrorKind::Validation,
        }
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all primitives so the operator catalog is
/// backend-agnostic. `Sync` so one backend can serve a rayon batch.
pub trait ImageBackend: Sync {
    /// Edge-preserving smoothing, applied per channel.
    fn bilateral(&self, image: &RgbImage, params: &Bilateral) -> Result<RgbImage, BackendError>;

    /// Patch-similarity denoising.
    fn non_local_means(
        &self,
        image: &RgbImage,
        params: &NonLocalMeans,
    ) -> Result<RgbImage, BackendError>;

    /// `img·(1 + amount) − gaussian(img, σ)·amount`.
    fn unsharp_mask(&self, image: &RgbImage, params: &UnsharpMask)
    -> Result<RgbImage, BackendError>;

    /// 3×3 correlation with a cross-shaped sharpening kernel.
    fn convolve(&self, image: &RgbImage, kernel: &CrossKernel) -> Result<RgbImage, BackendError>;

    /// Per-channel gamma lookup table.
    fn gamma(&self, image: &RgbImage, params: &Gamma) -> Result<RgbImage, BackendError>;

    /// Local contrast equalisation of lightness, chroma untouched.
    fn clahe(&self, image: &RgbImage, params: &Clahe) -> Result<RgbImage, BackendError>;
}
