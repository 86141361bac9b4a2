//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Primitive | Crate / function |
//! |---|---|
//! | Bilateral | `imageproc::filter::bilateral_filter`, once per channel |
//! | Non-local means | in-crate [`nlm`](super::nlm) (rayon over row bands) |
//! | Unsharp mask | `imageproc::filter::gaussian_blur_f32` + weighted blend |
//! | Cross convolution | `imageproc::filter::filter3x3` over a mirrored border, rounded to u8 |
//! | Gamma | `imageproc::map::map_subpixels` through a 256-entry table |
//! | CLAHE | in-crate [`lab`](super::lab) + [`clahe`](super::clahe) |

use image::{GrayImage, Rgb, RgbImage};
use imageproc::filter::{bilateral_filter, filter3x3, gaussian_blur_f32};
use imageproc::map::{blue_channel, green_channel, map_colors2, map_subpixels, red_channel};
use rayon::prelude::*;

use super::backend::{BackendError, ImageBackend};
use super::calculations::{gamma_lut, reflect_101};
use super::clahe::clahe;
use super::lab::{merge_lab, split_lab};
use super::nlm::non_local_means;
use super::params::{Bilateral, Clahe, CrossKernel, Gamma, NonLocalMeans, UnsharpMask};

/// Pure Rust backend using the `image` / `imageproc` ecosystem.
///
/// See the [module docs](self) for the crate-to-primitive mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

fn is_empty(image: &RgbImage) -> bool {
    image.width() == 0 || image.height() == 0
}

fn split_channels(image: &RgbImage) -> [GrayImage; 3] {
    [red_channel(image), green_channel(image), blue_channel(image)]
}

fn merge_channels(channels: &[GrayImage]) -> Result<RgbImage, BackendError> {
    let [r, g, b] = channels else {
        return Err(BackendError::ProcessingFailed(format!(
            "expected 3 channels, got {}",
            channels.len()
        )));
    };
    Ok(RgbImage::from_fn(r.width(), r.height(), |x, y| {
        Rgb([r.get_pixel(x, y)[0], g.get_pixel(x, y)[0], b.get_pixel(x, y)[0]])
    }))
}

impl ImageBackend for RustBackend {
    fn bilateral(&self, image: &RgbImage, params: &Bilateral) -> Result<RgbImage, BackendError> {
        // bilateral_filter panics on empty input.
        if is_empty(image) {
            return Ok(image.clone());
        }
        let filtered: Vec<GrayImage> = split_channels(image)
            .par_iter()
            .map(|channel| {
                bilateral_filter(channel, params.window, params.sigma_color, params.sigma_space)
            })
            .collect();
        merge_channels(&filtered)
    }

    fn non_local_means(
        &self,
        image: &RgbImage,
        params: &NonLocalMeans,
    ) -> Result<RgbImage, BackendError> {
        Ok(non_local_means(image, params))
    }

    fn unsharp_mask(
        &self,
        image: &RgbImage,
        params: &UnsharpMask,
    ) -> Result<RgbImage, BackendError> {
        if !(params.sigma > 0.0) {
            return Err(BackendError::ProcessingFailed(format!(
                "unsharp mask sigma must be positive, got {}",
                params.sigma
            )));
        }
        let blurred = gaussian_blur_f32(image, params.sigma);
        let amount = params.amount;
        Ok(map_colors2(image, &blurred, |p, q| {
            let channel = |c: usize| {
                let v = p[c] as f32 * (1.0 + amount) - q[c] as f32 * amount;
                v.round().clamp(0.0, 255.0) as u8
            };
            Rgb([channel(0), channel(1), channel(2)])
        }))
    }

    fn convolve(&self, image: &RgbImage, kernel: &CrossKernel) -> Result<RgbImage, BackendError> {
        if is_empty(image) {
            return Ok(image.clone());
        }
        let (w, h) = image.dimensions();
        // filter3x3 replicates edges; pad by one mirrored pixel instead.
        let padded = RgbImage::from_fn(w + 2, h + 2, |x, y| {
            let sx = reflect_101(x as i64 - 1, w as i64);
            let sy = reflect_101(y as i64 - 1, h as i64);
            *image.get_pixel(sx as u32, sy as u32)
        });
        let response = filter3x3::<_, f32, f32>(&padded, &kernel.weights());
        Ok(RgbImage::from_fn(w, h, |x, y| {
            let p = response.get_pixel(x + 1, y + 1);
            Rgb([0, 1, 2].map(|c| p[c].round().clamp(0.0, 255.0) as u8))
        }))
    }

    fn gamma(&self, image: &RgbImage, params: &Gamma) -> Result<RgbImage, BackendError> {
        let lut = gamma_lut(params.gamma);
        Ok(map_subpixels(image, |v: u8| lut[v as usize]))
    }

    fn clahe(&self, image: &RgbImage, params: &Clahe) -> Result<RgbImage, BackendError> {
        let mut planes = split_lab(image);
        planes.lightness = clahe(&planes.lightness, params.clip_limit, params.tiles);
        Ok(merge_lab(&planes))
    }
}
