//! Sharpness as the variance of the Laplacian response.
//!
//! `Sharpness = Var(∇²L)` over the luminance `L`. Edges and fine texture
//! produce large second derivatives; defocus and motion blur flatten them, so
//! a low score means a blurred frame.

use image::GrayImage;
use imageproc::filter::laplacian_filter;

use super::luminance::Moments;
use crate::imaging::reflect_101;

/// Variance of the 4-neighbour Laplacian of `luma`. Higher is sharper.
///
/// Borders mirror without repeating the edge pixel (`dcb|abcd|cba`).
pub fn sharpness(luma: &GrayImage) -> f64 {
    let (w, h) = luma.dimensions();
    if w == 0 || h == 0 {
        return 0.0;
    }
    let padded = GrayImage::from_fn(w + 2, h + 2, |x, y| {
        let sx = reflect_101(x as i64 - 1, w as i64);
        let sy = reflect_101(y as i64 - 1, h as i64);
        *luma.get_pixel(sx as u32, sy as u32)
    });
    let response = laplacian_filter(&padded);
    let response = &response;
    let interior: Vec<i16> = (1..=h)
        .flat_map(|y| (1..=w).map(move |x| response.get_pixel(x, y)[0]))
        .collect();
    Moments::of(&interior).variance
}
