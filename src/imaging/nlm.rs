//! Non-local means denoising for RGB images.
//!
//! Every pixel becomes a weighted mean of the pixels in its search window,
//! weighted by how similar their surrounding patches are:
//!
//! ```text
//! d(p, q) = mean over patch and channels of (I(p + t) − I(q + t))²
//! w(p, q) = exp(−d(p, q) / h²)
//! ```
//!
//! Patch distances are computed one search offset at a time with a summed
//! area table of squared differences, so the cost is `O(search² · pixels)`
//! regardless of patch size. The output is split into bands of rows that run
//! on the rayon pool; each band walks every offset with its own table and
//! weight sums, so scratch memory per worker is bounded by the band, not the
//! image. Borders replicate edge pixels.

use image::{Rgb, RgbImage};
use rayon::prelude::*;
use tracing::debug;

use super::params::NonLocalMeans;

/// Output rows per parallel task.
const BAND_ROWS: usize = 16;

/// Radii and weight scale shared by every band.
#[derive(Debug, Clone, Copy)]
struct Window {
    search_radius: i64,
    template_radius: i64,
    inv_h2: f32,
}

impl Window {
    fn new(params: &NonLocalMeans) -> Self {
        Self {
            search_radius: (params.search / 2) as i64,
            template_radius: (params.template / 2) as i64,
            inv_h2: 1.0 / (params.h * params.h),
        }
    }
}

/// Bytes of scratch one band of `rows` output rows needs on a `width`-wide
/// image: its summed area table plus `[Σw·r, Σw·g, Σw·b, Σw]` per pixel.
fn band_scratch_bytes(width: usize, rows: usize, template_radius: usize) -> usize {
    let table_rows = rows + 2 * template_radius + 1;
    (width + 1) * table_rows * size_of::<u64>() + width * rows * size_of::<[f32; 4]>()
}

pub fn non_local_means(rgb: &RgbImage, params: &NonLocalMeans) -> RgbImage {
    denoise_in_bands(rgb, params, BAND_ROWS)
}

fn denoise_in_bands(rgb: &RgbImage, params: &NonLocalMeans, band_rows: usize) -> RgbImage {
    let (w, h) = rgb.dimensions();
    if w == 0 || h == 0 {
        return rgb.clone();
    }
    let window = Window::new(params);
    let band_rows = band_rows.max(1);
    let row_len = w as usize * 3;
    debug!(
        width = w,
        height = h,
        bands = (h as usize).div_ceil(band_rows),
        scratch_bytes = band_scratch_bytes(w as usize, band_rows, window.template_radius as usize),
        "non-local means"
    );

    let mut out = RgbImage::new(w, h);
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(row_len * band_rows)
        .enumerate()
        .for_each(|(i, band)| {
            denoise_band(rgb, &window, i * band_rows, band.len() / row_len, band);
        });
    out
}

fn clamped(rgb: &RgbImage, x: i64, y: i64) -> Rgb<u8> {
    let (w, h) = (rgb.width() as i64, rgb.height() as i64);
    *rgb.get_pixel(x.clamp(0, w - 1) as u32, y.clamp(0, h - 1) as u32)
}

/// Denoise output rows `first_row..first_row + rows` into `out` (packed RGB).
fn denoise_band(rgb: &RgbImage, window: &Window, first_row: usize, rows: usize, out: &mut [u8]) {
    let (wi, hi) = (rgb.width() as i64, rgb.height() as i64);
    let (sr, tr) = (window.search_radius, window.template_radius);
    let band_top = first_row as i64;
    let band_bottom = band_top + rows as i64 - 1;
    // Patches of the band reach `tr` rows above and below it.
    let top = (band_top - tr).max(0);
    let bottom = (band_bottom + tr).min(hi - 1);

    let mut table = SummedArea::new(wi as usize, (bottom - top + 1) as usize);
    let mut sums = vec![[0.0f32; 4]; rows * wi as usize];

    for dy in -sr..=sr {
        for dx in -sr..=sr {
            table.fill(rgb, top, dx, dy);
            for y in band_top..=band_bottom {
                let y0 = (y - tr).max(0);
                let y1 = (y + tr).min(hi - 1);
                let row = (y - band_top) as usize * wi as usize;
                for x in 0..wi {
                    let x0 = (x - tr).max(0);
                    let x1 = (x + tr).min(wi - 1);
                    let area = ((x1 - x0 + 1) * (y1 - y0 + 1) * 3) as f64;
                    let dist = table.window_sum(x0, y0 - top, x1, y1 - top) as f64 / area;
                    let weight = (-(dist as f32) * window.inv_h2).exp();
                    let q = clamped(rgb, x + dx, y + dy);
                    let slot = &mut sums[row + x as usize];
                    slot[0] += weight * q[0] as f32;
                    slot[1] += weight * q[1] as f32;
                    slot[2] += weight * q[2] as f32;
                    slot[3] += weight;
                }
            }
        }
    }

    for (s, px) in sums.iter().zip(out.chunks_exact_mut(3)) {
        // The zero offset always contributes weight 1, so s[3] >= 1.
        for c in 0..3 {
            px[c] = (s[c] / s[3]).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Summed area table over `Σc (I(x, y) − I(x + dx, y + dy))²` for a run of
/// image rows. Integer sums keep window sums exact whatever the run's origin.
struct SummedArea {
    width: usize,
    rows: usize,
    sums: Vec<u64>,
}

impl SummedArea {
    fn new(width: usize, rows: usize) -> Self {
        Self {
            width,
            rows,
            sums: vec![0; (width + 1) * (rows + 1)],
        }
    }

    /// Refill for image rows `top..top + rows` at offset `(dx, dy)`.
    fn fill(&mut self, rgb: &RgbImage, top: i64, dx: i64, dy: i64) {
        let stride = self.width + 1;
        for r in 0..self.rows {
            let y = top + r as i64;
            let mut row = 0u64;
            for x in 0..self.width {
                let p = rgb.get_pixel(x as u32, y as u32);
                let q = clamped(rgb, x as i64 + dx, y + dy);
                let d: u64 = (0..3)
                    .map(|c| {
                        let diff = p[c] as i64 - q[c] as i64;
                        (diff * diff) as u64
                    })
                    .sum();
                row += d;
                self.sums[(r + 1) * stride + x + 1] = self.sums[r * stride + x + 1] + row;
            }
        }
    }

    /// Inclusive window sum; rows are relative to the table's first row.
    fn window_sum(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> u64 {
        let stride = self.width + 1;
        let at = |x: i64, y: i64| self.sums[y as usize * stride + x as usize];
        at(x1 + 1, y1 + 1) + at(x0, y0) - at(x0, y1 + 1) - at(x1 + 1, y0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(strength: f32) -> NonLocalMeans {
        NonLocalMeans::from_strength(strength)
    }

    fn variance(img: &RgbImage) -> f64 {
        let values: Vec<f64> = img.pixels().map(|p| p[0] as f64).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
    }

    #[test]
    fn flat_image_is_unchanged() {
        let img = RgbImage::from_pixel(12, 9, Rgb([40, 120, 200]));
        assert_eq!(non_local_means(&img, &params(1.0)), img);
    }

    #[test]
    fn empty_image_passes_through() {
        let img = RgbImage::new(0, 0);
        assert_eq!(non_local_means(&img, &params(1.0)).dimensions(), (0, 0));
    }

    #[test]
    fn reduces_fine_grained_noise() {
        // Deterministic ±4 speckle around mid-grey.
        let img = RgbImage::from_fn(24, 24, |x, y| {
            let v = if (x * 7 + y * 13) % 5 < 2 { 124 } else { 132 };
            Rgb([v, v, v])
        });
        let out = non_local_means(&img, &params(1.0));
        assert!(variance(&out) < variance(&img));
    }

    fn speckle(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let v = ((x * 37 + y * 91 + x * y) % 23) as u8 * 5 + 60;
            Rgb([v, v.wrapping_add(30), 255 - v])
        })
    }

    #[test]
    fn band_height_does_not_change_the_result() {
        let img = speckle(29, 37);
        let p = params(0.6);
        let reference = denoise_in_bands(&img, &p, 37);
        for rows in [1, 3, 7, 16, 100] {
            assert_eq!(denoise_in_bands(&img, &p, rows), reference, "band of {rows} rows");
        }
    }

    #[test]
    fn thread_count_does_not_change_the_result() {
        let img = speckle(40, 33);
        let p = params(0.8);
        let run = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| non_local_means(&img, &p))
        };
        assert_eq!(run(1), run(4));
    }

    #[test]
    fn band_scratch_is_independent_of_image_height() {
        // 12 MP frame: each worker holds one band, a small slice of the image.
        let (w, h) = (4000usize, 3000usize);
        let scratch = band_scratch_bytes(w, BAND_ROWS, (NonLocalMeans::TEMPLATE / 2) as usize);
        assert!(scratch * 16 < w * h * 3, "scratch {scratch} bytes");
        let whole_image_sums = w * h * size_of::<[f32; 4]>();
        assert!(scratch * 64 < whole_image_sums);
    }

    #[test]
    fn multi_megapixel_frame_is_processed_in_bands() {
        // Small windows keep the run short; the band split is what is exercised.
        let p = NonLocalMeans {
            h: 10.0,
            template: 3,
            search: 3,
        };
        let (w, h) = (2000, 1500);
        let img = RgbImage::from_fn(w, h, |x, y| {
            let v = if (x / 50 + y / 50) % 2 == 0 { 40 } else { 210 };
            Rgb([v, v, v])
        });
        let out = non_local_means(&img, &p);
        assert_eq!(out.dimensions(), (w, h));
        // Flat cells far from any edge keep their value.
        assert_eq!(out.get_pixel(25, 25), &Rgb([40, 40, 40]));
        assert_eq!(out.get_pixel(1975, 1475), &Rgb([40, 40, 40]));
        assert_eq!(out.get_pixel(75, 1025), &Rgb([210, 210, 210]));
    }

    #[test]
    fn keeps_a_strong_edge() {
        let img = RgbImage::from_fn(24, 12, |x, _| {
            let v = if x < 12 { 20 } else { 230 };
            Rgb([v, v, v])
        });
        let out = non_local_means(&img, &params(1.0));
        assert!(out.get_pixel(2, 6)[0] < 40);
        assert!(out.get_pixel(21, 6)[0] > 210);
    }
}
