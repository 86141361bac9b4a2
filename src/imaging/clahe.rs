//! Contrast-limited adaptive histogram equalisation on an 8-bit plane.
//!
//! The plane is split into a grid of tiles. Each tile gets its own clipped
//! histogram and equalisation table, and every pixel is mapped through a
//! bilinear blend of the four nearest tile tables so tile seams do not show.

use image::{GrayImage, Luma};

const BINS: usize = 256;

/// Equalise `plane` with the given clip limit and tile grid.
///
/// `clip_limit` is relative to a flat histogram: each bin is capped at
/// `clip_limit · tile_pixels / 256` (at least 1) and the excess is spread
/// evenly over all bins. The grid is reduced for planes smaller than it.
pub fn clahe(plane: &GrayImage, clip_limit: f32, tiles: (u32, u32)) -> GrayImage {
    let (w, h) = plane.dimensions();
    if w == 0 || h == 0 {
        return plane.clone();
    }
    let tiles_x = tiles.0.clamp(1, w) as usize;
    let tiles_y = tiles.1.clamp(1, h) as usize;
    let (w, h) = (w as usize, h as usize);
    let span = |i: usize, n: usize, len: usize| (i * len / n, (i + 1) * len / n);

    let mut luts = Vec::with_capacity(tiles_x * tiles_y);
    for ty in 0..tiles_y {
        let (y0, y1) = span(ty, tiles_y, h);
        for tx in 0..tiles_x {
            let (x0, x1) = span(tx, tiles_x, w);
            let mut hist = [0u32; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[plane.get_pixel(x as u32, y as u32)[0] as usize] += 1;
                }
            }
            luts.push(tile_lut(&mut hist, (x1 - x0) * (y1 - y0), clip_limit));
        }
    }

    // Tile centres are evenly spaced at (i + 0.5) · tile size.
    let tile_w = w as f32 / tiles_x as f32;
    let tile_h = h as f32 / tiles_y as f32;
    let neighbours = |pos: usize, size: f32, count: usize| {
        let f = ((pos as f32 + 0.5) / size - 0.5).clamp(0.0, (count - 1) as f32);
        let lo = f.floor() as usize;
        let hi = (lo + 1).min(count - 1);
        (lo, hi, f - lo as f32)
    };

    GrayImage::from_fn(w as u32, h as u32, |x, y| {
        let v = plane.get_pixel(x, y)[0] as usize;
        let (tx0, tx1, ax) = neighbours(x as usize, tile_w, tiles_x);
        let (ty0, ty1, ay) = neighbours(y as usize, tile_h, tiles_y);
        let at = |tx: usize, ty: usize| luts[ty * tiles_x + tx][v] as f32;
        let top = at(tx0, ty0) * (1.0 - ax) + at(tx1, ty0) * ax;
        let bottom = at(tx0, ty1) * (1.0 - ax) + at(tx1, ty1) * ax;
        let value = top * (1.0 - ay) + bottom * ay;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Clip `hist`, redistribute the excess and build the equalisation table.
fn tile_lut(hist: &mut [u32; BINS], pixels: usize, clip_limit: f32) -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    if pixels == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    if clip_limit > 0.0 {
        let clip = ((clip_limit * pixels as f32 / BINS as f32) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > clip {
                excess += *bin - clip;
                *bin = clip;
            }
        }
        let per_bin = excess / BINS as u32;
        let remainder = (excess % BINS as u32) as usize;
        for bin in hist.iter_mut() {
            *bin += per_bin;
        }
        if remainder > 0 {
            let step = (BINS / remainder).max(1);
            for bin in hist.iter_mut().step_by(step).take(remainder) {
                *bin += 1;
            }
        }
    }

    let scale = 255.0 / pixels as f32;
    let mut cdf = 0u32;
    for (bin, out) in hist.iter().zip(lut.iter_mut()) {
        cdf += bin;
        *out = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_dimensions() {
        let plane = GrayImage::from_pixel(80, 60, Luma([128]));
        assert_eq!(clahe(&plane, 2.0, (8, 8)).dimensions(), (80, 60));
    }

    #[test]
    fn uniform_plane_stays_uniform() {
        let plane = GrayImage::from_pixel(64, 64, Luma([128]));
        let out = clahe(&plane, 2.0, (8, 8));
        let first = out.get_pixel(0, 0)[0];
        assert!(out.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn empty_plane_passes_through() {
        let plane = GrayImage::new(0, 0);
        assert_eq!(clahe(&plane, 2.0, (8, 8)).dimensions(), (0, 0));
    }

    #[test]
    fn tiny_plane_reduces_grid() {
        let plane = GrayImage::from_fn(3, 2, |x, y| Luma([(x * 40 + y * 100) as u8]));
        assert_eq!(clahe(&plane, 2.0, (8, 8)).dimensions(), (3, 2));
    }

    #[test]
    fn stretches_low_contrast_content() {
        // Values confined to 100..=115 should spread over a wider range.
        let plane = GrayImage::from_fn(64, 64, |x, y| Luma([100 + ((x + y) % 16) as u8]));
        let out = clahe(&plane, 4.0, (8, 8));
        let (min, max) = out
            .pixels()
            .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
        assert!(max - min > 15, "range {min}..{max}");
    }

    #[test]
    fn lut_without_clipping_is_plain_equalisation() {
        let mut hist = [0u32; BINS];
        hist[10] = 50;
        hist[20] = 50;
        let lut = tile_lut(&mut hist, 100, 0.0);
        assert_eq!(lut[9], 0);
        assert_eq!(lut[10], 128);
        assert_eq!(lut[20], 255);
        assert_eq!(lut[255], 255);
    }

    #[test]
    fn clipping_conserves_pixel_count() {
        let mut hist = [0u32; BINS];
        hist[128] = 1000;
        let lut = tile_lut(&mut hist, 1000, 2.0);
        assert_eq!(hist.iter().sum::<u32>(), 1000);
        assert_eq!(lut[255], 255);
    }
}
