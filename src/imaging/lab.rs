//! sRGB ⇄ CIE L*a*b* (D65) for 8-bit images.
//!
//! Lightness is exposed on the 8-bit scale `L·255/100` so it can be
//! histogram-equalised directly; chroma stays in floating point to avoid
//! quantising colour twice on the way back.

use image::{GrayImage, Luma, Rgb, RgbImage};

const WHITE_X: f32 = 0.950_456;
const WHITE_Z: f32 = 1.088_754;
const EPSILON: f32 = 0.008_856;
const KAPPA: f32 = 903.3;

/// Planar Lab image: 8-bit lightness plus floating point a*/b*.
pub struct LabPlanes {
    pub lightness: GrayImage,
    pub a: Vec<f32>,
    pub b: Vec<f32>,
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

fn f_inv(t: f32) -> f32 {
    let t3 = t * t * t;
    if t3 > EPSILON {
        t3
    } else {
        (116.0 * t - 16.0) / KAPPA
    }
}

/// Convert one pixel to `(L, a, b)` with `L` in `[0, 100]`.
pub fn rgb_to_lab(px: Rgb<u8>) -> (f32, f32, f32) {
    let [r, g, b] = px.0.map(srgb_to_linear);
    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / WHITE_X;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / WHITE_Z;
    let (fx, fy, fz) = (f(x), f(y), f(z));
    let l = if y > EPSILON {
        116.0 * fy - 16.0
    } else {
        KAPPA * y
    };
    (l, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Inverse of [`rgb_to_lab`].
pub fn lab_to_rgb(l: f32, a: f32, b: f32) -> Rgb<u8> {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let x = f_inv(fx) * WHITE_X;
    let y = if l > KAPPA * EPSILON {
        fy * fy * fy
    } else {
        l / KAPPA
    };
    let z = f_inv(fz) * WHITE_Z;
    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_992 * y + 0.041_556 * z;
    let b = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;
    Rgb([linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b)])
}

/// Split an RGB image into 8-bit lightness and a*/b* planes.
pub fn split_lab(rgb: &RgbImage) -> LabPlanes {
    let len = (rgb.width() * rgb.height()) as usize;
    let mut a = Vec::with_capacity(len);
    let mut b = Vec::with_capacity(len);
    let mut lightness = GrayImage::new(rgb.width(), rgb.height());
    for (px, out) in rgb.pixels().zip(lightness.pixels_mut()) {
        let (l, pa, pb) = rgb_to_lab(*px);
        *out = Luma([(l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8]);
        a.push(pa);
        b.push(pb);
    }
    LabPlanes { lightness, a, b }
}

/// Recombine planes into RGB. `lightness` must match the plane dimensions.
pub fn merge_lab(planes: &LabPlanes) -> RgbImage {
    let (w, h) = planes.lightness.dimensions();
    let mut out = RgbImage::new(w, h);
    for (i, (px, l8)) in out.pixels_mut().zip(planes.lightness.pixels()).enumerate() {
        let l = l8[0] as f32 * 100.0 / 255.0;
        *px = lab_to_rgb(l, planes.a[i], planes.b[i]);
    }
    out
}
