//! Pure calculation functions for operator parameters.
//!
//! All functions here are pure and testable without any images.

/// Map a signed strength in `[-1, 1]` to a gamma value.
///
/// Positive strengths give `gamma` in `[0.5, 1]`, negative strengths give
/// `gamma` in `[1, 2]`. See [`gamma_lut`] for how the value is applied.
///
/// # Examples
/// ```
/// # use quality_triage::imaging::gamma_from_strength;
/// assert_eq!(gamma_from_strength(1.0), 0.5);
/// assert_eq!(gamma_from_strength(0.0), 1.0);
/// assert_eq!(gamma_from_strength(-1.0), 2.0);
/// ```
pub fn gamma_from_strength(strength: f32) -> f32 {
    if strength >= 0.0 {
        1.0 - 0.5 * strength
    } else {
        1.0 - strength
    }
}

/// 256-entry lookup table `table[i] = (i/255)^(1/gamma) · 255`, rounded.
///
/// The exponent is `1/gamma`, so `gamma < 1` pulls midtones down and
/// `gamma > 1` lifts them.
pub fn gamma_lut(gamma: f32) -> [u8; 256] {
    let inv_gamma = 1.0 / gamma as f64;
    let mut table = [0u8; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let v = (i as f64 / 255.0).powf(inv_gamma) * 255.0;
        *entry = v.round().clamp(0.0, 255.0) as u8;
    }
    table
}

/// Mirror an index into `0..len` without repeating the edge sample:
/// `-1 → 1` and `len → len - 2`. Single-sample axes always map to 0.
pub(crate) fn reflect_101(i: i64, len: i64) -> i64 {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let m = i.rem_euclid(period);
    if m < len { m } else { period - m }
}

/// Bilateral window side for a spatial sigma: `2·round(1.5·σ) + 1`.
pub fn bilateral_window(sigma_space: f32) -> u32 {
    2 * (1.5 * sigma_space).round().max(0.0) as u32 + 1
}
