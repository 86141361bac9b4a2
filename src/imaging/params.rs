//! Parameter types for enhancement operators.
//!
//! These structs describe *what* to do, not *how* to do it. Each one is built
//! from a planned strength, clamps it to the operator's accepted range and
//! derives the concrete filter settings. The
//! [`operations`](super::operations) functions then do the pixel work.
//!
//! | Operator | Strength range | Derived settings |
//! |---|---|---|
//! | [`Bilateral`] | 0.1–1.0 | σ_color = σ_space = 25·s, window 2·round(1.5·σ)+1 |
//! | [`NonLocalMeans`] | 0.1–1.0 | h = 10·s, template 7, search 21 |
//! | [`UnsharpMask`] | 0.1–1.0 light, 0.1–1.5 medium | σ = 1.0 / 1.5, amount = s |
//! | [`CrossKernel`] | 0.1–1.0 normal, 0.5–2.0 aggressive | centre 5+s / 5+2s |
//! | [`Gamma`] | −1–1 | γ = 1−0.5s (s ≥ 0), 1−s (s < 0) |
//! | [`Clahe`] | 0.3–2.0 | clip 2.0·s, 8×8 tiles |

use super::calculations::{bilateral_window, gamma_from_strength};

/// Inclusive range a strength is clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrengthRange {
    pub min: f32,
    pub max: f32,
}

impl StrengthRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp into the range; `NaN` falls back to the lower bound.
    pub fn clamp(self, strength: f32) -> f32 {
        if strength.is_nan() {
            self.min
        } else {
            strength.clamp(self.min, self.max)
        }
    }
}

/// Edge-preserving bilateral smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bilateral {
    pub sigma_color: f32,
    pub sigma_space: f32,
    pub window: u32,
}

impl Bilateral {
    pub const RANGE: StrengthRange = StrengthRange::new(0.1, 1.0);
    const BASE_SIGMA: f32 = 25.0;

    pub fn from_strength(strength: f32) -> Self {
        let s = Self::RANGE.clamp(strength);
        let sigma = Self::BASE_SIGMA * s;
        Self {
            sigma_color: sigma,
            sigma_space: sigma,
            window: bilateral_window(sigma),
        }
    }
}

/// Non-local means patch averaging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonLocalMeans {
    /// Filter strength; larger values average more dissimilar patches.
    pub h: f32,
    /// Side of the square patch compared between pixels.
    pub template: u32,
    /// Side of the square region searched for similar patches.
    pub search: u32,
}

impl NonLocalMeans {
    pub const RANGE: StrengthRange = StrengthRange::new(0.1, 1.0);
    pub const TEMPLATE: u32 = 7;
    pub const SEARCH: u32 = 21;

    pub fn from_strength(strength: f32) -> Self {
        Self {
            h: 10.0 * Self::RANGE.clamp(strength),
            template: Self::TEMPLATE,
            search: Self::SEARCH,
        }
    }
}

/// Unsharp masking: `out = img·(1 + amount) − blur(img, σ)·amount`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpMask {
    pub sigma: f32,
    pub amount: f32,
}

impl UnsharpMask {
    pub const LIGHT_RANGE: StrengthRange = StrengthRange::new(0.1, 1.0);
    pub const MEDIUM_RANGE: StrengthRange = StrengthRange::new(0.1, 1.5);

    pub fn light(strength: f32) -> Self {
        Self {
            sigma: 1.0,
            amount: Self::LIGHT_RANGE.clamp(strength),
        }
    }

    pub fn medium(strength: f32) -> Self {
        Self {
            sigma: 1.5,
            amount: Self::MEDIUM_RANGE.clamp(strength),
        }
    }
}

/// 3×3 cross-shaped sharpening kernel: arms −1, corners 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossKernel {
    pub centre: f32,
}

impl CrossKernel {
    pub const RANGE: StrengthRange = StrengthRange::new(0.1, 1.0);
    pub const AGGRESSIVE_RANGE: StrengthRange = StrengthRange::new(0.5, 2.0);

    pub fn deblur(strength: f32) -> Self {
        Self {
            centre: 5.0 + Self::RANGE.clamp(strength),
        }
    }

    pub fn aggressive(strength: f32) -> Self {
        Self {
            centre: 5.0 + 2.0 * Self::AGGRESSIVE_RANGE.clamp(strength),
        }
    }

    /// Row-major kernel weights.
    pub fn weights(self) -> [f32; 9] {
        [0.0, -1.0, 0.0, -1.0, self.centre, -1.0, 0.0, -1.0, 0.0]
    }
}

/// Global tone curve applied through [`gamma_lut`](super::calculations::gamma_lut).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gamma {
    pub gamma: f32,
}

impl Gamma {
    pub const RANGE: StrengthRange = StrengthRange::new(-1.0, 1.0);

    /// Signed strength: the gamma-increase operator passes `|s|`, the
    /// gamma-decrease operator `-|s|`.
    pub fn from_strength(strength: f32) -> Self {
        Self {
            gamma: gamma_from_strength(Self::RANGE.clamp(strength)),
        }
    }
}

/// Contrast-limited adaptive histogram equalisation on lightness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clahe {
    pub clip_limit: f32,
    pub tiles: (u32, u32),
}

impl Clahe {
    pub const RANGE: StrengthRange = StrengthRange::new(0.3, 2.0);

    pub fn from_strength(strength: f32) -> Self {
        Self {
            clip_limit: 2.0 * Self::RANGE.clamp(strength),
            tiles: (8, 8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_range_clamps() {
        let r = StrengthRange::new(0.1, 1.0);
        assert_eq!(r.clamp(0.0), 0.1);
        assert_eq!(r.clamp(0.5), 0.5);
        assert_eq!(r.clamp(3.0), 1.0);
        assert_eq!(r.clamp(f32::NAN), 0.1);
    }

    #[test]
    fn bilateral_scales_with_strength() {
        let p = Bilateral::from_strength(0.5);
        assert_eq!(p.sigma_color, 12.5);
        assert_eq!(p.sigma_space, 12.5);
        // round(18.75) = 19
        assert_eq!(p.window, 39);
        assert_eq!(Bilateral::from_strength(5.0).sigma_color, 25.0);
        assert_eq!(Bilateral::from_strength(0.0).sigma_color, 2.5);
    }

    #[test]
    fn nlm_h_and_windows() {
        let p = NonLocalMeans::from_strength(0.8);
        assert_eq!(p.h, 8.0);
        assert_eq!((p.template, p.search), (7, 21));
        assert_eq!(NonLocalMeans::from_strength(0.0).h, 1.0);
    }

    #[test]
    fn unsharp_variants() {
        assert_eq!(UnsharpMask::light(0.5), UnsharpMask { sigma: 1.0, amount: 0.5 });
        assert_eq!(UnsharpMask::light(1.4).amount, 1.0);
        assert_eq!(UnsharpMask::medium(1.4), UnsharpMask { sigma: 1.5, amount: 1.4 });
        assert_eq!(UnsharpMask::medium(9.0).amount, 1.5);
    }

    #[test]
    fn cross_kernel_centres() {
        assert_eq!(CrossKernel::deblur(0.6).centre, 5.6);
        assert_eq!(CrossKernel::deblur(3.0).centre, 6.0);
        assert_eq!(CrossKernel::aggressive(1.0).centre, 7.0);
        assert_eq!(CrossKernel::aggressive(0.0).centre, 6.0);
        let w = CrossKernel::deblur(1.0).weights();
        assert_eq!(w, [0.0, -1.0, 0.0, -1.0, 6.0, -1.0, 0.0, -1.0, 0.0]);
    }

    #[test]
    fn gamma_direction() {
        assert_eq!(Gamma::from_strength(0.2).gamma, 0.9);
        assert_eq!(Gamma::from_strength(-0.2).gamma, 1.2);
        assert_eq!(Gamma::from_strength(5.0).gamma, 0.5);
        assert_eq!(Gamma::from_strength(-5.0).gamma, 2.0);
    }

    #[test]
    fn clahe_clip_limit() {
        assert_eq!(Clahe::from_strength(1.0).clip_limit, 2.0);
        assert_eq!(Clahe::from_strength(0.0).clip_limit, 0.6);
        assert_eq!(Clahe::from_strength(1.0).tiles, (8, 8));
    }
}
