//! Enhancement planner: metrics and severity in, ordered operations out.
//!
//! Planning is a pure function of the metrics, the sharpness level and the
//! [`PlannerConfig`] thresholds. Two tone proxies are derived from the
//! illumination uniformity `U`:
//!
//! - brightness = clamp01(1 − U)
//! - contrast = clamp01(U)
//!
//! | Level | Operations, in order |
//! |---|---|
//! | Clear | gamma ± (brightness band) · CLAHE (low contrast) |
//! | Slight blur | light denoise (noisy) · light sharpen · CLAHE (low contrast) |
//! | Moderate blur | strong denoise (noisy) · deblur · medium sharpen · CLAHE (low contrast) · gamma ± (brightness band) |
//! | Heavy blur | mark as low quality · aggressive deblur |

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::PlannerConfig;
use crate::criteria::SharpnessCriteria;
use crate::metrics::DistortionMetrics;
use crate::types::SharpnessLevel;

const GAMMA_STRENGTH: f32 = 0.2;
const CLAHE_STRENGTH: f32 = 1.0;
const DENOISE_LIGHT_STRENGTH: f32 = 0.5;
const SHARPEN_LIGHT_STRENGTH: f32 = 0.5;
const DENOISE_STRONG_STRENGTH: f32 = 0.8;
const DEBLUR_STRENGTH: f32 = 0.6;
const SHARPEN_MEDIUM_STRENGTH: f32 = 0.7;
const DEBLUR_AGGRESSIVE_STRENGTH: f32 = 1.0;

/// Enhancement operation tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementOpType {
    DenoiseLight,
    DenoiseStrong,
    SharpenLight,
    SharpenMedium,
    Deblur,
    DeblurAggressive,
    GammaIncrease,
    GammaDecrease,
    Clahe,
    MarkAsLowQuality,
}

impl EnhancementOpType {
    pub const ALL: [EnhancementOpType; 10] = [
        EnhancementOpType::DenoiseLight,
        EnhancementOpType::DenoiseStrong,
        EnhancementOpType::SharpenLight,
        EnhancementOpType::SharpenMedium,
        EnhancementOpType::Deblur,
        EnhancementOpType::DeblurAggressive,
        EnhancementOpType::GammaIncrease,
        EnhancementOpType::GammaDecrease,
        EnhancementOpType::Clahe,
        EnhancementOpType::MarkAsLowQuality,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EnhancementOpType::DenoiseLight => "denoise_light",
            EnhancementOpType::DenoiseStrong => "denoise_strong",
            EnhancementOpType::SharpenLight => "sharpen_light",
            EnhancementOpType::SharpenMedium => "sharpen_medium",
            EnhancementOpType::Deblur => "deblur",
            EnhancementOpType::DeblurAggressive => "deblur_aggressive",
            EnhancementOpType::GammaIncrease => "gamma_increase",
            EnhancementOpType::GammaDecrease => "gamma_decrease",
            EnhancementOpType::Clahe => "clahe",
            EnhancementOpType::MarkAsLowQuality => "mark_as_low_quality",
        }
    }
}

impl fmt::Display for EnhancementOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned operation. Strength is clamped by the operator, not here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnhancementOp {
    #[serde(rename = "op")]
    pub op_type: EnhancementOpType,
    pub strength: Option<f32>,
}

impl EnhancementOp {
    pub fn new(op_type: EnhancementOpType, strength: f32) -> Self {
        Self {
            op_type,
            strength: Some(strength),
        }
    }

    /// An operation with no explicit strength.
    pub fn flag(op_type: EnhancementOpType) -> Self {
        Self {
            op_type,
            strength: None,
        }
    }
}

/// Ordered enhancement operations for one image plus its quality penalty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementPlan {
    #[serde(rename = "level")]
    pub sharpness_level: SharpnessLevel,
    pub ops: Vec<EnhancementOp>,
    pub quality_penalty: f64,
}

impl EnhancementPlan {
    pub fn contains(&self, op_type: EnhancementOpType) -> bool {
        self.ops.iter().any(|op| op.op_type == op_type)
    }

    pub fn is_low_quality(&self) -> bool {
        self.contains(EnhancementOpType::MarkAsLowQuality)
    }
}

/// Tone proxies derived from illumination uniformity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneProxies {
    pub brightness: f64,
    pub contrast: f64,
}

impl ToneProxies {
    // TODO: replace with measured brightness and contrast once those metrics
    // exist; both proxies currently come from the same uniformity value.
    pub fn from_metrics(metrics: &DistortionMetrics) -> Self {
        let u = metrics.illumination_uniformity;
        Self {
            brightness: clamp01(1.0 - u),
            contrast: clamp01(u),
        }
    }
}

/// Clamp to `[0, 1]`; `NaN` maps to 0.
fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Decide the operations for an image already classified as `level`.
pub fn plan_for_level(
    metrics: &DistortionMetrics,
    level: SharpnessLevel,
    config: &PlannerConfig,
) -> EnhancementPlan {
    use EnhancementOpType::*;

    let tone = ToneProxies::from_metrics(metrics);
    let noisy = metrics.noise_variance > config.noise_high;
    let low_contrast = tone.contrast < config.contrast_low;
    let gamma = if tone.brightness < config.bright_low {
        Some(EnhancementOp::new(GammaIncrease, GAMMA_STRENGTH))
    } else if tone.brightness > config.bright_high {
        Some(EnhancementOp::new(GammaDecrease, GAMMA_STRENGTH))
    } else {
        None
    };
    let clahe = low_contrast.then(|| EnhancementOp::new(Clahe, CLAHE_STRENGTH));

    let mut ops = Vec::new();
    match level {
        SharpnessLevel::Clear => {
            ops.extend(gamma);
            ops.extend(clahe);
        }
        SharpnessLevel::SlightBlur => {
            if noisy {
                ops.push(EnhancementOp::new(DenoiseLight, DENOISE_LIGHT_STRENGTH));
            }
            ops.push(EnhancementOp::new(SharpenLight, SHARPEN_LIGHT_STRENGTH));
            ops.extend(clahe);
        }
        SharpnessLevel::ModerateBlur => {
            if noisy {
                ops.push(EnhancementOp::new(DenoiseStrong, DENOISE_STRONG_STRENGTH));
            }
            ops.push(EnhancementOp::new(Deblur, DEBLUR_STRENGTH));
            ops.push(EnhancementOp::new(SharpenMedium, SHARPEN_MEDIUM_STRENGTH));
            ops.extend(clahe);
            ops.extend(gamma);
        }
        SharpnessLevel::HeavyBlur => {
            ops.push(EnhancementOp::flag(MarkAsLowQuality));
            ops.push(EnhancementOp::new(DeblurAggressive, DEBLUR_AGGRESSIVE_STRENGTH));
        }
    }

    EnhancementPlan {
        sharpness_level: level,
        ops,
        quality_penalty: config.penalties.for_level(level),
    }
}

/// Classifies sharpness against a rule table, then plans.
///
/// Immutable after construction; share freely across workers.
#[derive(Debug, Clone, Default)]
pub struct EnhancementPlanner {
    criteria: SharpnessCriteria,
    config: PlannerConfig,
}

impl EnhancementPlanner {
    pub fn new(criteria: SharpnessCriteria, config: PlannerConfig) -> Self {
        Self { criteria, config }
    }

    pub fn criteria(&self) -> &SharpnessCriteria {
        &self.criteria
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn classify_sharpness(&self, sharpness: f64) -> SharpnessLevel {
        self.criteria.classify(sharpness)
    }

    pub fn build_plan(&self, metrics: &DistortionMetrics) -> EnhancementPlan {
        let level = self.classify_sharpness(metrics.sharpness);
        let plan = plan_for_level(metrics, level, &self.config);
        debug!(
            level = %plan.sharpness_level,
            ops = plan.ops.len(),
            quality_penalty = plan.quality_penalty,
            "built enhancement plan"
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::EnhancementOpType::*;
    use super::*;

    fn metrics(sharpness: f64, noise: f64, uniformity: f64) -> DistortionMetrics {
        DistortionMetrics {
            sharpness,
            noise_variance: noise,
            illumination_uniformity: uniformity,
            overexposure_ratio: 0.0,
        }
    }

    fn planner() -> EnhancementPlanner {
        EnhancementPlanner::new(SharpnessCriteria::stock(), PlannerConfig::default())
    }

    fn op_types(plan: &EnhancementPlan) -> Vec<EnhancementOpType> {
        plan.ops.iter().map(|op| op.op_type).collect()
    }

    #[test]
    fn heavy_blur_plan() {
        let plan = planner().build_plan(&metrics(1.0, 0.2, 0.3));
        assert_eq!(plan.sharpness_level, SharpnessLevel::HeavyBlur);
        assert_eq!(
            plan.ops,
            vec![
                EnhancementOp::flag(MarkAsLowQuality),
                EnhancementOp::new(DeblurAggressive, 1.0),
            ]
        );
        assert_eq!(plan.quality_penalty, 0.4);
        assert!(plan.is_low_quality());
    }

    #[test]
    fn clear_low_contrast_gets_clahe() {
        let plan = planner().build_plan(&metrics(30.0, 0.1, 0.1));
        assert_eq!(plan.sharpness_level, SharpnessLevel::Clear);
        assert!(plan.ops.contains(&EnhancementOp::new(Clahe, 1.0)));
        // brightness proxy 0.9 > 0.65
        assert_eq!(
            plan.ops,
            vec![
                EnhancementOp::new(GammaDecrease, 0.2),
                EnhancementOp::new(Clahe, 1.0),
            ]
        );
        assert_eq!(plan.quality_penalty, 1.0);
    }

    #[test]
    fn slight_blur_noisy_without_clahe() {
        let plan = planner().build_plan(&metrics(18.0, 0.6, 0.4));
        assert_eq!(plan.sharpness_level, SharpnessLevel::SlightBlur);
        assert_eq!(
            plan.ops,
            vec![
                EnhancementOp::new(DenoiseLight, 0.5),
                EnhancementOp::new(SharpenLight, 0.5),
            ]
        );
        assert_eq!(plan.quality_penalty, 0.95);
    }

    #[test]
    fn slight_blur_quiet_low_contrast() {
        let plan = planner().build_plan(&metrics(18.0, 0.1, 0.1));
        assert_eq!(op_types(&plan), vec![SharpenLight, Clahe]);
    }

    #[test]
    fn clear_in_brightness_band_has_no_gamma() {
        // brightness 0.5, contrast 0.5
        let plan = planner().build_plan(&metrics(30.0, 0.0, 0.5));
        assert!(plan.ops.is_empty());
    }

    #[test]
    fn clear_dark_frame_gets_gamma_increase() {
        // brightness 0.2 < 0.35, contrast 0.8
        let plan = planner().build_plan(&metrics(30.0, 0.0, 0.8));
        assert_eq!(plan.ops, vec![EnhancementOp::new(GammaIncrease, 0.2)]);
    }

    #[test]
    fn moderate_blur_full_ordering() {
        // noisy, contrast 0.1 < 0.25, brightness 0.9 > 0.65
        let plan = planner().build_plan(&metrics(10.0, 5.0, 0.1));
        assert_eq!(plan.sharpness_level, SharpnessLevel::ModerateBlur);
        assert_eq!(
            plan.ops,
            vec![
                EnhancementOp::new(DenoiseStrong, 0.8),
                EnhancementOp::new(Deblur, 0.6),
                EnhancementOp::new(SharpenMedium, 0.7),
                EnhancementOp::new(Clahe, 1.0),
                EnhancementOp::new(GammaDecrease, 0.2),
            ]
        );
        assert_eq!(plan.quality_penalty, 0.75);
    }

    #[test]
    fn moderate_blur_minimal() {
        let plan = planner().build_plan(&metrics(10.0, 0.0, 0.5));
        assert_eq!(op_types(&plan), vec![Deblur, SharpenMedium]);
    }

    #[test]
    fn heavy_blur_ignores_noise_and_illumination() {
        let cfg = PlannerConfig::default();
        for (noise, u) in [(0.0, 0.0), (1e4, 0.0), (0.0, 2.0), (1e4, f64::INFINITY)] {
            let plan = plan_for_level(&metrics(0.0, noise, u), SharpnessLevel::HeavyBlur, &cfg);
            assert_eq!(op_types(&plan), vec![MarkAsLowQuality, DeblurAggressive]);
        }
    }

    #[test]
    fn build_plan_is_pure() {
        let planner = planner();
        let m = metrics(12.0, 3.0, 0.2);
        assert_eq!(planner.build_plan(&m), planner.build_plan(&m));
    }

    #[test]
    fn thresholds_come_from_config() {
        let config = PlannerConfig {
            noise_high: 100.0,
            contrast_low: 0.0,
            ..PlannerConfig::default()
        };
        let planner = EnhancementPlanner::new(SharpnessCriteria::stock(), config);
        let plan = planner.build_plan(&metrics(18.0, 50.0, 0.4));
        assert_eq!(op_types(&plan), vec![SharpenLight]);
    }

    #[test]
    fn proxies_are_clamped() {
        let dark = ToneProxies::from_metrics(&metrics(0.0, 0.0, 3.0));
        assert_eq!(dark.brightness, 0.0);
        assert_eq!(dark.contrast, 1.0);
        let infinite = ToneProxies::from_metrics(&metrics(0.0, 0.0, f64::INFINITY));
        assert_eq!(infinite.brightness, 0.0);
        assert_eq!(infinite.contrast, 1.0);
    }

    #[test]
    fn plan_serializes_for_audit() {
        let plan = planner().build_plan(&metrics(1.0, 0.2, 0.3));
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["level"], "Heavy_Blur");
        assert_eq!(json["quality_penalty"], 0.4);
        assert_eq!(json["ops"][0]["op"], "mark_as_low_quality");
        assert!(json["ops"][0]["strength"].is_null());
        assert_eq!(json["ops"][1]["op"], "deblur_aggressive");
        assert_eq!(json["ops"][1]["strength"], 1.0);
    }

    #[test]
    fn op_names_match_serde() {
        for op in EnhancementOpType::ALL {
            let json = serde_json::to_value(op).unwrap();
            assert_eq!(json, op.as_str());
        }
    }
}
