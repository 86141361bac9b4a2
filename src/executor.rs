//! Plan execution: run planned operators in order on one image.
//!
//! The image is converted to RGB8 once, every operator consumes the previous
//! operator's output, and the final buffer is returned as a new
//! [`DynamicImage`]. The source image is never modified.

use image::DynamicImage;
use tracing::debug;

use crate::image_handle::ImageHandle;
use crate::imaging::{BackendError, ImageBackend, apply_operation};
use crate::pipeline::PipelineError;
use crate::planner::{EnhancementOp, EnhancementOpType, EnhancementPlan};

/// Strength used when a planned operation carries none.
pub const DEFAULT_STRENGTH: f32 = 1.0;

/// Resolve the strength an operator receives.
///
/// A missing or zero strength becomes [`DEFAULT_STRENGTH`]. Gamma operators
/// are signed here: increase gets `|s|`, decrease gets `-|s|`.
pub fn effective_strength(op: &EnhancementOp) -> f32 {
    let s = match op.strength {
        Some(s) if s != 0.0 => s,
        _ => DEFAULT_STRENGTH,
    };
    match op.op_type {
        EnhancementOpType::GammaIncrease => s.abs(),
        EnhancementOpType::GammaDecrease => -s.abs(),
        _ => s,
    }
}

/// Apply every operation of `plan` to `image`, in plan order.
pub fn apply_plan(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    plan: &EnhancementPlan,
) -> Result<DynamicImage, BackendError> {
    let mut current = image.to_rgb8();
    for (index, op) in plan.ops.iter().enumerate() {
        let strength = effective_strength(op);
        debug!(index, op = %op.op_type, strength, "applying operator");
        current = apply_operation(backend, op.op_type, strength, &current)?;
    }
    Ok(DynamicImage::ImageRgb8(current))
}

/// Enhance the image bound to `handle`, decoding it first if needed.
///
/// Fails with a state error when the handle is unbound.
pub fn enhance(
    backend: &impl ImageBackend,
    handle: &mut ImageHandle,
    plan: &EnhancementPlan,
) -> Result<DynamicImage, PipelineError> {
    let image = handle.load()?;
    Ok(apply_plan(backend, image, plan)?)
}
