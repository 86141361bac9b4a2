//! CLI output formatting for analysis, plans and batch runs.
//!
//! # Information-First Display
//!
//! Every image leads with its identity (positional index or path) followed
//! by the verdict; measurements and operations follow as indented context
//! lines. The same helpers are used by every command so a plan printed by
//! `plan` reads the same as one summarised by `batch`.
//!
//! # Output Format
//!
//! ## Analyze
//!
//! ```text
//! line-a/0001.png
//!     Sharpness: 412.30
//!     Noise variance: 3.21
//!     Illumination uniformity: 0.418
//!     Over-exposure: 0.00%
//! ```
//!
//! ## Plan
//!
//! ```text
//! line-a/0001.png → Moderate_Blur (penalty 0.75)
//!     1. denoise_strong 0.80
//!     2. deblur 0.60
//!     3. sharpen_medium 0.70
//!     4. gamma_increase +0.20
//! ```
//!
//! ## Batch
//!
//! ```text
//! Triaging 3 images
//!     001/003 0001.png → Clear, 1 op
//!     002/003 0002.png → Heavy_Blur, 2 ops [low quality]
//!     003/003 0003.png → FAILED: Failed to decode image ...
//! Triaged 2 of 3 images (1 failed, 1 low quality) → out/report.json
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use std::path::Path;

use crate::executor::effective_strength;
use crate::metrics::DistortionMetrics;
use crate::pipeline::{BatchEvent, BatchReport, REPORT_FILE_NAME, TriageReport};
use crate::planner::{EnhancementOp, EnhancementOpType, EnhancementPlan};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// One operation as `name strength`. Gamma strengths carry their sign.
fn op_line(op: &EnhancementOp) -> String {
    match op.op_type {
        EnhancementOpType::MarkAsLowQuality => op.op_type.to_string(),
        EnhancementOpType::GammaIncrease | EnhancementOpType::GammaDecrease => {
            format!("{} {:+.2}", op.op_type, effective_strength(op))
        }
        _ => format!("{} {:.2}", op.op_type, effective_strength(op)),
    }
}

// ============================================================================
// Analyze / plan
// ============================================================================

pub fn format_metrics(path: &Path, metrics: &DistortionMetrics) -> Vec<String> {
    vec![
        path.display().to_string(),
        format!("{}Sharpness: {:.2}", indent(1), metrics.sharpness),
        format!("{}Noise variance: {:.2}", indent(1), metrics.noise_variance),
        format!(
            "{}Illumination uniformity: {:.3}",
            indent(1),
            metrics.illumination_uniformity
        ),
        format!(
            "{}Over-exposure: {:.2}%",
            indent(1),
            metrics.overexposure_ratio * 100.0
        ),
    ]
}

pub fn format_plan(path: &Path, plan: &EnhancementPlan) -> Vec<String> {
    let mut lines = vec![format!(
        "{} → {} (penalty {:.2})",
        path.display(),
        plan.sharpness_level,
        plan.quality_penalty
    )];
    if plan.ops.is_empty() {
        lines.push(format!("{}no enhancement needed", indent(1)));
    }
    for (i, op) in plan.ops.iter().enumerate() {
        lines.push(format!("{}{}. {}", indent(1), i + 1, op_line(op)));
    }
    lines
}

/// Metrics followed by the plan, as printed by the `plan` command.
pub fn format_report(path: &Path, report: &TriageReport) -> Vec<String> {
    let mut lines = format_plan(path, &report.plan);
    lines.extend(format_metrics(path, &report.metrics).into_iter().skip(1));
    lines
}

pub fn print_metrics(path: &Path, metrics: &DistortionMetrics) {
    for line in format_metrics(path, metrics) {
        println!("{}", line);
    }
}

pub fn print_report(path: &Path, report: &TriageReport) {
    for line in format_report(path, report) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!("Triaging {}", plural(*total, "image"))],
        BatchEvent::ImageTriaged {
            index,
            total,
            path,
            level,
            ops,
            low_quality,
        } => {
            let flag = if *low_quality { " [low quality]" } else { "" };
            vec![format!(
                "{}{}/{} {} → {}, {}{}",
                indent(1),
                format_index(*index),
                format_index(*total),
                display_name(path),
                level,
                plural(*ops, "op"),
                flag
            )]
        }
        BatchEvent::ImageFailed {
            index,
            total,
            path,
            error,
        } => vec![format!(
            "{}{}/{} {} → FAILED: {}",
            indent(1),
            format_index(*index),
            format_index(*total),
            display_name(path),
            error
        )],
    }
}

pub fn format_batch_summary(report: &BatchReport, output_dir: &Path) -> Vec<String> {
    vec![format!(
        "Triaged {} of {} ({} failed, {} low quality) → {}",
        report.succeeded(),
        plural(report.entries.len(), "image"),
        report.failed(),
        report.low_quality(),
        output_dir.join(REPORT_FILE_NAME).display()
    )]
}

pub fn print_batch_summary(report: &BatchReport, output_dir: &Path) {
    for line in format_batch_summary(report, output_dir) {
        println!("{}", line);
    }
}
