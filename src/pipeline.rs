//! Triage pipeline: analyze, plan and enhance single images or a batch.
//!
//! ## Single image
//!
//! ```text
//! ImageHandle ──load──▶ DistortionMetrics ──build_plan──▶ EnhancementPlan
//!                                                              │
//!                                     apply_plan (backend) ◀───┘
//! ```
//!
//! ## Batch
//!
//! Images are triaged in parallel on the current rayon pool, one image per
//! task. A failing image is recorded in the report and the batch continues.
//! Enhanced images are written under the output directory at the same path
//! relative to the input root, next to a `report.json`:
//!
//! ```text
//! out/
//! ├── report.json
//! ├── line-a/
//! │   └── 0001.png
//! └── 0002.jpg
//! ```
//!
//! Progress is reported as [`BatchEvent`]s over an optional channel so the
//! caller decides how to display it.

use image::DynamicImage;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, MetricsConfig, TriageConfig};
use crate::criteria::{CriteriaError, SharpnessCriteria};
use crate::executor::apply_plan;
use crate::image_handle::{HandleError, ImageHandle};
use crate::imaging::{BackendError, ImageBackend};
use crate::metrics::{DistortionMetrics, analyze};
use crate::planner::{EnhancementPlan, EnhancementPlanner};
use crate::types::{ErrorKind, SharpnessLevel};

/// File name of the batch report inside the output directory.
pub const REPORT_FILE_NAME: &str = "report.json";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Handle(#[from] HandleError),
    #[error(transparent)]
    Criteria(#[from] CriteriaError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to write image {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Input root not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error(
        "Output directory {} is the input root; enhanced images would overwrite the sources",
        .0.display()
    )]
    OutputIsInput(PathBuf),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Handle(e) => e.kind(),
            PipelineError::Criteria(e) => e.kind(),
            PipelineError::Config(e) => e.kind(),
            PipelineError::Backend(e) => e.kind(),
            PipelineError::Io(_) | PipelineError::Save { .. } => ErrorKind::Io,
            PipelineError::Json(_) => ErrorKind::Config,
            PipelineError::InputNotFound(_) => ErrorKind::Io,
            PipelineError::OutputIsInput(_) => ErrorKind::Validation,
        }
    }
}

/// Metrics and plan for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageReport {
    pub metrics: DistortionMetrics,
    pub plan: EnhancementPlan,
}

/// Everything needed to triage images: metric settings plus a planner.
///
/// Immutable after construction and shared by reference across workers.
#[derive(Debug, Clone, Default)]
pub struct Triage {
    metrics: MetricsConfig,
    planner: EnhancementPlanner,
}

impl Triage {
    pub fn new(metrics: MetricsConfig, planner: EnhancementPlanner) -> Self {
        Self { metrics, planner }
    }

    /// Build from a resolved config, loading the rule table it names.
    ///
    /// Without a `criteria.rules` entry the stock table is used.
    pub fn from_config(config: &TriageConfig) -> Result<Self, PipelineError> {
        let criteria = match &config.criteria.rules {
            Some(path) => SharpnessCriteria::load(path)?,
            None => SharpnessCriteria::stock(),
        };
        info!(rules = criteria.rules().len(), "loaded sharpness criteria");
        Ok(Self::new(
            config.metrics.clone(),
            EnhancementPlanner::new(criteria, config.planner.clone()),
        ))
    }

    pub fn planner(&self) -> &EnhancementPlanner {
        &self.planner
    }

    /// Measure and plan the image bound to `handle`.
    pub fn triage(&self, handle: &mut ImageHandle) -> Result<TriageReport, PipelineError> {
        let metrics = analyze(handle, &self.metrics)?;
        let plan = self.planner.build_plan(&metrics);
        Ok(TriageReport { metrics, plan })
    }

    /// Triage, then run the plan. Returns the report and the enhanced image.
    pub fn enhance(
        &self,
        backend: &impl ImageBackend,
        handle: &mut ImageHandle,
    ) -> Result<(TriageReport, DynamicImage), PipelineError> {
        let report = self.triage(handle)?;
        let image = handle.load()?;
        let enhanced = apply_plan(backend, image, &report.plan)?;
        Ok((report, enhanced))
    }
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ImageTriaged {
        /// 1-based position in the batch.
        index: usize,
        total: usize,
        path: PathBuf,
        level: SharpnessLevel,
        ops: usize,
        low_quality: bool,
    },
    ImageFailed {
        index: usize,
        total: usize,
        path: PathBuf,
        error: String,
    },
}

/// One report line: metrics and plan, or the error that stopped the image.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<DistortionMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<EnhancementPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEntry {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Contents of `report.json`, entries in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    pub fn low_quality(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.plan.as_ref().is_some_and(EnhancementPlan::is_low_quality))
            .count()
    }
}

/// Destination for an enhanced copy of `source`.
///
/// Keeps the path relative to `input_root`; sources outside it fall back to
/// their bare file name.
pub fn output_path_for(source: &Path, input_root: &Path, output_dir: &Path) -> PathBuf {
    match source.strip_prefix(input_root) {
        Ok(relative) if !relative.as_os_str().is_empty() => output_dir.join(relative),
        _ => output_dir.join(source.file_name().unwrap_or(source.as_os_str())),
    }
}

/// Triage and enhance `sources`, writing results under `output_dir`.
///
/// Per-image failures are collected into the report; only failures to create
/// the output directory or write the report abort the batch. An output
/// directory that is the input root is rejected before anything is written.
pub fn run_batch(
    backend: &impl ImageBackend,
    triage: &Triage,
    sources: &[PathBuf],
    input_root: &Path,
    output_dir: &Path,
    progress: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, PipelineError> {
    if same_directory(input_root, output_dir) {
        return Err(PipelineError::OutputIsInput(output_dir.to_path_buf()));
    }
    fs::create_dir_all(output_dir)?;
    let total = sources.len();
    emit(&progress, BatchEvent::Started { total });
    info!(total, output = %output_dir.display(), "starting batch");

    let entries: Vec<BatchEntry> = sources
        .par_iter()
        .enumerate()
        .map(|(i, source)| {
            let index = i + 1;
            let destination = output_path_for(source, input_root, output_dir);
            match process_one(backend, triage, source, &destination) {
                Ok(report) => {
                    emit(
                        &progress,
                        BatchEvent::ImageTriaged {
                            index,
                            total,
                            path: source.clone(),
                            level: report.plan.sharpness_level,
                            ops: report.plan.ops.len(),
                            low_quality: report.plan.is_low_quality(),
                        },
                    );
                    BatchEntry {
                        source: source.clone(),
                        output: Some(destination),
                        metrics: Some(report.metrics),
                        plan: Some(report.plan),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(path = %source.display(), error = %e, "image failed");
                    emit(
                        &progress,
                        BatchEvent::ImageFailed {
                            index,
                            total,
                            path: source.clone(),
                            error: e.to_string(),
                        },
                    );
                    BatchEntry {
                        source: source.clone(),
                        output: None,
                        metrics: None,
                        plan: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect();

    let report = BatchReport { entries };
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(output_dir.join(REPORT_FILE_NAME), json)?;
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch complete"
    );
    Ok(report)
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn process_one(
    backend: &impl ImageBackend,
    triage: &Triage,
    source: &Path,
    destination: &Path,
) -> Result<TriageReport, PipelineError> {
    let mut handle = ImageHandle::bound(source);
    let (report, enhanced) = triage.enhance(backend, &mut handle)?;
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    enhanced
        .save(destination)
        .map_err(|source| PipelineError::Save {
            path: destination.to_path_buf(),
            source,
        })?;
    Ok(report)
}

fn emit(progress: &Option<Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = progress {
        // A dropped receiver only loses progress lines.
        tx.send(event).ok();
    }
}
