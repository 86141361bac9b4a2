//! # Quality Triage
//!
//! Image-quality triage for automated inspection lines. Every captured frame
//! is measured, graded for blur against a tunable rule table, and given an
//! ordered list of corrective operations, which can then be applied to
//! produce an enhanced copy.
//!
//! # Architecture: Measure → Classify → Plan → Enhance
//!
//! ```text
//! 1. Measure   ImageHandle       →  DistortionMetrics   (sharpness, noise, uniformity, over-exposure)
//! 2. Classify  sharpness score   →  SharpnessLevel      (CSV rule table, narrowest interval wins)
//! 3. Plan      metrics + level   →  EnhancementPlan     (ordered ops + quality penalty)
//! 4. Enhance   image + plan      →  enhanced RGB image  (operators chained in plan order)
//! ```
//!
//! Stages 1–3 are pure and cheap; stage 4 is the only one that touches pixels
//! beyond measurement. Every stage can be run on its own from the CLI
//! (`analyze`, `plan`, `enhance`) or all together over a directory (`batch`).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`image_handle`] | Bind a buffer or a path; decode lazily on `load` |
//! | [`metrics`] | The four distortion metrics and their aggregation |
//! | [`criteria`] | CSV sharpness rule table and classification |
//! | [`planner`] | Decision table from metrics and level to operations |
//! | [`imaging`] | Operator catalog, [`ImageBackend`](imaging::ImageBackend) trait, pure-Rust backend |
//! | [`executor`] | Strength resolution and in-order plan execution |
//! | [`pipeline`] | Single-image triage and the parallel batch with `report.json` |
//! | [`scan`] | Recursive discovery of decodable images |
//! | [`config`] | `triage.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//! | [`types`] | Shared types: [`SharpnessLevel`](types::SharpnessLevel), [`ErrorKind`](types::ErrorKind) |
//!
//! # Design Decisions
//!
//! ## Configuration Over Constants
//!
//! Tone thresholds, the noise threshold, quality penalties and the
//! over-exposure cut-off all live in [`config::TriageConfig`] and are passed
//! into the components that need them. The blur rule table is a separate CSV
//! so line engineers can retune it without touching the TOML file.
//!
//! ## Fail Closed on Rule Tables
//!
//! A rule table with missing columns or unparseable bounds is rejected at
//! load time. Only rows naming an unknown level are skipped, so a table
//! carrying extra levels for other tools still loads.
//!
//! ## Pure-Rust Imaging
//!
//! All decoding, measurement and enhancement uses the `image` and
//! `imageproc` crates plus small in-crate kernels (non-local means, CLAHE,
//! CIE Lab). No system libraries are required, so the binary runs on the
//! line PCs as a single file.

pub mod config;
pub mod criteria;
pub mod executor;
pub mod image_handle;
pub mod imaging;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod planner;
pub mod scan;
pub mod types;
