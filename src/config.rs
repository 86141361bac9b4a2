//! Triage configuration module.
//!
//! Handles loading, validating, and merging `triage.toml`. Stock defaults are
//! serialized to a TOML table and the user file is merged on top of it, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [metrics]
//! overexposure_threshold = 250   # Luminance (1-255) counted as clipped
//!
//! [criteria]
//! rules = "sharpness_criteria.csv"  # Rule table; omit for the built-in table
//!
//! [planner]
//! bright_low = 0.35              # Below: gamma increase
//! bright_high = 0.65             # Above: gamma decrease
//! contrast_low = 0.25            # Below: local contrast (CLAHE)
//! noise_high = 0.5               # Above: denoise before sharpening
//!
//! [planner.penalties]
//! clear = 1.0
//! slight_blur = 0.95
//! moderate_blur = 0.75
//! heavy_blur = 0.4
//!
//! [processing]
//! max_processes = 4              # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::metrics::DEFAULT_OVEREXPOSURE_THRESHOLD;
use crate::types::{ErrorKind, SharpnessLevel};

/// Conventional config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "triage.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Io(_) => ErrorKind::Io,
            ConfigError::Toml(_) | ConfigError::Serialize(_) => ErrorKind::Config,
            ConfigError::Validation(_) => ErrorKind::Validation,
        }
    }
}

/// Triage configuration loaded from `triage.toml`.
///
/// All fields have defaults matching the stock decision table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriageConfig {
    /// Metric extraction settings.
    pub metrics: MetricsConfig,
    /// Sharpness rule table location.
    pub criteria: CriteriaConfig,
    /// Decision thresholds and quality penalties.
    pub planner: PlannerConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl TriageConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.overexposure_threshold == 0 {
            return Err(ConfigError::Validation(
                "metrics.overexposure_threshold must be 1-255".into(),
            ));
        }
        self.planner.validate()
    }
}

/// Metric extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Luminance at or above which a pixel counts as over-exposed.
    pub overexposure_threshold: u8,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            overexposure_threshold: DEFAULT_OVEREXPOSURE_THRESHOLD,
        }
    }
}

/// Where the sharpness rule table comes from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CriteriaConfig {
    /// Path to a rule table CSV. `None` selects the built-in table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<PathBuf>,
}

/// Thresholds for the enhancement decision table.
///
/// The brightness and contrast thresholds apply to proxies clamped to
/// `[0, 1]`; `noise_high` applies to the raw noise variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    pub bright_low: f64,
    pub bright_high: f64,
    pub contrast_low: f64,
    pub noise_high: f64,
    pub penalties: PenaltyConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            bright_low: 0.35,
            bright_high: 0.65,
            contrast_low: 0.25,
            noise_high: 0.5,
            penalties: PenaltyConfig::default(),
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("bright_low", self.bright_low),
            ("bright_high", self.bright_high),
            ("contrast_low", self.contrast_low),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "planner.{name} must be within 0-1, got {value}"
                )));
            }
        }
        if self.bright_low > self.bright_high {
            return Err(ConfigError::Validation(format!(
                "planner.bright_low ({}) must not exceed planner.bright_high ({})",
                self.bright_low, self.bright_high
            )));
        }
        if !self.noise_high.is_finite() || self.noise_high < 0.0 {
            return Err(ConfigError::Validation(format!(
                "planner.noise_high must be a non-negative number, got {}",
                self.noise_high
            )));
        }
        self.penalties.validate()
    }
}

/// Quality penalty reported with each plan, per severity level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PenaltyConfig {
    pub clear: f64,
    pub slight_blur: f64,
    pub moderate_blur: f64,
    pub heavy_blur: f64,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            clear: 1.0,
            slight_blur: 0.95,
            moderate_blur: 0.75,
            heavy_blur: 0.4,
        }
    }
}

impl PenaltyConfig {
    pub fn for_level(&self, level: SharpnessLevel) -> f64 {
        match level {
            SharpnessLevel::Clear => self.clear,
            SharpnessLevel::SlightBlur => self.slight_blur,
            SharpnessLevel::ModerateBlur => self.moderate_blur,
            SharpnessLevel::HeavyBlur => self.heavy_blur,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for level in SharpnessLevel::ALL {
            let value = self.for_level(level);
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Validation(format!(
                    "planner.penalties for {level} must be within (0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(TriageConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<TriageConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: TriageConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is absent.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<TriageConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `triage.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Quality Triage Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Metric extraction
# ---------------------------------------------------------------------------
[metrics]
# Luminance (1-255) at or above which a pixel counts as over-exposed.
overexposure_threshold = 250

# ---------------------------------------------------------------------------
# Sharpness rule table
# ---------------------------------------------------------------------------
[criteria]
# CSV with columns Sharpness_Level, Lower_Bound, Upper_Bound[, Description].
# Omit to use the built-in table (print it with `quality-triage gen-rules`).
# rules = "sharpness_criteria.csv"

# ---------------------------------------------------------------------------
# Enhancement planner
# ---------------------------------------------------------------------------
[planner]
# Brightness proxy = 1 - illumination_uniformity, clamped to [0, 1].
# Below bright_low a gamma increase is planned, above bright_high a gamma
# decrease. Both apply out = 255 * (v / 255)^(1 / gamma), with gamma < 1 for
# an increase and gamma > 1 for a decrease.
bright_low = 0.35
bright_high = 0.65

# Contrast proxy = illumination_uniformity, clamped to [0, 1].
# Below contrast_low local contrast enhancement (CLAHE) is applied.
contrast_low = 0.25

# Noise variance above which blurred images are denoised first.
noise_high = 0.5

# Quality penalty reported with each plan (0 < penalty <= 1).
[planner.penalties]
clear = 1.0
slight_blur = 0.95
moderate_blur = 0.75
heavy_blur = 0.4

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image workers for `batch`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
