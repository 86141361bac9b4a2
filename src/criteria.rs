//! Sharpness rule engine.
//!
//! A rule table maps sharpness scores to [`SharpnessLevel`]s through labelled
//! closed intervals. Tables are CSV files with the columns:
//!
//! ```text
//! Sharpness_Level,Lower_Bound,Upper_Bound,Description
//! Clear,25,inf,Crisp paint texture
//! Slight_Blur,15,25,
//! Moderate_Blur,8,15,
//! Heavy_Blur,0,8,Unusable frame
//! ```
//!
//! `Description` is optional and rows may appear in any order. Loading is
//! strict: a missing column, a bound that is not a number, or an interval with
//! `lower > upper` rejects the whole table. Rows whose level name is not
//! recognised are skipped so newer tables stay readable.
//!
//! After loading, rules are ordered by interval width and then lower bound.
//! [`SharpnessCriteria::classify`] returns the first rule containing the score,
//! so overlapping intervals resolve to the narrowest one. Scores outside every
//! interval classify as [`SharpnessLevel::HeavyBlur`].

use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

use crate::types::{ErrorKind, SharpnessLevel};

const COL_LEVEL: &str = "Sharpness_Level";
const COL_LOWER: &str = "Lower_Bound";
const COL_UPPER: &str = "Upper_Bound";
const COL_DESCRIPTION: &str = "Description";
const REQUIRED_COLUMNS: [&str; 3] = [COL_LEVEL, COL_LOWER, COL_UPPER];

#[derive(Error, Debug)]
pub enum CriteriaError {
    #[error("Sharpness criteria table not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read sharpness criteria {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed sharpness criteria table: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required columns in sharpness criteria: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("Invalid bounds in sharpness criteria row {row}: lower={lower:?}, upper={upper:?}")]
    InvalidBounds {
        row: u64,
        lower: String,
        upper: String,
    },
}

impl CriteriaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CriteriaError::NotFound(_) | CriteriaError::MissingColumns(_) => ErrorKind::Config,
            CriteriaError::Io { .. } => ErrorKind::Io,
            CriteriaError::Csv(_) | CriteriaError::InvalidBounds { .. } => ErrorKind::Validation,
        }
    }
}

/// One labelled sharpness interval, inclusive at both ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharpnessRule {
    pub level: SharpnessLevel,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub description: String,
}

impl SharpnessRule {
    pub fn new(level: SharpnessLevel, lower_bound: f64, upper_bound: f64) -> Self {
        Self {
            level,
            lower_bound,
            upper_bound,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn width(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }

    pub fn contains(&self, score: f64) -> bool {
        self.lower_bound <= score && score <= self.upper_bound
    }

    /// Narrowest first, then lowest.
    fn precedence(&self, other: &Self) -> Ordering {
        self.width()
            .total_cmp(&other.width())
            .then(self.lower_bound.total_cmp(&other.lower_bound))
    }
}

/// An immutable, precedence-ordered set of sharpness rules.
#[derive(Debug, Clone, PartialEq)]
pub struct SharpnessCriteria {
    rules: Vec<SharpnessRule>,
}

impl SharpnessCriteria {
    /// Build criteria from rules in any order.
    pub fn from_rules(mut rules: Vec<SharpnessRule>) -> Self {
        rules.sort_by(SharpnessRule::precedence);
        Self { rules }
    }

    /// The built-in rule table, used when no table is configured.
    pub fn stock() -> Self {
        Self::from_rules(vec![
            SharpnessRule::new(SharpnessLevel::Clear, 25.0, f64::INFINITY)
                .with_description("Fine texture resolved; no sharpening needed"),
            SharpnessRule::new(SharpnessLevel::SlightBlur, 15.0, 25.0)
                .with_description("Soft edges; light sharpening"),
            SharpnessRule::new(SharpnessLevel::ModerateBlur, 8.0, 15.0)
                .with_description("Visible blur; deblur and sharpen"),
            SharpnessRule::new(SharpnessLevel::HeavyBlur, 0.0, 8.0)
                .with_description("Detail lost; flag as low quality"),
        ])
    }

    /// Load a rule table from a CSV file.
    pub fn load(path: &Path) -> Result<Self, CriteriaError> {
        if !path.exists() {
            return Err(CriteriaError::NotFound(path.to_path_buf()));
        }
        let file = fs::File::open(path).map_err(|source| CriteriaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let criteria = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            rules = criteria.rules.len(),
            "loaded sharpness criteria"
        );
        Ok(criteria)
    }

    /// Parse a rule table from any CSV source.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CriteriaError> {
        let mut table = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = table
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let column = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| column(name).is_none())
            .map(|name| name.to_string())
            .collect();
        let (Some(level_col), Some(lower_col), Some(upper_col)) =
            (column(COL_LEVEL), column(COL_LOWER), column(COL_UPPER))
        else {
            return Err(CriteriaError::MissingColumns(missing));
        };
        let description_col = column(COL_DESCRIPTION);

        let mut rules = Vec::new();
        for (index, record) in table.records().enumerate() {
            let record = record?;
            // Header is line 1.
            let row = record
                .position()
                .map(|p| p.line())
                .unwrap_or(index as u64 + 2);
            let field = |col: usize| record.get(col).unwrap_or("");

            let label = field(level_col);
            let level = match label.parse::<SharpnessLevel>() {
                Ok(level) => level,
                Err(_) => {
                    debug!(row, label, "skipping rule with unrecognised sharpness level");
                    continue;
                }
            };

            let (lower, upper) = (field(lower_col), field(upper_col));
            let invalid = || CriteriaError::InvalidBounds {
                row,
                lower: lower.to_string(),
                upper: upper.to_string(),
            };
            let (Ok(lower_bound), Ok(upper_bound)) = (lower.parse::<f64>(), upper.parse::<f64>())
            else {
                return Err(invalid());
            };
            if lower_bound.is_nan() || upper_bound.is_nan() || lower_bound > upper_bound {
                return Err(invalid());
            }

            let description = description_col.map(field).unwrap_or("").to_string();
            rules.push(SharpnessRule {
                level,
                lower_bound,
                upper_bound,
                description,
            });
        }

        Ok(Self::from_rules(rules))
    }

    /// Rules in precedence order.
    pub fn rules(&self) -> &[SharpnessRule] {
        &self.rules
    }

    /// Level of the narrowest rule containing `score`, or `HeavyBlur`.
    ///
    /// Total over all inputs; `NaN` matches no rule.
    pub fn classify(&self, score: f64) -> SharpnessLevel {
        let level = self
            .rules
            .iter()
            .find(|rule| rule.contains(score))
            .map(|rule| rule.level)
            .unwrap_or(SharpnessLevel::HeavyBlur);
        trace!(score, %level, "classified sharpness");
        level
    }
}

impl Default for SharpnessCriteria {
    fn default() -> Self {
        Self::stock()
    }
}

/// Returns the stock rule table as CSV text.
///
/// Used by the `gen-rules` CLI command.
pub fn stock_criteria_csv() -> &'static str {
    "Sharpness_Level,Lower_Bound,Upper_Bound,Description
Clear,25,inf,Fine texture resolved; no sharpening needed
Slight_Blur,15,25,Soft edges; light sharpening
Moderate_Blur,8,15,Visible blur; deblur and sharpen
Heavy_Blur,0,8,Detail lost; flag as low quality
"
}
