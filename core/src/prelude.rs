use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::formats::PatternDataset;

/// Options consumed by the format parsers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParseOptions {
    /// Frequency in MHz assigned to dialects that carry none.
    pub default_frequency: f64,
    /// Measurement elevation angles are rounded to a multiple of this step.
    pub angle_granularity: f64,
    /// Added to measured turntable azimuth before wrapping into `[0, 360)`.
    pub turntable_offset: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_frequency: 0.0,
            angle_granularity: 1.0,
            turntable_offset: 0.0,
        }
    }
}

/// Frequency in MHz, totally ordered so it can key maps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frequency(pub f64);

impl Frequency {
    pub fn new(mhz: f64) -> Self {
        // folds -0.0 onto 0.0 so both compare equal under total_cmp
        Self(mhz + 0.0)
    }

    pub fn mhz(self) -> f64 {
        self.0
    }
}

impl PartialEq for Frequency {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frequency {}

impl PartialOrd for Frequency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frequency {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} MHz", self.0)
    }
}

/// Polarization channel of a gain record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Polarization {
    #[serde(rename = "H")]
    Horizontal,
    #[serde(rename = "V")]
    Vertical,
    #[serde(rename = "sum")]
    Sum,
}

impl Polarization {
    pub fn code(self) -> &'static str {
        match self {
            Polarization::Horizontal => "H",
            Polarization::Vertical => "V",
            Polarization::Sum => "sum",
        }
    }
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Polarization {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "H" | "h" => Ok(Polarization::Horizontal),
            "V" | "v" => Ok(Polarization::Vertical),
            "sum" | "SUM" | "Sum" | "total" => Ok(Polarization::Sum),
            other => Err(PatternError::DataInconsistency(format!(
                "unknown polarization code {:?}",
                other
            ))),
        }
    }
}

/// Identifies one independent sparse pattern / gain grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GainKey {
    pub frequency: Frequency,
    pub polarization: Polarization,
}

impl GainKey {
    pub fn new(frequency_mhz: f64, polarization: Polarization) -> Self {
        Self {
            frequency: Frequency::new(frequency_mhz),
            polarization,
        }
    }
}

impl fmt::Display for GainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.frequency, self.polarization)
    }
}

/// Common error type for parsing and grid operations.
#[derive(thiserror::Error, Debug)]
pub enum PatternError {
    #[error("format violation at line {line}: {message}")]
    FormatViolation { line: usize, message: String },
    #[error("data inconsistency: {0}")]
    DataInconsistency(String),
    #[error("empty pattern: {0}")]
    EmptyPattern(String),
    #[error("shape mismatch: matrix is {rows}x{cols}, axes are {thetas}x{phis}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        thetas: usize,
        phis: usize,
    },
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv failure: {0}")]
    Csv(#[from] csv::Error),
}

impl PatternError {
    pub fn format(line: usize, message: impl Into<String>) -> Self {
        PatternError::FormatViolation {
            line,
            message: message.into(),
        }
    }
}

pub type PatternResult<T> = Result<T, PatternError>;

/// What the driver loop should do after a line was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineControl {
    Continue,
    Stop,
}

/// Line-oriented state machine turning one text dialect into a dataset.
///
/// Lines must be fed in file order; parsers keep context between lines.
pub trait FormatParser {
    fn feed_line(&mut self, line_no: usize, line: &str) -> PatternResult<LineControl>;
    fn finish(&mut self) -> PatternResult<PatternDataset>;
}
