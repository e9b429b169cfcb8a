pub mod eznec;
pub mod geometry;
pub mod markers;
pub mod measurement;
pub mod nec;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use log::info;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::grid::compile::GainGrid;
use crate::grid::pattern::GainPattern;
use crate::prelude::{
    FormatParser, Frequency, GainKey, LineControl, ParseOptions, PatternResult,
};
use crate::telemetry::ParseMetrics;

pub use eznec::EznecReader;
pub use geometry::{Geometry, Point3, SegmentLink, SegmentStitcher};
pub use measurement::CsvMeasurementReader;
pub use nec::NecReader;

/// Text dialect of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// BASIC/FORTRAN MININEC and NEC2 listings.
    NecFamily,
    /// EZNEC far field table ("FF Tab").
    Eznec,
    /// Semicolon separated turntable measurement export.
    CsvMeasurement,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::NecFamily => "nec",
            Dialect::Eznec => "eznec",
            Dialect::CsvMeasurement => "csv-measurement",
        };
        f.write_str(name)
    }
}

/// Everything read from one file.
#[derive(Debug, Clone)]
pub struct PatternDataset {
    pub dialect: Dialect,
    pub patterns: BTreeMap<GainKey, GainPattern>,
    pub impedances: BTreeMap<Frequency, Complex64>,
    pub geometry: Geometry,
    pub metrics: ParseMetrics,
    /// Level unit named by the source (e.g. `dBm`), when it names one.
    pub level_unit: Option<String>,
}

impl PatternDataset {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            patterns: BTreeMap::new(),
            impedances: BTreeMap::new(),
            geometry: Geometry::default(),
            metrics: ParseMetrics::new(),
            level_unit: None,
        }
    }

    pub fn frequencies(&self) -> Vec<Frequency> {
        let mut frequencies: Vec<Frequency> =
            self.patterns.keys().map(|key| key.frequency).collect();
        frequencies.dedup();
        frequencies
    }

    /// Compiles every sparse pattern into its grid.
    pub fn compile(&self) -> PatternResult<BTreeMap<GainKey, GainGrid>> {
        self.patterns
            .iter()
            .map(|(key, pattern)| Ok((*key, GainGrid::compile(*key, pattern)?)))
            .collect()
    }
}

/// Guesses the dialect from marker lines.
pub fn detect_dialect(text: &str) -> Dialect {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    if let Some(first) = lines.clone().next() {
        if measurement::is_measurement_header(first) {
            return Dialect::CsvMeasurement;
        }
    }
    let eznec = lines.any(|line| {
        markers::is_eznec_columns(line)
            || line.starts_with("Azimuth Pattern")
            || line.starts_with("Elevation Pattern")
    });
    if eznec {
        Dialect::Eznec
    } else {
        Dialect::NecFamily
    }
}

pub fn parser_for(dialect: Dialect, options: &ParseOptions) -> Box<dyn FormatParser> {
    match dialect {
        Dialect::NecFamily => Box::new(NecReader::new(options.clone())),
        Dialect::Eznec => Box::new(EznecReader::new()),
        Dialect::CsvMeasurement => Box::new(CsvMeasurementReader::new(options.clone())),
    }
}

/// Feeds `text` line by line into `parser`, honouring early stops.
pub fn run_parser(parser: &mut dyn FormatParser, text: &str) -> PatternResult<PatternDataset> {
    for (idx, line) in text.lines().enumerate() {
        if parser.feed_line(idx + 1, line)? == LineControl::Stop {
            break;
        }
    }
    parser.finish()
}

pub fn parse_str(text: &str, options: &ParseOptions) -> PatternResult<PatternDataset> {
    let dialect = detect_dialect(text);
    let mut parser = parser_for(dialect, options);
    let dataset = run_parser(parser.as_mut(), text)?;
    info!(
        "parsed {} input: {} pattern(s), {} impedance(s), {} lines",
        dialect,
        dataset.patterns.len(),
        dataset.impedances.len(),
        dataset.metrics.lines_read
    );
    Ok(dataset)
}

/// Reads and parses a file; invalid UTF-8 is replaced rather than rejected.
pub fn parse_file<P: AsRef<Path>>(path: P, options: &ParseOptions) -> PatternResult<PatternDataset> {
    let bytes = fs::read(path.as_ref())?;
    let text = String::from_utf8_lossy(&bytes);
    parse_str(&text, options)
}
