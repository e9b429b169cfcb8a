use std::mem;

use csv::{ReaderBuilder, StringRecord};

use crate::formats::{Dialect, PatternDataset};
use crate::math::angle::AngleHelper;
use crate::math::decibel::DecibelHelper;
use crate::prelude::{
    FormatParser, GainKey, LineControl, ParseOptions, PatternError, PatternResult, Polarization,
};
use crate::telemetry::LogManager;

const GAIN_COLUMNS: [&str; 3] = ["Messwert", "eirp", "EIRP"];
const UNIT_COLUMNS: [&str; 2] = ["Einheit Messwert", "Unit"];
const AZIMUTH_COLUMNS: [&str; 2] = ["Position Drehscheibe", "Position Turntable"];
const ELEVATION_COLUMNS: [&str; 2] = ["Position Positionierer", "Position Positioner"];
const POLARIZATION_COLUMNS: [&str; 2] = ["Polarisation", "Polarization"];
const FREQUENCY_COLUMNS: [&str; 2] = ["Messfrequenz", "Frequency"];

/// Whether `line` is the header of a turntable measurement export.
pub fn is_measurement_header(line: &str) -> bool {
    line.contains(';')
        && line
            .split(';')
            .any(|field| AZIMUTH_COLUMNS.contains(&field.trim()))
}

/// Positions of the used columns in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    gain: usize,
    unit: Option<usize>,
    azimuth: usize,
    elevation: usize,
    polarization: usize,
    frequency: usize,
}

impl Columns {
    fn from_header(line_no: usize, header: &StringRecord) -> PatternResult<Self> {
        let find = |aliases: &[&str]| {
            header
                .iter()
                .position(|name| aliases.contains(&name.trim()))
        };
        let require = |aliases: &[&str]| {
            find(aliases).ok_or_else(|| {
                PatternError::format(line_no, format!("missing column, expected one of {:?}", aliases))
            })
        };
        Ok(Self {
            gain: require(&GAIN_COLUMNS)?,
            unit: find(&UNIT_COLUMNS),
            azimuth: require(&AZIMUTH_COLUMNS)?,
            elevation: require(&ELEVATION_COLUMNS)?,
            polarization: require(&POLARIZATION_COLUMNS)?,
            frequency: require(&FREQUENCY_COLUMNS)?,
        })
    }
}

/// Level unit as found in the file, and how values in it become dB.
#[derive(Debug, Clone, PartialEq)]
enum LevelUnit {
    Decibel(String),
    /// Linear power; the string names the resulting dB unit.
    Linear(String),
}

impl LevelUnit {
    fn parse(unit: &str) -> Self {
        match unit.trim() {
            "W" => LevelUnit::Linear("dBW".into()),
            "mW" => LevelUnit::Linear("dBm".into()),
            "lin" | "linear" => LevelUnit::Linear("dB".into()),
            other => LevelUnit::Decibel(other.to_string()),
        }
    }

    fn to_db(&self, value: f64) -> f64 {
        match self {
            LevelUnit::Decibel(_) => value,
            LevelUnit::Linear(_) => DecibelHelper::from_linear(value),
        }
    }

    fn db_name(&self) -> &str {
        match self {
            LevelUnit::Decibel(name) | LevelUnit::Linear(name) => name,
        }
    }
}

/// One accepted measurement row.
struct Sample {
    key: GainKey,
    theta: f64,
    phi: f64,
    gain: f64,
}

/// Reader for semicolon separated turntable measurement exports.
///
/// The positioner angle is used as theta and rounded to the configured
/// granularity; the turntable angle is shifted by the configured offset and
/// wrapped into `[0, 360)`. Frequencies are given in kHz.
///
/// Lines are collected until the first blank line after the header and
/// read as one table when parsing finishes. A row that does not parse ends
/// the table.
pub struct CsvMeasurementReader {
    options: ParseOptions,
    log: LogManager,
    header_line: Option<usize>,
    table: String,
    complete: bool,
    dataset: PatternDataset,
}

impl CsvMeasurementReader {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            log: LogManager::new("csv"),
            header_line: None,
            table: String::new(),
            complete: false,
            dataset: PatternDataset::new(Dialect::CsvMeasurement),
        }
    }

    fn sample(&mut self, columns: &Columns, record: &StringRecord) -> Option<Sample> {
        let number = |idx: usize| -> Option<f64> {
            record.get(idx)?.trim().replace(',', ".").parse().ok()
        };
        let raw_gain = number(columns.gain)?;
        let raw_azimuth = number(columns.azimuth)?;
        let raw_elevation = number(columns.elevation)?;
        let khz = number(columns.frequency)?;
        let code = record.get(columns.polarization)?.trim();
        let polarization: Polarization = code.strip_prefix('P').unwrap_or(code).parse().ok()?;

        let unit = columns
            .unit
            .and_then(|idx| record.get(idx))
            .map(LevelUnit::parse)
            .unwrap_or_else(|| LevelUnit::Decibel("dB".into()));
        if self.dataset.level_unit.is_none() {
            self.dataset.level_unit = Some(unit.db_name().to_string());
        }

        Some(Sample {
            key: GainKey::new(khz / 1000.0, polarization),
            theta: AngleHelper::round_to(raw_elevation, self.options.angle_granularity),
            phi: AngleHelper::normalize_azimuth(raw_azimuth + self.options.turntable_offset),
            gain: unit.to_db(raw_gain),
        })
    }

    fn read_table(&mut self, header_line: usize, table: &str) -> PatternResult<()> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(table.as_bytes());
        let columns = Columns::from_header(header_line, reader.headers()?)?;
        self.log.transition(header_line, "header", "rows");

        let mut record = StringRecord::new();
        while reader.read_record(&mut record)? {
            let line_no = record
                .position()
                .map_or(header_line, |pos| header_line + pos.line() as usize - 1);
            let Some(sample) = self.sample(&columns, &record) else {
                self.log.transition(line_no, "rows", "done");
                break;
            };
            if !(0.0..=360.0).contains(&sample.theta) || !(0.0..=360.0).contains(&sample.phi) {
                self.log.warn(
                    line_no,
                    &format!("angle ({}, {}) outside [0, 360], row skipped", sample.theta, sample.phi),
                );
                self.dataset.metrics.record_skipped();
                continue;
            }
            self.dataset
                .patterns
                .entry(sample.key)
                .or_default()
                .insert(sample.theta, sample.phi, sample.gain);
            self.dataset.metrics.record_row();
        }
        self.dataset.metrics.record_section_end();
        Ok(())
    }
}

impl FormatParser for CsvMeasurementReader {
    fn feed_line(&mut self, line_no: usize, line: &str) -> PatternResult<LineControl> {
        if self.complete {
            return Ok(LineControl::Stop);
        }
        self.dataset.metrics.record_line();
        let line = line.trim();
        if line.is_empty() {
            if self.header_line.is_some() {
                self.complete = true;
                return Ok(LineControl::Stop);
            }
            return Ok(LineControl::Continue);
        }
        self.header_line.get_or_insert(line_no);
        self.table.push_str(line);
        self.table.push('\n');
        Ok(LineControl::Continue)
    }

    fn finish(&mut self) -> PatternResult<PatternDataset> {
        let table = mem::take(&mut self.table);
        self.complete = false;
        if let Some(header_line) = self.header_line.take() {
            self.read_table(header_line, &table)?;
        }
        self.log.record(&format!(
            "{} measured channel(s), {} rows, level unit {}",
            self.dataset.patterns.len(),
            self.dataset.metrics.rows_accepted,
            self.dataset.level_unit.as_deref().unwrap_or("unknown")
        ));
        Ok(mem::replace(
            &mut self.dataset,
            PatternDataset::new(Dialect::CsvMeasurement),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::run_parser;

    const HEADER: &str =
        "Messwert;Einheit Messwert;Position Drehscheibe;Position Positionierer;Polarisation;Messfrequenz";

    fn parse(text: &str, options: ParseOptions) -> PatternResult<PatternDataset> {
        run_parser(&mut CsvMeasurementReader::new(options), text)
    }

    #[test]
    fn azimuth_past_full_turn_is_wrapped() {
        let text = format!("{}\n-40,5;dBm;370;10.1;PH;433920\n-41;dBm;20;9.8;PV;433920\n", HEADER);
        let dataset = parse(&text, ParseOptions::default()).unwrap();
        let h = &dataset.patterns[&GainKey::new(433.92, Polarization::Horizontal)];
        assert_eq!(h.get(10.0, 10.0), Some(-40.5));
        let v = &dataset.patterns[&GainKey::new(433.92, Polarization::Vertical)];
        assert_eq!(v.get(10.0, 20.0), Some(-41.0));
        assert_eq!(dataset.level_unit.as_deref(), Some("dBm"));
    }

    #[test]
    fn english_aliases_and_turntable_offset() {
        let text = "eirp;Position Turntable;Position Positioner;Polarization;Frequency\n3;350;45;PH;868000\n";
        let options = ParseOptions {
            turntable_offset: 20.0,
            angle_granularity: 10.0,
            ..ParseOptions::default()
        };
        let dataset = parse(text, options).unwrap();
        let h = &dataset.patterns[&GainKey::new(868.0, Polarization::Horizontal)];
        assert_eq!(h.get(50.0, 10.0), Some(3.0));
    }

    #[test]
    fn linear_levels_use_the_floor() {
        let text = format!("{}\n0;mW;0;0;PH;1000\n100;mW;10;0;PH;1000\n", HEADER);
        let dataset = parse(&text, ParseOptions::default()).unwrap();
        let h = &dataset.patterns[&GainKey::new(1.0, Polarization::Horizontal)];
        assert_eq!(h.get(0.0, 0.0), Some(DecibelHelper::from_linear(0.0)));
        assert_eq!(h.get(0.0, 0.0), Some(-999.0));
        assert!((h.get(0.0, 10.0).unwrap() - 20.0).abs() < 1e-12);
        assert_eq!(dataset.level_unit.as_deref(), Some("dBm"));
    }

    #[test]
    fn out_of_range_elevation_is_skipped() {
        let text = format!("{}\n1;dBm;0;-5;PH;1000\n2;dBm;0;5;PH;1000\n", HEADER);
        let dataset = parse(&text, ParseOptions::default()).unwrap();
        assert_eq!(dataset.metrics.rows_skipped, 1);
        assert_eq!(dataset.metrics.rows_accepted, 1);
    }

    #[test]
    fn malformed_row_ends_the_table() {
        let text = format!("{}\n1;dBm;0;5;PH;1000\nsum of rows;;;;;\n2;dBm;10;5;PH;1000\n", HEADER);
        let dataset = parse(&text, ParseOptions::default()).unwrap();
        assert_eq!(dataset.metrics.rows_accepted, 1);
        assert_eq!(dataset.metrics.sections_closed, 1);
    }

    #[test]
    fn header_without_frequency_is_a_format_violation() {
        let text = "Messwert;Position Drehscheibe;Position Positionierer;Polarisation\n";
        assert!(matches!(
            parse(text, ParseOptions::default()),
            Err(PatternError::FormatViolation { line: 1, .. })
        ));
    }
}
