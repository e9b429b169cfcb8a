use std::mem;

use crate::formats::markers;
use crate::formats::{Dialect, PatternDataset};
use crate::math::angle::AngleHelper;
use crate::prelude::{
    FormatParser, Frequency, GainKey, LineControl, PatternError, PatternResult, Polarization,
};
use crate::telemetry::LogManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SliceKind {
    /// Fixed elevation, rows sweep azimuth.
    Azimuth,
    /// Fixed azimuth, rows sweep elevation.
    Elevation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Start,
    Slice {
        kind: SliceKind,
        angle: f64,
        header_seen: bool,
    },
}

/// Reader for EZNEC far field tables exported with "FF Tab".
///
/// A file holds one frequency and either azimuth or elevation slices,
/// never both.
pub struct EznecReader {
    log: LogManager,
    state: State,
    frequency: Option<Frequency>,
    slice_kind: Option<SliceKind>,
    dataset: PatternDataset,
}

impl EznecReader {
    pub fn new() -> Self {
        Self {
            log: LogManager::new("eznec"),
            state: State::Start,
            frequency: None,
            slice_kind: None,
            dataset: PatternDataset::new(Dialect::Eznec),
        }
    }

    fn read_frequency(&mut self, line_no: usize, line: &str) -> PatternResult<()> {
        if !line.ends_with("MHz") {
            return Err(PatternError::format(
                line_no,
                format!("unsupported frequency format {:?}", line),
            ));
        }
        let value = line
            .split_whitespace()
            .rev()
            .nth(1)
            .and_then(|token| token.parse::<f64>().ok())
            .ok_or_else(|| PatternError::format(line_no, format!("bad frequency in {:?}", line)))?;
        self.frequency = Some(Frequency::new(value));
        Ok(())
    }

    fn open_slice(&mut self, line_no: usize, line: &str) -> PatternResult<()> {
        let kind = if line.starts_with("Azimuth") {
            SliceKind::Azimuth
        } else if line.starts_with("Elevation") {
            SliceKind::Elevation
        } else {
            return Err(PatternError::format(
                line_no,
                format!("unsupported slice format {:?}", line),
            ));
        };
        if self.slice_kind.is_some_and(|seen| seen != kind) {
            return Err(PatternError::format(line_no, "slice format changes mid-file"));
        }
        self.slice_kind = Some(kind);

        let angle = line
            .split_once('=')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .and_then(|token| token.parse::<f64>().ok())
            .ok_or_else(|| PatternError::format(line_no, format!("slice without angle {:?}", line)))?;
        self.log.transition(line_no, "start", &format!("{:?} slice at {}", kind, angle));
        self.state = State::Slice {
            kind,
            angle,
            header_seen: false,
        };
        Ok(())
    }

    /// Reads one slice row; false when the row does not hold four numbers.
    fn read_row(
        &mut self,
        line_no: usize,
        line: &str,
        kind: SliceKind,
        angle: f64,
    ) -> PatternResult<bool> {
        let values: Option<Vec<f64>> = line
            .split_whitespace()
            .take(4)
            .map(|field| field.parse().ok())
            .collect();
        let Some(values) = values.filter(|v| v.len() == 4) else {
            return Ok(false);
        };
        let frequency = self
            .frequency
            .ok_or_else(|| PatternError::format(line_no, "slice data before any frequency"))?;

        let deg = values[0];
        let (theta, phi) = match kind {
            SliceKind::Azimuth => (90.0 - angle, AngleHelper::normalize_azimuth(deg)),
            SliceKind::Elevation => {
                if deg > 90.0 && deg < 270.0 {
                    self.dataset.metrics.record_skipped();
                    return Ok(true);
                }
                let elevation = if deg >= 270.0 { deg - 360.0 } else { deg };
                (90.0 - elevation, AngleHelper::normalize_azimuth(angle))
            }
        };
        let (theta, phi) = AngleHelper::fold_direction(theta, phi);
        for (polarization, gain) in [
            (Polarization::Vertical, values[1]),
            (Polarization::Horizontal, values[2]),
            (Polarization::Sum, values[3]),
        ] {
            self.dataset
                .patterns
                .entry(GainKey {
                    frequency,
                    polarization,
                })
                .or_default()
                .insert(theta, phi, gain);
        }
        self.dataset.metrics.record_row();
        Ok(true)
    }

    fn read_marker(&mut self, line_no: usize, line: &str) -> PatternResult<()> {
        if markers::is_eznec_frequency(line) {
            self.read_frequency(line_no, line)
        } else if markers::is_eznec_slice(line) {
            self.open_slice(line_no, line)
        } else {
            Ok(())
        }
    }

    fn end_slice(&mut self, line_no: usize) {
        self.dataset.metrics.record_section_end();
        self.log.transition(line_no, "slice", "start");
        self.state = State::Start;
    }
}

impl Default for EznecReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatParser for EznecReader {
    fn feed_line(&mut self, line_no: usize, line: &str) -> PatternResult<LineControl> {
        self.dataset.metrics.record_line();
        // decimal commas are common in localized exports
        let line = line.trim().replace(',', ".");

        match self.state {
            State::Start => self.read_marker(line_no, &line)?,
            State::Slice {
                kind,
                angle,
                header_seen: false,
            } => {
                if line.is_empty() {
                    return Ok(LineControl::Continue);
                }
                if !markers::is_eznec_columns(&line) {
                    return Err(PatternError::format(
                        line_no,
                        format!("expected column header, got {:?}", line),
                    ));
                }
                self.state = State::Slice {
                    kind,
                    angle,
                    header_seen: true,
                };
            }
            State::Slice { kind, angle, .. } => {
                if line.is_empty() || !self.read_row(line_no, &line, kind, angle)? {
                    self.end_slice(line_no);
                    // the line closing a slice may already open the next one
                    self.read_marker(line_no, &line)?;
                }
            }
        }
        Ok(LineControl::Continue)
    }

    fn finish(&mut self) -> PatternResult<PatternDataset> {
        self.log.record(&format!(
            "{} pattern(s) from {} slices",
            self.dataset.patterns.len(),
            match self.slice_kind {
                Some(SliceKind::Azimuth) => "azimuth",
                Some(SliceKind::Elevation) => "elevation",
                None => "no",
            }
        ));
        self.state = State::Start;
        Ok(mem::replace(&mut self.dataset, PatternDataset::new(Dialect::Eznec)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::run_parser;

    fn parse(text: &str) -> PatternResult<PatternDataset> {
        run_parser(&mut EznecReader::new(), text)
    }

    const AZIMUTH: &str = "\
Frequency = 14,2 MHz

Azimuth Pattern  Elevation angle = 10 deg.

Deg      V dB      H dB      Tot dB    V Pha     H Pha
0        -20,5     6,1       6,12      12        -3
90       -21       -3        -2,9      10        -2
370      -22       5         5,02      11        -4

Azimuth Pattern  Elevation angle = 30 deg.
Deg      V dB      H dB      Tot dB    V Pha     H Pha
0        -18       4         4,2       12        -3
";

    #[test]
    fn azimuth_slices_fill_three_channels() {
        let dataset = parse(AZIMUTH).unwrap();
        assert_eq!(dataset.patterns.len(), 3);
        let sum = &dataset.patterns[&GainKey::new(14.2, Polarization::Sum)];
        assert_eq!(sum.get(80.0, 0.0), Some(6.12));
        assert_eq!(sum.get(80.0, 10.0), Some(5.02));
        assert_eq!(sum.get(60.0, 0.0), Some(4.2));
        let h = &dataset.patterns[&GainKey::new(14.2, Polarization::Horizontal)];
        assert_eq!(h.get(80.0, 90.0), Some(-3.0));
    }

    #[test]
    fn elevation_slice_keeps_front_half_plane() {
        let text = "\
Frequency = 7.1 MHz
Elevation Pattern  Azimuth angle = 45 deg.
Deg      V dB      H dB      Tot dB    V Pha     H Pha
0        1         2         3         0         0
30       1         2         4         0         0
180      1         2         9         0         0
350      1         2         5         0         0
";
        let dataset = parse(text).unwrap();
        let sum = &dataset.patterns[&GainKey::new(7.1, Polarization::Sum)];
        assert_eq!(sum.len(), 3);
        assert_eq!(sum.get(90.0, 45.0), Some(3.0));
        assert_eq!(sum.get(60.0, 45.0), Some(4.0));
        assert_eq!(sum.get(100.0, 45.0), Some(5.0));
        assert_eq!(dataset.metrics.rows_skipped, 1);
    }

    #[test]
    fn slice_header_right_after_rows_opens_next_slice() {
        let text = "\
Frequency = 14.2 MHz
Azimuth Pattern  Elevation angle = 10 deg.
Deg      V dB      H dB      Tot dB    V Pha     H Pha
0        -20       6         6.1       0         0
90       -21       -3        -2.9      0         0
Azimuth Pattern  Elevation angle = 30 deg.
Deg      V dB      H dB      Tot dB    V Pha     H Pha
0        -18       4         4.2       0         0
";
        let dataset = parse(text).unwrap();
        let sum = &dataset.patterns[&GainKey::new(14.2, Polarization::Sum)];
        assert_eq!(sum.len(), 3);
        assert_eq!(sum.get(60.0, 0.0), Some(4.2));
        assert_eq!(dataset.metrics.sections_closed, 1);
    }

    #[test]
    fn non_mhz_frequency_is_rejected() {
        let err = parse("Frequency = 7100 kHz\n").unwrap_err();
        assert!(matches!(err, PatternError::FormatViolation { line: 1, .. }));
    }

    #[test]
    fn switching_slice_kind_is_rejected() {
        let text = "\
Frequency = 7.1 MHz
Azimuth Pattern  Elevation angle = 10 deg.
Deg      V dB      H dB      Tot dB    V Pha     H Pha

Elevation Pattern  Azimuth angle = 0 deg.
";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, PatternError::FormatViolation { line: 5, .. }));
    }

    #[test]
    fn missing_column_header_is_rejected() {
        let text = "Frequency = 7.1 MHz\nAzimuth Pattern  Elevation angle = 10 deg.\n0 1 2 3 0 0\n";
        assert!(parse(text).is_err());
    }
}
