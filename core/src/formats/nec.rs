use std::collections::BTreeMap;
use std::mem;

use num_complex::Complex64;

use crate::formats::geometry::{
    segment_endpoints, Point3, SegmentLink, SegmentRecord, SegmentStitcher, STITCH_TOLERANCE,
};
use crate::formats::markers;
use crate::formats::{Dialect, PatternDataset};
use crate::math::angle::AngleHelper;
use crate::prelude::{
    FormatParser, Frequency, GainKey, LineControl, ParseOptions, PatternError, PatternResult,
    Polarization,
};
use crate::telemetry::LogManager;

pub const EXCITATION: &str = "Excitation";

/// Load kinds in the order of the `LD` card type field.
pub static LOAD_KINDS: [&str; 6] = [
    "Series RLC, absolute",
    "Parallel RLC, absolute",
    "Series RLC, per m",
    "Parallel RLC, per m",
    "Impedance",
    "Wire conductivity",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GainLayout {
    /// Comma separated, no frequency of its own.
    Basic,
    Mininec,
    Nec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Start,
    PulseGeometry,
    WireList,
    SegmentGeometry,
    Sources,
    Loads,
    AntennaInput,
    GainTable(GainLayout),
}

impl Section {
    fn name(self) -> &'static str {
        match self {
            Section::Start => "start",
            Section::PulseGeometry => "pulse-geometry",
            Section::WireList => "wire-list",
            Section::SegmentGeometry => "segment-geometry",
            Section::Sources => "sources",
            Section::Loads => "loads",
            Section::AntennaInput => "antenna-input",
            Section::GainTable(GainLayout::Basic) => "basic-gain",
            Section::GainTable(GainLayout::Mininec) => "mininec-gain",
            Section::GainTable(GainLayout::Nec) => "nec-gain",
        }
    }
}

/// Reader for the MININEC (BASIC and FORTRAN) and NEC2 listing family.
///
/// One state machine covers all of them: the marker lines of the dialects
/// do not overlap, and a single NEC2 listing mixes geometry, load, input
/// and pattern sections.
pub struct NecReader {
    options: ParseOptions,
    log: LogManager,
    section: Section,
    frequency: Option<Frequency>,
    dataset: PatternDataset,
    /// MININEC pulse number -> position.
    pulses: BTreeMap<i64, Point3>,
    /// NEC tag -> segment midpoints in segment order.
    tags: BTreeMap<i64, Vec<Point3>>,
    /// All NEC segment midpoints in absolute segment order.
    segments: Vec<Point3>,
    wires: Vec<Vec<Point3>>,
    stitcher: SegmentStitcher,
}

impl NecReader {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            log: LogManager::new("nec"),
            section: Section::Start,
            frequency: None,
            dataset: PatternDataset::new(Dialect::NecFamily),
            pulses: BTreeMap::new(),
            tags: BTreeMap::new(),
            segments: Vec::new(),
            wires: Vec::new(),
            stitcher: SegmentStitcher::new(),
        }
    }

    fn enter(&mut self, line_no: usize, next: Section) {
        if self.section != next {
            self.log.transition(line_no, self.section.name(), next.name());
        }
        self.section = next;
    }

    fn close_section(&mut self, line_no: usize) {
        self.dataset.metrics.record_section_end();
        self.enter(line_no, Section::Start);
    }

    fn current_frequency(&self) -> Frequency {
        self.frequency
            .unwrap_or_else(|| Frequency::new(self.options.default_frequency))
    }

    /// Opens the data block of one frequency; a repeated frequency replaces
    /// everything read for it before.
    fn begin_frequency(&mut self, line_no: usize, frequency: Frequency) {
        let seen = self.dataset.impedances.remove(&frequency).is_some()
            | self.remove_patterns(frequency);
        self.switch_frequency(line_no, frequency, seen);
    }

    /// Block opened by a gain header without a frequency line. Impedances
    /// stored under the default frequency before it belong to the same run.
    fn begin_implicit_frequency(&mut self, line_no: usize, frequency: Frequency) {
        let seen = self.remove_patterns(frequency);
        self.switch_frequency(line_no, frequency, seen);
    }

    fn switch_frequency(&mut self, line_no: usize, frequency: Frequency, seen: bool) {
        if seen {
            self.log.warn(
                line_no,
                &format!("frequency {} already present, using last occurrence", frequency),
            );
        }
        self.frequency = Some(frequency);
    }

    fn remove_patterns(&mut self, frequency: Frequency) -> bool {
        let before = self.dataset.patterns.len();
        self.dataset
            .patterns
            .retain(|key, _| key.frequency != frequency);
        before != self.dataset.patterns.len()
    }

    fn read_frequency(&mut self, line_no: usize, line: &str) -> PatternResult<()> {
        let (label, value) = line
            .split_once(|c: char| c == ':' || c == '=')
            .ok_or_else(|| PatternError::format(line_no, "frequency line without value"))?;
        let label = label.to_ascii_uppercase();
        if label.contains("HZ") && !label.contains("MHZ") {
            return Err(PatternError::format(
                line_no,
                format!("unsupported frequency unit in {:?}", line),
            ));
        }
        let mut tokens = value.split_whitespace();
        let mhz: f64 = tokens
            .next()
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| PatternError::format(line_no, format!("bad frequency in {:?}", line)))?;
        if let Some(unit) = tokens.next() {
            let unit = unit.to_ascii_uppercase();
            if unit.ends_with("HZ") && unit != "MHZ" {
                return Err(PatternError::format(
                    line_no,
                    format!("unsupported frequency unit {}", unit),
                ));
            }
        }
        self.begin_frequency(line_no, Frequency::new(mhz));
        Ok(())
    }

    fn read_impedance(&mut self, line_no: usize, line: &str) -> PatternResult<()> {
        let inner = line
            .split_once('(')
            .and_then(|(_, rest)| rest.split_once(')'))
            .map(|(inner, _)| inner.trim().trim_end_matches('J').trim())
            .ok_or_else(|| PatternError::format(line_no, "impedance without parentheses"))?;
        let parts: Vec<f64> = inner
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| PatternError::format(line_no, format!("bad impedance {:?}", inner)))?;
        if parts.len() != 2 {
            return Err(PatternError::format(
                line_no,
                format!("impedance needs two components, got {}", parts.len()),
            ));
        }
        self.store_impedance(Complex64::new(parts[0], parts[1]));
        Ok(())
    }

    fn store_impedance(&mut self, impedance: Complex64) {
        let frequency = self.current_frequency();
        self.dataset.impedances.insert(frequency, impedance);
    }

    fn read_antenna_input(&mut self, line_no: usize, line: &str) -> PatternResult<()> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 11 {
            return Err(PatternError::format(
                line_no,
                format!("antenna input row needs 11 fields, got {}", fields.len()),
            ));
        }
        let re = parse_field(line_no, fields[6])?;
        let im = parse_field(line_no, fields[7])?;
        self.store_impedance(Complex64::new(re, im));
        Ok(())
    }

    fn read_environment(&mut self, line_no: usize, line: &str) -> PatternResult<()> {
        let value = line.rsplit(':').next().unwrap_or_default().trim();
        let ground: i64 = value
            .parse()
            .map_err(|_| PatternError::format(line_no, format!("bad environment {:?}", value)))?;
        self.dataset.geometry.has_ground = ground < 0;
        Ok(())
    }

    fn read_data_card(&mut self, line_no: usize, line: &str) -> PatternResult<()> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let ints = |range: std::ops::Range<usize>| -> PatternResult<Vec<i64>> {
            fields
                .get(range)
                .ok_or_else(|| PatternError::format(line_no, "data card too short"))?
                .iter()
                .map(|field| {
                    field
                        .parse::<i64>()
                        .map_err(|_| PatternError::format(line_no, format!("bad card field {:?}", field)))
                })
                .collect()
        };
        match fields.get(4).copied() {
            Some("EX") => {
                let v = ints(5..8)?;
                let (kind, tag, n) = (v[0], v[1], v[2]);
                if kind == 0 || kind == 5 {
                    let point = self.segment_point(tag, n);
                    self.add_loaded(line_no, EXCITATION, point, tag, n);
                }
            }
            Some("LD") => {
                let v = ints(5..9)?;
                let (kind, tag, m, n) = (v[0], v[1], v[2], v[3]);
                let Some(name) = usize::try_from(kind).ok().and_then(|k| LOAD_KINDS.get(k).copied()) else {
                    self.log.warn(line_no, &format!("unknown load type {}", kind));
                    self.dataset.metrics.record_skipped();
                    return Ok(());
                };
                let count = self.tag_segments(tag).map_or(0, <[Point3]>::len) as i64;
                let (first, last) = if m == 0 {
                    (1, count)
                } else {
                    (m, if n == 0 { m } else { n })
                };
                for number in first..=last {
                    let point = self.segment_point(tag, number);
                    self.add_loaded(line_no, name, point, tag, number);
                }
            }
            Some("GN") => self.dataset.geometry.has_ground = true,
            _ => {}
        }
        Ok(())
    }

    fn tag_segments(&self, tag: i64) -> Option<&[Point3]> {
        if tag == 0 {
            Some(&self.segments)
        } else {
            self.tags.get(&tag).map(Vec::as_slice)
        }
    }

    /// Midpoint of segment `number` (1-based) of `tag`; tag 0 counts all segments.
    fn segment_point(&self, tag: i64, number: i64) -> Option<Point3> {
        let idx = usize::try_from(number.checked_sub(1)?).ok()?;
        self.tag_segments(tag)?.get(idx).copied()
    }

    fn add_loaded(&mut self, line_no: usize, name: &str, point: Option<Point3>, tag: i64, n: i64) {
        match point {
            Some(point) => self.dataset.geometry.add_loaded(name, point),
            None => {
                self.log.warn(
                    line_no,
                    &format!("{} references unknown segment {} of tag {}", name, n, tag),
                );
                self.dataset.metrics.record_skipped();
            }
        }
    }

    fn read_pulse_geometry(&mut self, line_no: usize, line: &str) -> PatternResult<()> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 7 {
            return Err(PatternError::format(
                line_no,
                format!("geometry row needs 7 fields, got {}", fields.len()),
            ));
        }
        let point = [
            parse_field(line_no, fields[0])?,
            parse_field(line_no, fields[1])?,
            parse_field(line_no, fields[2])?,
        ];
        let pulse: i64 = fields[6]
            .parse()
            .map_err(|_| PatternError::format(line_no, format!("bad pulse number {:?}", fields[6])))?;
        self.pulses.insert(pulse, point);
        if let Some(polyline) = self.dataset.geometry.polylines.last_mut() {
            polyline.push(point);
        }
        self.dataset.metrics.record_row();
        Ok(())
    }

    fn read_wire(&mut self, line_no: usize, line: &str) {
        let point: Option<Vec<f64>> = line
            .split_whitespace()
            .take(3)
            .map(|field| field.parse().ok())
            .collect();
        match point {
            Some(p) if p.len() == 3 => {
                if let Some(wire) = self.wires.last_mut() {
                    wire.push([p[0], p[1], p[2]]);
                }
                self.dataset.metrics.record_row();
            }
            _ => self.close_section(line_no),
        }
    }

    fn read_segment(&mut self, line_no: usize, line: &str) -> PatternResult<()> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 12 {
            return Err(PatternError::format(
                line_no,
                format!("segment row needs 12 fields, got {}", fields.len()),
            ));
        }
        let number: usize = fields[0]
            .parse()
            .map_err(|_| PatternError::format(line_no, format!("bad segment number {:?}", fields[0])))?;
        let mut values = [0.0; 6];
        for (value, field) in values.iter_mut().zip(&fields[1..7]) {
            *value = parse_field(line_no, field)?;
        }
        let [x, y, z, length, alpha, beta] = values;
        let prev: i64 = fields[8]
            .parse()
            .map_err(|_| PatternError::format(line_no, format!("bad connection {:?}", fields[8])))?;
        let tag: i64 = fields[fields.len() - 1]
            .parse()
            .map_err(|_| PatternError::format(line_no, "bad tag number"))?;

        let mid = [x, y, z];
        self.tags.entry(tag).or_default().push(mid);
        self.segments.push(mid);

        let (start, end) = segment_endpoints(mid, length, alpha, beta);
        let record = SegmentRecord {
            number,
            prev,
            start,
            end,
        };
        let link = self
            .stitcher
            .stitch(&mut self.dataset.geometry.polylines, &record)
            .map_err(|message| PatternError::format(line_no, message))?;
        if let SegmentLink::Shared { gap } = link {
            if gap > STITCH_TOLERANCE {
                self.log.warn(
                    line_no,
                    &format!("segment {} starts {:.4} m off its junction", number, gap),
                );
            }
        }
        self.dataset.metrics.record_row();
        Ok(())
    }

    /// `PULSE` row of a source or load table.
    fn read_pulse_row(&mut self, line_no: usize, line: &str, name: &str) -> PatternResult<()> {
        let (label, values) = line
            .split_once(':')
            .ok_or_else(|| PatternError::format(line_no, "pulse row without values"))?;
        let fields: Vec<&str> = values.split(',').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(PatternError::format(
                line_no,
                format!("pulse row needs 3 values, got {}", fields.len()),
            ));
        }
        let pulse: i64 = fields[0]
            .parse()
            .map_err(|_| PatternError::format(line_no, format!("bad pulse {:?}", fields[0])))?;
        let name = if name == EXCITATION {
            EXCITATION
        } else {
            match label.split_once(',').map(|(_, kind)| kind.trim()) {
                Some("RESISTANCE,REACTANCE") | None => "Impedance",
                Some(kind) => kind,
            }
        };
        let point = self.pulses.get(&pulse).copied();
        self.add_loaded(line_no, name, point, 0, pulse);
        Ok(())
    }

    fn open_gain_table(&mut self, line_no: usize, line: &str) -> bool {
        let layout = if markers::is_basic_gain(line) {
            GainLayout::Basic
        } else if markers::is_mininec_gain(line) {
            GainLayout::Mininec
        } else if markers::is_nec_gain(line) {
            GainLayout::Nec
        } else {
            return false;
        };
        if layout == GainLayout::Basic {
            self.begin_implicit_frequency(line_no, Frequency::new(self.options.default_frequency));
        }
        self.enter(line_no, Section::GainTable(layout));
        true
    }

    fn read_gain_row(&mut self, line_no: usize, line: &str, layout: GainLayout) {
        let fields: Vec<&str> = match layout {
            GainLayout::Basic => line.split(',').map(str::trim).collect(),
            _ => line.split_whitespace().collect(),
        };
        let values: Option<Vec<f64>> = if fields.len() >= 5 {
            fields[..5].iter().map(|field| field.parse().ok()).collect()
        } else {
            None
        };
        let Some(values) = values else {
            self.close_section(line_no);
            return;
        };
        let (theta, phi) = AngleHelper::fold_direction(values[0], values[1]);
        let frequency = self.current_frequency();
        for (polarization, gain) in [
            (Polarization::Vertical, values[2]),
            (Polarization::Horizontal, values[3]),
            (Polarization::Sum, values[4]),
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
    }
}

fn parse_field(line_no: usize, field: &str) -> PatternResult<f64> {
    field
        .parse()
        .map_err(|_| PatternError::format(line_no, format!("bad number {:?}", field)))
}

impl FormatParser for NecReader {
    fn feed_line(&mut self, line_no: usize, line: &str) -> PatternResult<LineControl> {
        self.dataset.metrics.record_line();
        let line = line.trim();

        if markers::is_mininec_geometry(line) {
            self.dataset.geometry.polylines.push(Vec::new());
            self.enter(line_no, Section::PulseGeometry);
            return Ok(LineControl::Continue);
        }
        if markers::is_wire_list(line) {
            self.wires.push(Vec::new());
            self.enter(line_no, Section::WireList);
            return Ok(LineControl::Continue);
        }
        if markers::is_nec_geometry(line) {
            self.stitcher = SegmentStitcher::new();
            self.enter(line_no, Section::SegmentGeometry);
            return Ok(LineControl::Continue);
        }
        if markers::is_sources(line) {
            self.enter(line_no, Section::Sources);
            return Ok(LineControl::Continue);
        }
        if markers::is_loads(line) {
            self.enter(line_no, Section::Loads);
            return Ok(LineControl::Continue);
        }
        if markers::is_environment(line) {
            self.read_environment(line_no, line)?;
            return Ok(LineControl::Continue);
        }
        if markers::is_data_card(line) {
            self.read_data_card(line_no, line)?;
            return Ok(LineControl::Continue);
        }
        if line.is_empty() {
            if self.section != Section::Start {
                self.close_section(line_no);
            }
            return Ok(LineControl::Continue);
        }

        match self.section {
            Section::PulseGeometry => {
                self.read_pulse_geometry(line_no, line)?;
                return Ok(LineControl::Continue);
            }
            Section::WireList => {
                self.read_wire(line_no, line);
                return Ok(LineControl::Continue);
            }
            Section::SegmentGeometry => {
                self.read_segment(line_no, line)?;
                return Ok(LineControl::Continue);
            }
            Section::Sources if markers::is_pulse_row(line) => {
                self.read_pulse_row(line_no, line, EXCITATION)?;
                return Ok(LineControl::Continue);
            }
            Section::Loads if markers::is_pulse_row(line) => {
                self.read_pulse_row(line_no, line, "load")?;
                return Ok(LineControl::Continue);
            }
            _ => {}
        }

        if markers::is_frequency(line) {
            self.read_frequency(line_no, line)?;
            self.enter(line_no, Section::Start);
            return Ok(LineControl::Continue);
        }
        if markers::is_impedance(line) {
            self.read_impedance(line_no, line)?;
            if matches!(self.section, Section::GainTable(_)) {
                self.enter(line_no, Section::Start);
            }
            return Ok(LineControl::Continue);
        }
        if markers::is_antenna_input(line) {
            self.enter(line_no, Section::AntennaInput);
            return Ok(LineControl::Continue);
        }
        if self.section == Section::AntennaInput && markers::starts_numeric(line) {
            self.read_antenna_input(line_no, line)?;
            self.enter(line_no, Section::Start);
            return Ok(LineControl::Continue);
        }
        if markers::is_dos_eof(line) {
            self.log.record(&format!("end-of-file byte at line {}", line_no));
            return Ok(LineControl::Stop);
        }

        match self.section {
            Section::AntennaInput => {}
            Section::GainTable(layout) => self.read_gain_row(line_no, line, layout),
            _ => {
                self.open_gain_table(line_no, line);
            }
        }
        Ok(LineControl::Continue)
    }

    fn finish(&mut self) -> PatternResult<PatternDataset> {
        let wires = mem::take(&mut self.wires);
        self.dataset.geometry.attach_wire_ends(&wires);
        self.log.record(&format!(
            "{} pattern(s), {} polyline(s), {} loaded group(s)",
            self.dataset.patterns.len(),
            self.dataset.geometry.polylines.len(),
            self.dataset.geometry.loaded.len()
        ));
        self.section = Section::Start;
        self.frequency = None;
        Ok(mem::replace(
            &mut self.dataset,
            PatternDataset::new(Dialect::NecFamily),
        ))
    }
}
