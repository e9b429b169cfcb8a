use std::collections::BTreeMap;

use ndarray::Array2;
use patterncore::grid::{GainGrid, GainPattern, PatternSummary};
use patterncore::prelude::{GainKey, ParseOptions, Polarization};
use patterncore::transform::{add_sum_channels, turntable_to_spherical, AzimuthResampler};
use patterncore::{parse_str, Dialect};

fn basic_dump(cell: (u32, u32), level: f64) -> String {
    let mut text = String::from("ZENITH,AZIMUTH,VERTICAL,HORIZONTAL,TOTAL,D\n");
    for theta in (0..=180).step_by(10) {
        for phi in (0..=360).step_by(10) {
            let total = if (theta, phi) == cell { level } else { 0.0 };
            text.push_str(&format!("{},{},-30,-30,{}\n", theta, phi, total));
        }
    }
    text.push('\n');
    text
}

#[test]
fn basic_dump_peak_lands_on_its_cell() {
    let dataset = parse_str(&basic_dump((90, 180), 5.0), &ParseOptions::default()).unwrap();
    assert_eq!(dataset.dialect, Dialect::NecFamily);
    let grids = dataset.compile().unwrap();
    let grid = &grids[&GainKey::new(0.0, Polarization::Sum)];
    assert_eq!(grid.shape(), (19, 37));
    assert_eq!(grid.max_gain(), 5.0);
    assert_eq!(grid.max_location(), (9, 18));
    let (row, col) = grid.max_location();
    assert_eq!(grid.gain(row, col), Some(grid.max_gain()));
}

#[test]
fn default_frequency_applies_without_frequency_line() {
    let options = ParseOptions {
        default_frequency: 145.0,
        ..ParseOptions::default()
    };
    let dataset = parse_str(&basic_dump((90, 0), 1.0), &options).unwrap();
    assert!(dataset
        .patterns
        .contains_key(&GainKey::new(145.0, Polarization::Sum)));
}

#[test]
fn sum_channel_from_h_and_v() {
    let mut patterns = BTreeMap::new();
    let mut h = GainPattern::new();
    h.insert(90.0, 0.0, 3.0);
    let mut v = GainPattern::new();
    v.insert(90.0, 0.0, 4.0);
    patterns.insert(GainKey::new(7.0, Polarization::Horizontal), h);
    patterns.insert(GainKey::new(7.0, Polarization::Vertical), v);

    assert_eq!(add_sum_channels(&mut patterns).unwrap(), 1);
    let sum = patterns[&GainKey::new(7.0, Polarization::Sum)]
        .get(90.0, 0.0)
        .unwrap();
    let expected = 10.0 * (10f64.powf(0.3) + 10f64.powf(0.4)).log10();
    assert!((sum - expected).abs() < 1e-12);
    assert!((sum - 6.02).abs() < 0.01);
}

#[test]
fn measured_azimuth_past_full_turn_wraps() {
    let text = "\
Messwert;Einheit Messwert;Position Drehscheibe;Position Positionierer;Polarisation;Messfrequenz
-50;dBm;0;90;PH;868000
-42;dBm;370;90;PH;868000
-47;dBm;180;90;PH;868000
";
    let dataset = parse_str(text, &ParseOptions::default()).unwrap();
    assert_eq!(dataset.dialect, Dialect::CsvMeasurement);
    let grids = dataset.compile().unwrap();
    let grid = &grids[&GainKey::new(868.0, Polarization::Horizontal)];
    assert_eq!(grid.phis(), &[0.0, 10.0, 180.0]);
    assert_eq!(grid.phi_at_max(), 10.0);
}

#[test]
fn flat_pole_takes_azimuth_from_next_ring() {
    let thetas = [0.0, 30.0, 60.0];
    let phis = [0.0, 90.0, 180.0, 270.0];
    let mut gains = Array2::from_elem((3, 4), 0.0);
    for col in 0..4 {
        gains[[0, col]] = 6.0;
    }
    gains[[1, 2]] = 4.0;
    let grid = GainGrid::from_gains(
        GainKey::new(7.0, Polarization::Sum),
        gains.view(),
        &thetas,
        &phis,
    )
    .unwrap();
    assert_eq!(grid.theta_at_max(), 0.0);
    assert_eq!(grid.phi_at_max(), 180.0);
}

#[test]
fn opposite_cuts_are_half_a_turn_apart() {
    let options = ParseOptions {
        default_frequency: 14.2,
        ..ParseOptions::default()
    };
    let dataset = parse_str(&basic_dump((90, 90), 3.0), &options).unwrap();
    let grids = dataset.compile().unwrap();
    let grid = &grids[&GainKey::new(14.2, Polarization::Sum)];
    let n = grid.phis().len() - 1;
    for i in 0..n {
        let j = grid.antipodal_index(i).unwrap();
        assert_eq!(j, (i + n / 2) % n);
        let delta = (grid.phis()[j] - grid.phis()[i]).abs();
        assert!((delta - 180.0).abs() <= grid.antipodal_tolerance());
    }
    let cut = grid.elevation_cut(9).unwrap();
    assert_eq!(cut.len(), 38);
}

#[test]
fn turntable_measurement_becomes_seamless_sphere() {
    let mut text = String::from(
        "Messwert;Einheit Messwert;Position Drehscheibe;Position Positionierer;Polarisation;Messfrequenz\n",
    );
    for positioner in (0..=180).step_by(45) {
        for turntable in (0..=330).step_by(30) {
            let level = -40.0 - (turntable as f64 - 180.0).abs() / 10.0 - positioner as f64 / 20.0;
            text.push_str(&format!(
                "{};dBm;{};{};PV;433920\n",
                level, turntable, positioner
            ));
        }
    }
    let dataset = parse_str(&text, &ParseOptions::default()).unwrap();
    let resampler = AzimuthResampler::new(1.0).unwrap();
    let key = GainKey::new(433.92, Polarization::Vertical);
    let resampled = resampler.resample(&dataset.patterns[&key]);
    let grid = GainGrid::compile(key, &resampled).unwrap();
    assert_eq!(grid.phis().len(), 360);

    let sphere = turntable_to_spherical(&grid).unwrap();
    assert_eq!(sphere.phis().last().copied(), Some(360.0));
    let last = sphere.phis().len() - 1;
    for row in 0..sphere.thetas().len() {
        assert_eq!(sphere.gain(row, 0), sphere.gain(row, last));
    }
    assert_eq!(sphere.thetas().len(), 181);
}

#[test]
fn eznec_table_feeds_summary() {
    let text = "\
Frequency = 14.2 MHz

Azimuth Pattern  Elevation angle = 20 deg.

Deg      V dB      H dB      Tot dB    V Pha     H Pha
0        -30       5         5.01      0         0
90       -30       -10       -9.9      0         0
180      -30       4         4.02      0         0
270      -30       -10       -9.9      0         0
";
    let dataset = parse_str(text, &ParseOptions::default()).unwrap();
    assert_eq!(dataset.dialect, Dialect::Eznec);
    let grids = dataset.compile().unwrap();
    let summary = PatternSummary::from_grids(grids.values()).unwrap();
    assert_eq!(summary.max_gain, 5.01);
    assert_eq!(summary.frequencies, vec![14.2]);
    let grid = &grids[&GainKey::new(14.2, Polarization::Sum)];
    let reference = summary.reference(grid, None, None);
    assert_eq!(reference.theta, 70.0);
    assert_eq!(grid.azimuth_cut(reference.theta_idx).unwrap().len(), 4);
}
