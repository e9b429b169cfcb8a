use anyhow::{ensure, Context};
use clap::ValueEnum;
use patterncore::math::decibel::DecibelHelper;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Text layout of a synthetic pattern file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticFormat {
    /// BASIC MININEC comma separated gain dump.
    Basic,
    /// Semicolon separated turntable measurement export.
    Measurement,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub frequency_mhz: f64,
    pub theta_step: f64,
    pub phi_step: f64,
    pub peak_gain_db: f64,
    /// Uniform jitter in dB added to every gain.
    pub noise_db: f64,
    /// Uniform jitter in degrees added to measured positions.
    pub position_jitter: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            frequency_mhz: 433.92,
            theta_step: 10.0,
            phi_step: 10.0,
            peak_gain_db: 2.15,
            noise_db: 0.5,
            position_jitter: 0.3,
            seed: 42,
        }
    }
}

/// Horizontal dipole along the x axis: nulls off the wire ends.
fn dipole_gain(peak_db: f64, theta: f64, phi: f64) -> f64 {
    let (theta, phi) = (theta.to_radians(), phi.to_radians());
    let along = theta.sin() * phi.cos();
    let power = (1.0 - along * along).max(0.0);
    peak_db + DecibelHelper::from_linear(power).max(-40.0)
}

fn jitter(rng: &mut StdRng, amount: f64) -> f64 {
    if amount > 0.0 {
        rng.gen_range(-amount..amount)
    } else {
        0.0
    }
}

fn steps(step: f64, end: f64) -> anyhow::Result<Vec<f64>> {
    ensure!(step > 0.0, "angle step must be positive, got {}", step);
    let count = (end / step).round() as usize;
    let last = (count as f64 * step).min(end);
    let mut values: Vec<f64> = (0..count).map(|i| i as f64 * step).collect();
    values.push(last);
    values.dedup();
    Ok(values)
}

pub fn generate(format: SyntheticFormat, config: &GeneratorConfig) -> anyhow::Result<String> {
    match format {
        SyntheticFormat::Basic => basic_dump(config),
        SyntheticFormat::Measurement => measurement_csv(config),
    }
}

/// Full-sphere dump with three channels per direction.
///
/// The dump format carries no frequency; readers assign their default one.
pub fn basic_dump(config: &GeneratorConfig) -> anyhow::Result<String> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let thetas = steps(config.theta_step, 180.0).context("theta axis")?;
    let phis = steps(config.phi_step, 360.0).context("phi axis")?;

    let mut out = String::from("ZENITH,AZIMUTH,VERTICAL,HORIZONTAL,TOTAL,D\n");
    for &theta in &thetas {
        for &phi in &phis {
            let total = dipole_gain(config.peak_gain_db, theta, phi) + jitter(&mut rng, config.noise_db);
            let horizontal = total - 0.2;
            let vertical = total - 20.0;
            writeln!(
                out,
                "{},{},{:.2},{:.2},{:.2}",
                theta, phi, vertical, horizontal, total
            )?;
        }
    }
    out.push('\n');
    Ok(out)
}

/// Turntable sweep per positioner angle, both polarizations, in dBm.
///
/// The turntable overshoots the full turn by one step, which a reader
/// wraps back onto the start of the circle.
pub fn measurement_csv(config: &GeneratorConfig) -> anyhow::Result<String> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let thetas = steps(config.theta_step, 180.0).context("positioner axis")?;
    let turns = steps(config.phi_step, 360.0 + config.phi_step).context("turntable axis")?;
    let khz = config.frequency_mhz * 1000.0;

    let mut out = String::from(
        "Messwert;Einheit Messwert;Position Drehscheibe;Position Positionierer;Polarisation;Messfrequenz\n",
    );
    for &theta in &thetas {
        for polarization in ["PH", "PV"] {
            for &phi in &turns {
                let azimuth = (phi + jitter(&mut rng, config.position_jitter)).max(0.0);
                let elevation = theta + jitter(&mut rng, config.position_jitter);
                let mut level = dipole_gain(config.peak_gain_db, theta, phi) - 30.0
                    + jitter(&mut rng, config.noise_db);
                if polarization == "PV" {
                    level -= 15.0;
                }
                let level = format!("{:.2}", level).replace('.', ",");
                writeln!(
                    out,
                    "{};dBm;{:.2};{:.2};{};{:.0}",
                    level,
                    azimuth,
                    elevation.clamp(0.0, 180.0),
                    polarization,
                    khz
                )?;
            }
        }
    }
    Ok(out)
}
