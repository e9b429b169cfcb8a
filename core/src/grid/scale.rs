use serde::{Deserialize, Serialize};

use crate::grid::slice::SlicePoint;
use crate::prelude::{PatternError, PatternResult};

/// Radial scaling applied to gains relative to a reference maximum.
///
/// The reference is passed explicitly so that several frequencies can share
/// one outer ring.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Scaling {
    /// Radius shrinks by a factor 0.89 every 2 dB.
    #[default]
    Arrl,
    /// Linear in power.
    Linear,
    /// Linear in field strength.
    LinearVoltage,
    /// Linear in dB down to `min_db` below the maximum.
    LinearDb { min_db: f64 },
}

impl Scaling {
    pub fn linear_db(min_db: f64) -> PatternResult<Self> {
        if min_db >= 0.0 {
            return Err(PatternError::DataInconsistency(format!(
                "linear dB floor must be negative, got {}",
                min_db
            )));
        }
        Ok(Scaling::LinearDb { min_db })
    }

    pub fn title(&self) -> &'static str {
        match self {
            Scaling::Arrl => "ARRL",
            Scaling::Linear => "Linear scale",
            Scaling::LinearVoltage => "Linear voltage",
            Scaling::LinearDb { .. } => "Linear dB",
        }
    }

    /// Radius in `[0, 1]` for a gain `gain` dB against `max_gain`.
    pub fn scale(&self, max_gain: f64, gain: f64) -> f64 {
        let rel = gain - max_gain;
        match *self {
            Scaling::Arrl => (1.0f64 / 0.89).powf(rel / 2.0),
            Scaling::Linear => 10f64.powf(rel / 10.0),
            Scaling::LinearVoltage => 10f64.powf(rel / 20.0),
            Scaling::LinearDb { min_db } => (rel.max(min_db) - min_db) / -min_db,
        }
    }

    /// Relative dB for a radius produced by [`Scaling::scale`].
    pub fn invscale(&self, radius: f64) -> f64 {
        match *self {
            Scaling::Arrl => radius.ln() / (1.0f64 / 0.89).ln() * 2.0,
            Scaling::Linear => 10.0 * radius.log10(),
            Scaling::LinearVoltage => 20.0 * radius.log10(),
            Scaling::LinearDb { min_db } => radius * -min_db + min_db,
        }
    }

    pub fn scale_points(&self, max_gain: f64, points: &[SlicePoint]) -> Vec<f64> {
        points
            .iter()
            .map(|point| self.scale(max_gain, point.gain))
            .collect()
    }
}
