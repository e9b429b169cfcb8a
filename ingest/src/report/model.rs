use std::collections::BTreeMap;

use patterncore::formats::{Dialect, Point3};
use patterncore::grid::{GainGrid, PatternSummary, SlicePoint, SliceReference};
use patterncore::telemetry::ParseMetrics;
use patterncore::VswrSweep;
use serde::Serialize;

/// Dense copy of one compiled grid, undefined cells as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct GridModel {
    pub thetas: Vec<f64>,
    pub phis: Vec<f64>,
    pub gains: Vec<Vec<Option<f64>>>,
}

impl GridModel {
    pub fn from_grid(grid: &GainGrid) -> Self {
        Self {
            thetas: grid.thetas().to_vec(),
            phis: grid.phis().to_vec(),
            gains: grid
                .gains()
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelModel {
    pub frequency: f64,
    pub polarization: String,
    pub theta_count: usize,
    pub phi_count: usize,
    pub max_gain: f64,
    pub theta_at_max: f64,
    pub phi_at_max: f64,
    pub reference: SliceReference,
    pub azimuth_cut: Vec<SlicePoint>,
    /// Radii of the azimuth cut against the file-wide maximum.
    pub azimuth_radii: Vec<f64>,
    /// Absent when the grid holds a single azimuth.
    pub elevation_cut: Option<Vec<SlicePoint>>,
    pub elevation_radii: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridModel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeometryModel {
    pub structures: Vec<Vec<Vec<Point3>>>,
    pub loaded: BTreeMap<String, Vec<Point3>>,
    pub has_ground: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub source: String,
    pub dialect: Dialect,
    pub level_unit: Option<String>,
    pub scaling: String,
    pub metrics: ParseMetrics,
    pub summary: PatternSummary,
    pub channels: Vec<ChannelModel>,
    pub vswr: Option<VswrSweep>,
    pub best_match_frequency: Option<f64>,
    pub geometry: Option<GeometryModel>,
}

#[cfg(test)]
impl PatternReport {
    pub fn channel(&self, frequency: f64, polarization: &str) -> Option<&ChannelModel> {
        self.channels
            .iter()
            .find(|c| c.frequency == frequency && c.polarization == polarization)
    }
}
