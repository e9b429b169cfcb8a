use serde::{Deserialize, Serialize};

use crate::grid::compile::GainGrid;
use crate::math::angle::AngleHelper;
use crate::math::stats::StatsHelper;
use crate::prelude::{PatternError, PatternResult};

/// Reference angles shared by the cuts of several grids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliceReference {
    pub theta_idx: usize,
    pub phi_idx: usize,
    pub theta: f64,
    pub phi: f64,
}

/// Figures derived across all grids of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    /// Largest gain over every grid; the common outer ring.
    pub max_gain: f64,
    /// Theta index of the maximum occurring most often across grids.
    pub common_theta_idx: usize,
    pub common_phi_idx: usize,
    pub frequencies: Vec<f64>,
}

impl PatternSummary {
    pub fn from_grids<'a, I>(grids: I) -> PatternResult<Self>
    where
        I: IntoIterator<Item = &'a GainGrid>,
    {
        let mut max_gain: Option<f64> = None;
        let mut theta_indices = Vec::new();
        let mut phi_indices = Vec::new();
        let mut frequencies = Vec::new();

        for grid in grids {
            let (theta_idx, phi_idx) = grid.max_location();
            theta_indices.push(theta_idx);
            phi_indices.push(phi_idx);
            max_gain = Some(max_gain.map_or(grid.max_gain(), |m| m.max(grid.max_gain())));
            let mhz = grid.frequency().mhz();
            if !frequencies.contains(&mhz) {
                frequencies.push(mhz);
            }
        }

        let max_gain =
            max_gain.ok_or_else(|| PatternError::EmptyPattern("no grids to summarize".into()))?;
        frequencies.sort_by(|a, b| a.total_cmp(b));

        Ok(Self {
            max_gain,
            common_theta_idx: StatsHelper::mode(&theta_indices).unwrap_or(0),
            common_phi_idx: StatsHelper::mode(&phi_indices).unwrap_or(0),
            frequencies,
        })
    }

    /// Cut reference on `grid`: the common maximum unless overridden.
    ///
    /// `elevation` is measured up from the horizon; both overrides snap to
    /// the nearest existing axis entry.
    pub fn reference(
        &self,
        grid: &GainGrid,
        azimuth: Option<f64>,
        elevation: Option<f64>,
    ) -> SliceReference {
        let last_theta = grid.thetas().len().saturating_sub(1);
        let last_phi = grid.phis().len().saturating_sub(1);
        let theta_idx = match elevation {
            Some(elevation) => AngleHelper::nearest_index(grid.thetas(), 90.0 - elevation),
            None => self.common_theta_idx.min(last_theta),
        };
        let phi_idx = match azimuth {
            Some(azimuth) => AngleHelper::nearest_index(grid.phis(), azimuth),
            None => self.common_phi_idx.min(last_phi),
        };
        SliceReference {
            theta_idx,
            phi_idx,
            theta: grid.thetas()[theta_idx],
            phi: grid.phis()[phi_idx],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{GainKey, Polarization};
    use ndarray::Array2;

    fn peaked(frequency: f64, peak: (usize, usize), level: f64) -> GainGrid {
        let thetas = [0.0, 45.0, 90.0, 135.0, 180.0];
        let phis = [0.0, 90.0, 180.0, 270.0];
        let mut gains = Array2::zeros((5, 4));
        gains[peak] = level;
        GainGrid::from_gains(
            GainKey::new(frequency, Polarization::Sum),
            gains.view(),
            &thetas,
            &phis,
        )
        .unwrap()
    }

    #[test]
    fn summary_uses_most_common_maximum() {
        let grids = vec![
            peaked(7.0, (2, 1), 3.0),
            peaked(7.1, (2, 1), 4.0),
            peaked(7.2, (3, 2), 9.0),
        ];
        let summary = PatternSummary::from_grids(&grids).unwrap();
        assert_eq!(summary.max_gain, 9.0);
        assert_eq!(summary.common_theta_idx, 2);
        assert_eq!(summary.common_phi_idx, 1);
        assert_eq!(summary.frequencies, vec![7.0, 7.1, 7.2]);
    }

    #[test]
    fn overrides_snap_to_nearest_axis_entry() {
        let grids = vec![peaked(7.0, (2, 1), 3.0)];
        let summary = PatternSummary::from_grids(&grids).unwrap();
        let reference = summary.reference(&grids[0], Some(170.0), Some(40.0));
        assert_eq!(reference.phi, 180.0);
        assert_eq!(reference.theta, 45.0);
        let default = summary.reference(&grids[0], None, None);
        assert_eq!((default.theta_idx, default.phi_idx), (2, 1));
    }

    #[test]
    fn empty_input_is_rejected() {
        let grids: Vec<GainGrid> = Vec::new();
        assert!(PatternSummary::from_grids(&grids).is_err());
    }
}
