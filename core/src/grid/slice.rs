use serde::{Deserialize, Serialize};

use crate::grid::compile::GainGrid;
use crate::math::angle::{AngleHelper, ANGLE_EPSILON};
use crate::prelude::{PatternError, PatternResult};

/// One defined point of a pattern cut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlicePoint {
    /// Azimuth for azimuth cuts, polar viewing angle for elevation cuts.
    pub angle: f64,
    pub gain: f64,
}

impl GainGrid {
    /// Theta index of the ring closest to an elevation above the horizon.
    pub fn theta_index_for_elevation(&self, elevation: f64) -> usize {
        AngleHelper::nearest_index(self.thetas(), 90.0 - elevation)
    }

    pub fn phi_index_for_azimuth(&self, azimuth: f64) -> usize {
        AngleHelper::nearest_index(self.phis(), azimuth)
    }

    /// Gains of one theta ring against azimuth, undefined cells dropped.
    pub fn azimuth_cut(&self, theta_idx: usize) -> PatternResult<Vec<SlicePoint>> {
        if theta_idx >= self.thetas().len() {
            return Err(PatternError::DataInconsistency(format!(
                "theta index {} outside axis of {}",
                theta_idx,
                self.thetas().len()
            )));
        }
        let ring = self.gains().row(theta_idx).to_owned();
        Ok(self
            .phis()
            .iter()
            .zip(ring.iter())
            .filter_map(|(&phi, cell)| cell.map(|gain| SlicePoint { angle: phi, gain }))
            .collect())
    }

    /// Full elevation sweep through the azimuth at `phi_idx`.
    ///
    /// The column at `phi_idx` covers one half-plane from zenith to nadir;
    /// the column at the opposite azimuth, reversed, supplies the other. Angles
    /// are measured like a polar plot: 90° is zenith, 0° the horizon on the
    /// requested side and 180° the horizon on the opposite side.
    pub fn elevation_cut(&self, phi_idx: usize) -> PatternResult<Vec<SlicePoint>> {
        let opposite = self.antipodal_index(phi_idx)?;
        let thetas = self.thetas();
        let gains = self.gains();

        let front = thetas.iter().enumerate().filter_map(|(row, &theta)| {
            gains[[row, phi_idx]].map(|gain| SlicePoint {
                angle: AngleHelper::normalize_azimuth(90.0 - theta),
                gain,
            })
        });
        let back = thetas.iter().enumerate().rev().filter_map(|(row, &theta)| {
            gains[[row, opposite]].map(|gain| SlicePoint {
                angle: AngleHelper::normalize_azimuth(90.0 + theta),
                gain,
            })
        });
        Ok(front.chain(back).collect())
    }

    /// Index of the azimuth 180° away from `phi_idx`.
    ///
    /// A closed axis (0° first, duplicate 360° column last) is treated as one
    /// entry shorter so the half-turn offset stays exact. The remaining
    /// azimuth count must be even.
    pub fn antipodal_index(&self, phi_idx: usize) -> PatternResult<usize> {
        let phis = self.phis();
        if phi_idx >= phis.len() {
            return Err(PatternError::DataInconsistency(format!(
                "phi index {} outside axis of {}",
                phi_idx,
                phis.len()
            )));
        }
        let closed = phis.len() > 1
            && phis[0].abs() <= ANGLE_EPSILON
            && (phis[phis.len() - 1] - 360.0).abs() <= ANGLE_EPSILON;
        let period = if closed { phis.len() - 1 } else { phis.len() };
        if period < 2 || period % 2 != 0 {
            return Err(PatternError::DataInconsistency(format!(
                "elevation cut needs an even number of distinct azimuths, got {}",
                period
            )));
        }
        let base = phi_idx % period;
        let opposite = (base + period / 2) % period;
        let separation = (phis[opposite] - phis[base]).abs();
        let tolerance = self.antipodal_tolerance();
        if (separation - 180.0).abs() >= tolerance {
            return Err(PatternError::DataInconsistency(format!(
                "azimuths {} and {} are not antipodal (tolerance {})",
                phis[phi_idx], phis[opposite], tolerance
            )));
        }
        Ok(opposite)
    }
}
