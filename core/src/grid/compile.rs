use log::info;
use ndarray::{Array2, ArrayView2};

use crate::grid::pattern::GainPattern;
use crate::math::matrix::MatrixHelper;
use crate::math::stats::StatsHelper;
use crate::prelude::{Frequency, GainKey, PatternError, PatternResult, Polarization};

/// Share of the widest phi step accepted as deviation from a true antipode.
pub const ANTIPODAL_TOLERANCE_FRACTION: f64 = 0.5;

/// Dense theta x phi gain matrix for one frequency/polarization.
///
/// Cells never measured or simulated hold `None`. The axes are sorted and
/// free of duplicates; `gains.dim() == (thetas.len(), phis.len())` always
/// holds. Values are immutable once built; transforms produce new grids.
#[derive(Debug, Clone, PartialEq)]
pub struct GainGrid {
    key: GainKey,
    thetas: Vec<f64>,
    phis: Vec<f64>,
    gains: Array2<Option<f64>>,
    max_gain: f64,
    theta_max_idx: usize,
    phi_max_idx: usize,
    theta_gap: f64,
    phi_gap: f64,
}

impl GainGrid {
    /// Compiles a sparse pattern into a dense grid.
    pub fn compile(key: GainKey, pattern: &GainPattern) -> PatternResult<Self> {
        if pattern.is_empty() {
            return Err(PatternError::EmptyPattern(format!("no samples for {}", key)));
        }

        let mut thetas: Vec<f64> = pattern.iter().map(|(angle, _)| angle.theta()).collect();
        let mut phis: Vec<f64> = pattern.iter().map(|(angle, _)| angle.phi()).collect();
        sort_axis(&mut thetas);
        sort_axis(&mut phis);

        let mut gains = Array2::from_elem((thetas.len(), phis.len()), None);
        for (angle, gain) in pattern.iter() {
            let row = exact_position(&thetas, angle.theta());
            let col = exact_position(&phis, angle.phi());
            match (row, col) {
                (Some(row), Some(col)) => gains[[row, col]] = Some(gain),
                _ => {
                    return Err(PatternError::DataInconsistency(format!(
                        "sample ({}, {}) missing from compiled axes",
                        angle.theta(),
                        angle.phi()
                    )))
                }
            }
        }

        let grid = Self::from_matrix(key, thetas, phis, gains)?;
        info!(
            "compiled {} -> {}x{} grid, max {:.2} dB at theta {} phi {}",
            key,
            grid.thetas.len(),
            grid.phis.len(),
            grid.max_gain,
            grid.theta_at_max(),
            grid.phi_at_max()
        );
        Ok(grid)
    }

    /// Builds a grid from an existing dense matrix; NaN cells become undefined.
    pub fn from_gains(
        key: GainKey,
        gains: ArrayView2<f64>,
        thetas: &[f64],
        phis: &[f64],
    ) -> PatternResult<Self> {
        Self::from_matrix(
            key,
            thetas.to_vec(),
            phis.to_vec(),
            MatrixHelper::from_dense(gains),
        )
    }

    /// Validates axes against the matrix and derives maximum and gaps.
    pub fn from_matrix(
        key: GainKey,
        thetas: Vec<f64>,
        phis: Vec<f64>,
        gains: Array2<Option<f64>>,
    ) -> PatternResult<Self> {
        let (rows, cols) = gains.dim();
        if rows != thetas.len() || cols != phis.len() {
            return Err(PatternError::ShapeMismatch {
                rows,
                cols,
                thetas: thetas.len(),
                phis: phis.len(),
            });
        }
        if !strictly_increasing(&thetas) || !strictly_increasing(&phis) {
            return Err(PatternError::DataInconsistency(format!(
                "axes of {} are not strictly increasing",
                key
            )));
        }

        let ((theta_max_idx, mut phi_max_idx), max_gain) = MatrixHelper::argmax(gains.view())
            .ok_or_else(|| PatternError::EmptyPattern(format!("no defined gain for {}", key)))?;

        // All phi cells of a pole ring describe the same direction, so the
        // azimuth of the maximum is taken from the neighbouring ring.
        if rows > 1 {
            let ring = if thetas[theta_max_idx] == 0.0 {
                Some(1)
            } else if thetas[theta_max_idx] == 180.0 {
                Some(rows - 2)
            } else {
                None
            };
            if let Some(idx) = ring.and_then(|row| MatrixHelper::row_argmax(gains.row(row))) {
                phi_max_idx = idx;
            }
        }

        let theta_gap = StatsHelper::max_gap(&thetas);
        let phi_gap = StatsHelper::max_gap(&phis);

        Ok(Self {
            key,
            thetas,
            phis,
            gains,
            max_gain,
            theta_max_idx,
            phi_max_idx,
            theta_gap,
            phi_gap,
        })
    }

    pub fn key(&self) -> GainKey {
        self.key
    }

    pub fn frequency(&self) -> Frequency {
        self.key.frequency
    }

    pub fn polarization(&self) -> Polarization {
        self.key.polarization
    }

    pub fn thetas(&self) -> &[f64] {
        &self.thetas
    }

    pub fn phis(&self) -> &[f64] {
        &self.phis
    }

    pub fn gains(&self) -> ArrayView2<'_, Option<f64>> {
        self.gains.view()
    }

    pub fn gain(&self, theta_idx: usize, phi_idx: usize) -> Option<f64> {
        self.gains.get((theta_idx, phi_idx)).copied().flatten()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.gains.dim()
    }

    pub fn max_gain(&self) -> f64 {
        self.max_gain
    }

    /// (theta index, phi index) of the maximum, pole tie-break applied.
    pub fn max_location(&self) -> (usize, usize) {
        (self.theta_max_idx, self.phi_max_idx)
    }

    pub fn theta_at_max(&self) -> f64 {
        self.thetas[self.theta_max_idx]
    }

    pub fn phi_at_max(&self) -> f64 {
        self.phis[self.phi_max_idx]
    }

    pub fn theta_gap(&self) -> f64 {
        self.theta_gap
    }

    pub fn phi_gap(&self) -> f64 {
        self.phi_gap
    }

    pub fn antipodal_tolerance(&self) -> f64 {
        (self.phi_gap * ANTIPODAL_TOLERANCE_FRACTION).max(1e-9)
    }

    /// Copy of the matrix with undefined cells as NaN.
    pub fn to_dense(&self) -> Array2<f64> {
        self.gains.mapv(|cell| cell.unwrap_or(f64::NAN))
    }
}

fn sort_axis(axis: &mut Vec<f64>) {
    axis.sort_by(|a, b| a.total_cmp(b));
    axis.dedup_by(|a, b| a.total_cmp(b).is_eq());
}

fn exact_position(axis: &[f64], value: f64) -> Option<usize> {
    axis.binary_search_by(|probe| probe.total_cmp(&value)).ok()
}

fn strictly_increasing(axis: &[f64]) -> bool {
    axis.windows(2).all(|pair| pair[0] < pair[1])
}
