use log::{debug, info};
use ndarray::Array2;

use crate::grid::compile::GainGrid;
use crate::math::angle::{AngleHelper, ANGLE_EPSILON};
use crate::prelude::{PatternError, PatternResult};

/// Source of one column of the re-indexed grid.
#[derive(Debug, Clone, Copy)]
struct ColumnSource {
    phi: f64,
    ring: usize,
    reflected: bool,
}

/// Re-indexes a turntable measurement so the positioner axis becomes the
/// polar axis.
///
/// Old azimuths in `[0, 180]` become the new theta axis. Old theta rings
/// become new azimuths: each ring supplies a column at its own angle and,
/// reflected through the complementary azimuth `360 - theta`, a column half
/// a turn further on. A missing 360° column is appended as a copy of the 0°
/// column.
///
/// The input must already be resampled to a uniform azimuth step covering
/// the circle (see [`AzimuthResampler`](crate::transform::AzimuthResampler));
/// cells without a matching source stay undefined.
pub fn turntable_to_spherical(grid: &GainGrid) -> PatternResult<GainGrid> {
    let old_thetas = grid.thetas();
    let old_phis = grid.phis();
    if old_thetas
        .iter()
        .any(|&theta| !(-ANGLE_EPSILON..=180.0 + ANGLE_EPSILON).contains(&theta))
    {
        return Err(PatternError::DataInconsistency(format!(
            "positioner angles of {} leave [0, 180]",
            grid.key()
        )));
    }

    let new_thetas: Vec<f64> = old_phis
        .iter()
        .copied()
        .filter(|&phi| (0.0..=180.0 + ANGLE_EPSILON).contains(&phi))
        .collect();
    if new_thetas.is_empty() {
        return Err(PatternError::DataInconsistency(format!(
            "no turntable azimuth of {} lies in [0, 180]",
            grid.key()
        )));
    }

    let columns = column_sources(old_thetas);
    let mut gains = Array2::from_elem((new_thetas.len(), columns.len()), None);
    for (row, &theta) in new_thetas.iter().enumerate() {
        for (col, source) in columns.iter().enumerate() {
            let old_phi = if source.reflected {
                AngleHelper::normalize_azimuth(360.0 - theta)
            } else {
                theta
            };
            if let Some(old_col) = lookup_azimuth(old_phis, old_phi) {
                gains[[row, col]] = grid.gain(source.ring, old_col);
            }
        }
    }

    let new_phis: Vec<f64> = columns.iter().map(|source| source.phi).collect();
    debug!(
        "turntable re-index of {}: {}x{} -> {}x{}",
        grid.key(),
        old_thetas.len(),
        old_phis.len(),
        new_thetas.len(),
        new_phis.len()
    );
    let transformed = GainGrid::from_matrix(grid.key(), new_thetas, new_phis, gains)?;
    info!(
        "turntable grid {} now peaks at theta {} phi {}",
        transformed.key(),
        transformed.theta_at_max(),
        transformed.phi_at_max()
    );
    Ok(transformed)
}

fn column_sources(old_thetas: &[f64]) -> Vec<ColumnSource> {
    let mut columns: Vec<ColumnSource> = old_thetas
        .iter()
        .enumerate()
        .map(|(ring, &theta)| ColumnSource {
            phi: theta,
            ring,
            reflected: false,
        })
        .collect();

    // Without a literal 180° ring the reflected 0° ring fills that column.
    let first_half_end = columns.last().map_or(0.0, |c| c.phi);
    for (ring, &theta) in old_thetas.iter().enumerate() {
        let phi = theta + 180.0;
        if phi > first_half_end + ANGLE_EPSILON && phi < 360.0 - ANGLE_EPSILON {
            columns.push(ColumnSource {
                phi,
                ring,
                reflected: true,
            });
        }
    }

    if let (Some(first), Some(last)) = (columns.first().copied(), columns.last()) {
        if first.phi.abs() <= ANGLE_EPSILON && last.phi < 360.0 - ANGLE_EPSILON {
            columns.push(ColumnSource { phi: 360.0, ..first });
        }
    }
    columns
}

/// Old azimuth column for `phi`, treating 0° and 360° as the same direction.
fn lookup_azimuth(axis: &[f64], phi: f64) -> Option<usize> {
    AngleHelper::position(axis, phi).or_else(|| {
        if phi.abs() <= ANGLE_EPSILON {
            AngleHelper::position(axis, 360.0)
        } else if (phi - 360.0).abs() <= ANGLE_EPSILON {
            AngleHelper::position(axis, 0.0)
        } else {
            None
        }
    })
}
