/// Axis values closer than this are treated as the same angle.
pub const ANGLE_EPSILON: f64 = 1e-9;

pub struct AngleHelper;

impl AngleHelper {
    /// Wraps an azimuth into `[0, 360)`.
    pub fn normalize_azimuth(phi: f64) -> f64 {
        phi.rem_euclid(360.0) + 0.0
    }

    /// Brings a direction into theta `[0, 180]`, phi `[0, 360]`.
    ///
    /// A theta beyond either pole is mirrored back and the azimuth turned by
    /// 180°. Phi is only wrapped when outside `[0, 360]` so that closed
    /// simulator axes keep their 360° column.
    pub fn fold_direction(theta: f64, phi: f64) -> (f64, f64) {
        let mut theta = theta.rem_euclid(360.0);
        let mut phi = phi;
        if theta > 180.0 {
            theta = 360.0 - theta;
            phi += 180.0;
        }
        if !(0.0..=360.0).contains(&phi) {
            phi = Self::normalize_azimuth(phi);
        }
        (theta + 0.0, phi + 0.0)
    }

    /// Rounds to the nearest multiple of `granularity`, halves away from zero.
    pub fn round_to(value: f64, granularity: f64) -> f64 {
        if granularity <= 0.0 {
            return value;
        }
        (value / granularity).round() * granularity + 0.0
    }

    /// Index of the entry of a sorted axis nearest to `target`.
    ///
    /// Only the two entries straddling the target are compared; on a tie
    /// the lower one wins.
    pub fn nearest_index(axis: &[f64], target: f64) -> usize {
        if axis.is_empty() {
            return 0;
        }
        let idx = axis.partition_point(|&a| a <= target).min(axis.len() - 1);
        if idx == 0 {
            return 0;
        }
        if (axis[idx] - target).abs() < (axis[idx - 1] - target).abs() {
            idx
        } else {
            idx - 1
        }
    }

    /// Exact-value position of `value` on a sorted axis, within [`ANGLE_EPSILON`].
    pub fn position(axis: &[f64], value: f64) -> Option<usize> {
        let idx = axis.partition_point(|&a| a < value - ANGLE_EPSILON);
        match axis.get(idx) {
            Some(&a) if (a - value).abs() <= ANGLE_EPSILON => Some(idx),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn azimuth_wraps_past_full_turn() {
        assert_eq!(AngleHelper::normalize_azimuth(370.0), 10.0);
        assert_eq!(AngleHelper::normalize_azimuth(-10.0), 350.0);
        assert_eq!(AngleHelper::normalize_azimuth(360.0), 0.0);
    }

    #[test]
    fn fold_keeps_closed_axis_and_mirrors_theta() {
        assert_eq!(AngleHelper::fold_direction(90.0, 360.0), (90.0, 360.0));
        assert_eq!(AngleHelper::fold_direction(-30.0, 10.0), (30.0, 190.0));
        assert_eq!(AngleHelper::fold_direction(200.0, 270.0), (160.0, 90.0));
    }

    #[test]
    fn rounding_goes_half_away_from_zero() {
        assert_eq!(AngleHelper::round_to(10.5, 1.0), 11.0);
        assert_eq!(AngleHelper::round_to(-10.5, 1.0), -11.0);
        assert_eq!(AngleHelper::round_to(14.9, 10.0), 10.0);
        assert_eq!(AngleHelper::round_to(15.0, 10.0), 20.0);
        assert_eq!(AngleHelper::round_to(3.3, 0.0), 3.3);
    }

    #[test]
    fn nearest_index_picks_closer_neighbour() {
        let axis = [0.0, 10.0, 20.0, 30.0];
        assert_eq!(AngleHelper::nearest_index(&axis, -5.0), 0);
        assert_eq!(AngleHelper::nearest_index(&axis, 14.0), 1);
        assert_eq!(AngleHelper::nearest_index(&axis, 16.0), 2);
        assert_eq!(AngleHelper::nearest_index(&axis, 99.0), 3);
    }

    #[test]
    fn position_requires_matching_value() {
        let axis = [0.0, 1.5, 7.0];
        assert_eq!(AngleHelper::position(&axis, 1.5), Some(1));
        assert_eq!(AngleHelper::position(&axis, 2.0), None);
    }
}
