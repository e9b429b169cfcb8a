/// Level assigned to non-positive linear values, which have no logarithm.
///
/// Arbitrary sentinel kept for compatibility with existing pattern files;
/// it carries no physical meaning.
pub const LINEAR_FLOOR_DB: f64 = -999.0;

pub struct DecibelHelper;

impl DecibelHelper {
    /// Converts a linear power ratio to dB, substituting [`LINEAR_FLOOR_DB`]
    /// when the value is not strictly positive.
    pub fn from_linear(value: f64) -> f64 {
        if value > 0.0 {
            10.0 * value.log10()
        } else {
            LINEAR_FLOOR_DB
        }
    }

    pub fn to_linear(db: f64) -> f64 {
        10f64.powf(db / 10.0)
    }

    /// Power sum of two channels given in dB.
    pub fn power_sum(a_db: f64, b_db: f64) -> f64 {
        Self::from_linear(Self::to_linear(a_db) + Self::to_linear(b_db))
    }
}
