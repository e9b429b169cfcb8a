pub mod angle;
pub mod decibel;
pub mod matrix;
pub mod stats;

pub use angle::AngleHelper;
pub use decibel::DecibelHelper;
pub use matrix::MatrixHelper;
pub use stats::StatsHelper;
