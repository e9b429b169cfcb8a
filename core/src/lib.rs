//! Far-field antenna pattern ingestion and normalization.
//!
//! Simulator listings (MININEC, NEC2), EZNEC far field tables and turntable
//! measurement exports are parsed into sparse per-(frequency, polarization)
//! patterns, compiled into dense theta/phi gain grids and optionally
//! resampled, re-indexed from turntable coordinates or power-summed. The
//! grids, impedance data and wire geometry are what a renderer consumes.

pub mod formats;
pub mod grid;
pub mod impedance;
pub mod math;
pub mod prelude;
pub mod telemetry;
pub mod transform;

pub use formats::{detect_dialect, parse_file, parse_str, Dialect, PatternDataset};
pub use grid::{GainGrid, GainPattern, PatternSummary, Scaling, SlicePoint};
pub use impedance::VswrSweep;
pub use prelude::{
    FormatParser, Frequency, GainKey, ParseOptions, PatternError, PatternResult, Polarization,
};
