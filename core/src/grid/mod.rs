pub mod compile;
pub mod pattern;
pub mod scale;
pub mod slice;
pub mod summary;

pub use compile::GainGrid;
pub use pattern::{AngleKey, GainPattern};
pub use scale::Scaling;
pub use slice::SlicePoint;
pub use summary::{PatternSummary, SliceReference};
