pub mod interpolate;
pub mod polarization;
pub mod turntable;

pub use interpolate::AzimuthResampler;
pub use polarization::{add_sum_channels, power_sum, retain_channels};
pub use turntable::turntable_to_spherical;
