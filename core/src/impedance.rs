//! Impedance samples and the VSWR figures derived from them.

use std::collections::BTreeMap;

use num_complex::Complex64;
use serde::Serialize;

use crate::prelude::{Frequency, PatternError, PatternResult};

/// Magnitude of the reflection coefficient of `z` against reference `z0`.
pub fn reflection_coefficient(z: Complex64, z0: f64) -> f64 {
    let z0 = Complex64::new(z0, 0.0);
    ((z - z0) / (z + z0)).norm()
}

/// Voltage standing wave ratio for a reflection coefficient magnitude.
///
/// Total reflection (`rho >= 1`) yields infinity.
pub fn vswr(rho: f64) -> f64 {
    if rho >= 1.0 {
        f64::INFINITY
    } else {
        (1.0 + rho) / (1.0 - rho)
    }
}

/// Impedance reported for one frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpedanceSample {
    pub frequency: Frequency,
    pub impedance: Complex64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VswrPoint {
    pub frequency: f64,
    pub resistance: f64,
    pub reactance: f64,
    pub rho: f64,
    pub vswr: f64,
    /// |Z| in ohms.
    pub abs: f64,
    pub phase_deg: f64,
}

impl VswrPoint {
    pub fn new(sample: ImpedanceSample, z0: f64) -> Self {
        let z = sample.impedance;
        let rho = reflection_coefficient(z, z0);
        Self {
            frequency: sample.frequency.mhz(),
            resistance: z.re,
            reactance: z.im,
            rho,
            vswr: vswr(rho),
            abs: z.norm(),
            phase_deg: z.arg().to_degrees(),
        }
    }
}

/// VSWR over all frequencies with impedance data, ascending by frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VswrSweep {
    pub system_impedance: f64,
    pub points: Vec<VswrPoint>,
}

impl VswrSweep {
    pub fn from_impedances(
        impedances: &BTreeMap<Frequency, Complex64>,
        system_impedance: f64,
    ) -> PatternResult<Self> {
        if !(system_impedance.is_finite() && system_impedance > 0.0) {
            return Err(PatternError::DataInconsistency(format!(
                "system impedance must be positive, got {}",
                system_impedance
            )));
        }
        let points = impedances
            .iter()
            .map(|(&frequency, &impedance)| {
                VswrPoint::new(
                    ImpedanceSample {
                        frequency,
                        impedance,
                    },
                    system_impedance,
                )
            })
            .collect();
        Ok(Self {
            system_impedance,
            points,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Best-matched frequency; the lowest one wins ties.
    pub fn min_vswr_frequency(&self) -> Option<f64> {
        self.points
            .iter()
            .fold(None::<&VswrPoint>, |best, point| match best {
                Some(b) if b.vswr <= point.vswr => Some(b),
                _ => Some(point),
            })
            .map(|point| point.frequency)
    }
}
