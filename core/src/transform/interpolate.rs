use log::debug;

use crate::grid::pattern::GainPattern;
use crate::math::angle::ANGLE_EPSILON;
use crate::prelude::{PatternError, PatternResult};

/// Resamples every theta ring of a pattern onto a uniform azimuth step.
///
/// Targets run over `[start, end)`. When that range spans the full circle,
/// targets outside the first/last measured azimuth are bracketed across the
/// 0°/360° seam; otherwise they are skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AzimuthResampler {
    step: f64,
    start: f64,
    end: f64,
}

impl AzimuthResampler {
    pub fn new(step: f64) -> PatternResult<Self> {
        Self::with_range(step, 0.0, 360.0)
    }

    pub fn with_range(step: f64, start: f64, end: f64) -> PatternResult<Self> {
        if !(step.is_finite() && step > 0.0 && end > start) {
            return Err(PatternError::DataInconsistency(format!(
                "invalid azimuth resampling step {} over [{}, {})",
                step, start, end
            )));
        }
        Ok(Self { step, start, end })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn covers_full_circle(&self) -> bool {
        self.end - self.start >= 360.0 - ANGLE_EPSILON
    }

    pub fn targets(&self) -> Vec<f64> {
        let mut targets = Vec::new();
        let mut k = 0usize;
        loop {
            let target = self.start + k as f64 * self.step;
            if target >= self.end - ANGLE_EPSILON {
                break;
            }
            targets.push(target);
            k += 1;
        }
        targets
    }

    /// New pattern holding only resampled points; input is left untouched.
    pub fn resample(&self, pattern: &GainPattern) -> GainPattern {
        let targets = self.targets();
        let mut resampled = GainPattern::new();
        for (theta, ring) in pattern.rings() {
            let points = self.resample_ring(&ring, &targets);
            debug!(
                "theta {}: {} samples resampled to {}",
                theta,
                ring.len(),
                points.len()
            );
            for (phi, gain) in points {
                resampled.insert(theta, phi, gain);
            }
        }
        resampled
    }

    /// Resamples one ring of `(phi, gain)` pairs sorted by phi.
    pub fn resample_ring(&self, ring: &[(f64, f64)], targets: &[f64]) -> Vec<(f64, f64)> {
        let wrap = self.covers_full_circle();
        let mut out = Vec::with_capacity(targets.len());
        if ring.is_empty() {
            return out;
        }
        for &target in targets {
            if let Some(value) = interpolate_at(ring, target, wrap) {
                out.push((target, value));
            }
        }
        out
    }
}

/// Linear blend in dB between the samples bracketing `target`.
fn interpolate_at(ring: &[(f64, f64)], target: f64, wrap: bool) -> Option<f64> {
    let idx = ring.partition_point(|&(phi, _)| phi < target - ANGLE_EPSILON);
    if let Some(&(phi, gain)) = ring.get(idx) {
        if (phi - target).abs() <= ANGLE_EPSILON {
            return Some(gain);
        }
    }

    let (left, right) = if idx == 0 || idx == ring.len() {
        if !wrap {
            return None;
        }
        (ring[ring.len() - 1], ring[0])
    } else {
        (ring[idx - 1], ring[idx])
    };

    let (mut phi_left, gain_left) = left;
    let (phi_right, gain_right) = right;
    let mut target = target;
    if phi_left > phi_right {
        phi_left -= 360.0;
        if target > phi_right {
            target -= 360.0;
        }
    }
    let span = phi_right - phi_left;
    if span.abs() <= ANGLE_EPSILON {
        return Some(gain_left);
    }
    let fraction = ((target - phi_left) / span).clamp(0.0, 1.0);
    Some(gain_left + (gain_right - gain_left) * fraction)
}
