use std::cmp::Ordering;
use std::collections::BTreeMap;

/// (theta, phi) pair in degrees, ordered theta-major.
#[derive(Debug, Clone, Copy)]
pub struct AngleKey {
    theta: f64,
    phi: f64,
}

impl AngleKey {
    pub fn new(theta: f64, phi: f64) -> Self {
        Self {
            theta: theta + 0.0,
            phi: phi + 0.0,
        }
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }
}

impl PartialEq for AngleKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AngleKey {}

impl PartialOrd for AngleKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AngleKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.theta
            .total_cmp(&other.theta)
            .then_with(|| self.phi.total_cmp(&other.phi))
    }
}

/// Sparse angle -> gain (dB) mapping for one frequency/polarization.
///
/// Filled line by line while a file is parsed, then compiled into a
/// [`GainGrid`](crate::grid::GainGrid). Inserting an existing angle keeps
/// the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GainPattern {
    samples: BTreeMap<AngleKey, f64>,
}

impl GainPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, theta: f64, phi: f64, gain: f64) -> Option<f64> {
        self.samples.insert(AngleKey::new(theta, phi), gain)
    }

    pub fn get(&self, theta: f64, phi: f64) -> Option<f64> {
        self.samples.get(&AngleKey::new(theta, phi)).copied()
    }

    pub fn gain(&self, key: &AngleKey) -> Option<f64> {
        self.samples.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AngleKey, f64)> + '_ {
        self.samples.iter().map(|(key, gain)| (*key, *gain))
    }

    /// Samples grouped by theta, each ring sorted by phi.
    pub fn rings(&self) -> Vec<(f64, Vec<(f64, f64)>)> {
        let mut rings: Vec<(f64, Vec<(f64, f64)>)> = Vec::new();
        for (key, gain) in self.iter() {
            match rings.last_mut() {
                Some((theta, ring)) if theta.total_cmp(&key.theta()) == Ordering::Equal => {
                    ring.push((key.phi(), gain));
                }
                _ => rings.push((key.theta(), vec![(key.phi(), gain)])),
            }
        }
        rings
    }
}

impl FromIterator<(f64, f64, f64)> for GainPattern {
    fn from_iter<I: IntoIterator<Item = (f64, f64, f64)>>(iter: I) -> Self {
        let mut pattern = GainPattern::new();
        for (theta, phi, gain) in iter {
            pattern.insert(theta, phi, gain);
        }
        pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_insert_wins() {
        let mut pattern = GainPattern::new();
        assert!(pattern.insert(10.0, 20.0, 1.0).is_none());
        assert_eq!(pattern.insert(10.0, 20.0, 2.0), Some(1.0));
        assert_eq!(pattern.get(10.0, 20.0), Some(2.0));
        assert_eq!(pattern.len(), 1);
    }

    #[test]
    fn negative_zero_maps_to_same_key() {
        let mut pattern = GainPattern::new();
        pattern.insert(-0.0, 0.0, 1.0);
        assert_eq!(pattern.get(0.0, -0.0), Some(1.0));
    }

    #[test]
    fn rings_group_by_theta_in_phi_order() {
        let pattern: GainPattern = [
            (90.0, 180.0, 3.0),
            (0.0, 0.0, 1.0),
            (90.0, 0.0, 2.0),
        ]
        .into_iter()
        .collect();
        let rings = pattern.rings();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0], (0.0, vec![(0.0, 1.0)]));
        assert_eq!(rings[1], (90.0, vec![(0.0, 2.0), (180.0, 3.0)]));
    }
}
