use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::grid::pattern::GainPattern;
use crate::math::decibel::DecibelHelper;
use crate::prelude::{Frequency, GainKey, PatternError, PatternResult, Polarization};

/// Power sum of two sparse channels over their common angles.
///
/// Channels of different size point at a corrupted or misdetected file and
/// are rejected rather than summed partially.
pub fn power_sum(horizontal: &GainPattern, vertical: &GainPattern) -> PatternResult<GainPattern> {
    if horizontal.len() != vertical.len() {
        return Err(PatternError::DataInconsistency(format!(
            "H channel has {} samples, V channel has {}",
            horizontal.len(),
            vertical.len()
        )));
    }
    let mut sum = GainPattern::new();
    for (angle, h_db) in horizontal.iter() {
        if let Some(v_db) = vertical.gain(&angle) {
            sum.insert(angle.theta(), angle.phi(), DecibelHelper::power_sum(h_db, v_db));
        }
    }
    Ok(sum)
}

/// Adds a `sum` pattern for every frequency that has H and V but no sum.
///
/// Returns the number of synthesized channels.
pub fn add_sum_channels(patterns: &mut BTreeMap<GainKey, GainPattern>) -> PatternResult<usize> {
    let frequencies: Vec<Frequency> = patterns
        .keys()
        .map(|key| key.frequency)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut added = 0;
    for frequency in frequencies {
        let key = |polarization| GainKey {
            frequency,
            polarization,
        };
        if patterns.contains_key(&key(Polarization::Sum)) {
            continue;
        }
        let (Some(h), Some(v)) = (
            patterns.get(&key(Polarization::Horizontal)),
            patterns.get(&key(Polarization::Vertical)),
        ) else {
            continue;
        };
        let sum = power_sum(h, v)?;
        debug!("synthesized sum channel at {} from {} angles", frequency, sum.len());
        patterns.insert(key(Polarization::Sum), sum);
        added += 1;
    }
    if added > 0 {
        info!("added {} power-sum channel(s)", added);
    }
    Ok(added)
}

/// Drops every pattern whose polarization is not listed.
pub fn retain_channels<V>(patterns: &mut BTreeMap<GainKey, V>, keep: &[Polarization]) {
    patterns.retain(|key, _| keep.contains(&key.polarization));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(level: f64) -> GainPattern {
        (0..4)
            .flat_map(|t| (0..4).map(move |p| (t as f64 * 30.0, p as f64 * 90.0, level)))
            .collect()
    }

    #[test]
    fn equal_channels_add_three_db() {
        let sum = power_sum(&flat(0.0), &flat(0.0)).unwrap();
        assert_eq!(sum.len(), 16);
        for (_, gain) in sum.iter() {
            assert!((gain - 3.0103).abs() < 1e-4);
        }
    }

    #[test]
    fn mismatched_channel_sizes_are_rejected() {
        let mut v = flat(0.0);
        v.insert(170.0, 0.0, 1.0);
        assert!(matches!(
            power_sum(&flat(0.0), &v),
            Err(PatternError::DataInconsistency(_))
        ));
    }

    #[test]
    fn sum_is_added_only_where_missing() {
        let mut patterns = BTreeMap::new();
        patterns.insert(GainKey::new(7.0, Polarization::Horizontal), flat(3.0));
        patterns.insert(GainKey::new(7.0, Polarization::Vertical), flat(4.0));
        patterns.insert(GainKey::new(14.0, Polarization::Horizontal), flat(1.0));
        patterns.insert(GainKey::new(14.0, Polarization::Vertical), flat(1.0));
        patterns.insert(GainKey::new(14.0, Polarization::Sum), flat(-50.0));
        patterns.insert(GainKey::new(21.0, Polarization::Vertical), flat(1.0));

        assert_eq!(add_sum_channels(&mut patterns).unwrap(), 1);
        let sum = &patterns[&GainKey::new(7.0, Polarization::Sum)];
        let expected = 10.0 * (10f64.powf(0.3) + 10f64.powf(0.4)).log10();
        assert!((sum.get(30.0, 90.0).unwrap() - expected).abs() < 1e-9);
        assert_eq!(
            patterns[&GainKey::new(14.0, Polarization::Sum)].get(0.0, 0.0),
            Some(-50.0)
        );
        assert!(!patterns.contains_key(&GainKey::new(21.0, Polarization::Sum)));
    }

    #[test]
    fn retain_keeps_requested_channels_only() {
        let mut patterns = BTreeMap::new();
        for pol in [Polarization::Horizontal, Polarization::Vertical, Polarization::Sum] {
            patterns.insert(GainKey::new(7.0, pol), flat(0.0));
        }
        retain_channels(&mut patterns, &[Polarization::Sum]);
        assert_eq!(patterns.len(), 1);
        assert!(patterns.contains_key(&GainKey::new(7.0, Polarization::Sum)));
    }
}
