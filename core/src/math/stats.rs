pub struct StatsHelper;

impl StatsHelper {
    /// Largest difference between consecutive entries of a sorted axis.
    pub fn max_gap(axis: &[f64]) -> f64 {
        axis.windows(2)
            .map(|pair| pair[1] - pair[0])
            .fold(0.0, f64::max)
    }

    /// Index of the most frequent value; ties go to the smaller value.
    pub fn mode(values: &[usize]) -> Option<usize> {
        let mut counts = std::collections::BTreeMap::new();
        for &value in values {
            *counts.entry(value).or_insert(0usize) += 1;
        }
        counts
            .into_iter()
            .fold(None, |best: Option<(usize, usize)>, (value, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((value, count)),
            })
            .map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_gap_of_short_axes_is_zero() {
        assert_eq!(StatsHelper::max_gap(&[]), 0.0);
        assert_eq!(StatsHelper::max_gap(&[4.0]), 0.0);
    }

    #[test]
    fn max_gap_handles_uneven_axis() {
        assert_eq!(StatsHelper::max_gap(&[0.0, 1.0, 3.5, 4.0]), 2.5);
    }

    #[test]
    fn mode_prefers_smaller_value_on_tie() {
        assert_eq!(StatsHelper::mode(&[3, 1, 3, 1, 2]), Some(1));
        assert_eq!(StatsHelper::mode(&[5, 2, 5]), Some(5));
        assert_eq!(StatsHelper::mode(&[]), None);
    }
}
