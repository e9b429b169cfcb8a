use serde::Serialize;

/// Row counters collected while one file is parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseMetrics {
    pub lines_read: usize,
    pub rows_accepted: usize,
    pub rows_skipped: usize,
    pub sections_closed: usize,
}

impl ParseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&mut self) {
        self.lines_read += 1;
    }

    pub fn record_row(&mut self) {
        self.rows_accepted += 1;
    }

    pub fn record_skipped(&mut self) {
        self.rows_skipped += 1;
    }

    pub fn record_section_end(&mut self) {
        self.sections_closed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_accumulate() {
        let mut metrics = ParseMetrics::new();
        metrics.record_line();
        metrics.record_line();
        metrics.record_row();
        metrics.record_skipped();
        metrics.record_section_end();
        assert_eq!(
            metrics,
            ParseMetrics {
                lines_read: 2,
                rows_accepted: 1,
                rows_skipped: 1,
                sections_closed: 1,
            }
        );
    }
}
