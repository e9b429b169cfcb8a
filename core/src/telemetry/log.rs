use log::{debug, info, warn};

/// Prefixes parser messages with the dialect that produced them.
#[derive(Debug, Clone)]
pub struct LogManager {
    source: &'static str,
}

impl LogManager {
    pub fn new(source: &'static str) -> Self {
        Self { source }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.source, message);
    }

    /// Section change inside a parser state machine.
    pub fn transition(&self, line_no: usize, from: &str, to: &str) {
        debug!("[{}] line {}: {} -> {}", self.source, line_no, from, to);
    }

    pub fn warn(&self, line_no: usize, message: &str) {
        warn!("[{}] line {}: {}", self.source, line_no, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("parser")
    }
}
