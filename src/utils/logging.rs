// src/utils/logging.rs - Logging helpers for search and duplicate-detection calls
use log::{debug, info, warn};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    FieldSearch,
    TextSearch,
    Duplicates,
}

#[derive(Clone)]
pub struct MatchingLogger {
    operation_name: &'static str,
    operation_emoji: &'static str,
    start_time: Instant,
}

impl MatchingLogger {
    pub fn new(operation: OperationType) -> Self {
        let (operation_name, operation_emoji) = match operation {
            OperationType::FieldSearch => ("SEARCH", "🔎"),
            OperationType::TextSearch => ("TEXT", "📝"),
            OperationType::Duplicates => ("DUPLICATES", "📨"),
        };

        Self {
            operation_name,
            operation_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, category: &str, detail: &str) {
        debug!(
            "[{}] {} 🚀 Starting {} (category: {}) {}",
            self.operation_name,
            self.operation_emoji,
            self.operation_name.to_lowercase(),
            category,
            detail
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => debug!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.3}s]",
                self.operation_name, self.operation_emoji, phase, details, elapsed.as_secs_f32()
            ),
            None => debug!(
                "[{}] {} 🔄 Phase: {} [+{:.3}s]",
                self.operation_name, self.operation_emoji, phase, elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        debug!(
            "[{}] {} 📊 Loaded {} {} from store",
            self.operation_name, self.operation_emoji, count, data_type
        );
    }

    /// Candidates or messages skipped before scoring (inactive, ineligible, outside the window).
    pub fn log_filtered(&self, reason: &str, count: usize) {
        if count > 0 {
            debug!(
                "[{}] {} 🚫 Filtered out {} ({})",
                self.operation_name, self.operation_emoji, count, reason
            );
        }
    }

    pub fn log_completion(&self, evaluated: usize, accepted: usize, returned: usize) {
        let duration = self.start_time.elapsed();
        info!(
            "[{}] {} ✅ {} evaluated → {} above threshold → {} returned in {:.2?}",
            self.operation_name, self.operation_emoji, evaluated, accepted, returned, duration
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            "[{}] {} ⚠️  {}",
            self.operation_name, self.operation_emoji, message
        );
    }

    pub fn log_debug(&self, message: &str) {
        debug!(
            "[{}] {} {}",
            self.operation_name, self.operation_emoji, message
        );
    }
}
