//! Store tuning knobs.

/// Configuration for store implementations.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How many times a one-record transaction re-reads and retries after
    /// losing a commit race before giving up with a conflict.
    pub transaction_max_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            transaction_max_attempts: 5,
        }
    }
}

impl StoreConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.transaction_max_attempts = attempts;
        self
    }
}
