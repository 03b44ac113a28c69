//! Configuration for workflow execution.

use std::time::Duration;

/// Configuration for the workflow engine.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Attempts allowed for a retryable step, including the first.
    pub max_attempts: u32,
    /// Base delay unit for inter-attempt backoff.
    pub backoff_base: Duration,
    /// Timeout applied to steps that do not declare their own.
    pub default_timeout: Duration,
    /// Completed workflows retained in the registry history.
    pub history_cap: usize,
}

impl WorkflowConfig {
    /// Creates a configuration with production defaults.
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            default_timeout: Duration::from_secs(30),
            history_cap: 20,
        }
    }

    /// Sets the attempt budget for retryable steps.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the backoff base delay.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets the default step timeout.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the history cap.
    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    /// Delay before the given attempt (1-indexed).
    ///
    /// The first attempt never waits; attempt n waits
    /// `backoff_base * 2^(n-2)`, i.e. 1s then 2s at the default base.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.backoff_base * 2u32.saturating_pow(attempt - 2)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = WorkflowConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_base, Duration::from_secs(1));
        assert_eq!(config.default_timeout, Duration::from_secs(30));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = WorkflowConfig::default();
        assert_eq!(config.backoff_delay(1), Duration::ZERO);
        assert_eq!(config.backoff_delay(2), Duration::from_secs(1));
        assert_eq!(config.backoff_delay(3), Duration::from_secs(2));
        assert_eq!(config.backoff_delay(4), Duration::from_secs(4));
    }

    #[test]
    fn backoff_scales_with_base() {
        let config = WorkflowConfig::new().with_backoff_base(Duration::from_millis(10));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(10));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(20));
    }
}
