//! Scheduler timing configuration

use serde::{Deserialize, Serialize};

/// Timing knobs for the scheduling loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Global minimum interval between pull attempts, in seconds
    ///
    /// Used as the fallback when a repository has no configured interval,
    /// as the backoff after a failed pull, and as the lower bound on the
    /// sleep between passes.
    #[serde(rename = "min-interval-secs")]
    pub min_interval_secs: u64,

    /// Granularity of the interruptible sleep, in milliseconds
    #[serde(rename = "sleep-increment-ms")]
    pub sleep_increment_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 15,
            sleep_increment_ms: 1000,
        }
    }
}

impl SchedulerConfig {
    /// Global minimum interval as a chrono duration
    pub fn min_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.min_interval_secs as i64)
    }

    /// Sleep increment as a std duration
    pub fn sleep_increment(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sleep_increment_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.min_interval_secs, 15);
        assert_eq!(config.sleep_increment_ms, 1000);
    }

    #[test]
    fn test_duration_helpers() {
        let config = SchedulerConfig {
            min_interval_secs: 60,
            sleep_increment_ms: 250,
        };
        assert_eq!(config.min_interval(), chrono::Duration::seconds(60));
        assert_eq!(config.sleep_increment(), std::time::Duration::from_millis(250));
    }
}
