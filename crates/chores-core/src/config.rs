use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for occurrence generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Default horizon (in days from today) for household-wide generation.
    /// Callers may pass their own horizon; it is clamped to `1..=days_ahead`.
    pub days_ahead: u32,
    /// Most occurrences a single generation call may persist.
    pub max_occurrences_per_call: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            days_ahead: 90,
            max_occurrences_per_call: 100,
        }
    }
}

/// Cadence of the background maintenance loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub sweep_interval: Duration,
    pub dispatch_interval: Duration,
    pub generation_interval: Duration,
    /// Most reminders a single dispatch cycle will attempt.
    pub dispatch_batch: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(15 * 60),
            dispatch_interval: Duration::from_secs(60),
            generation_interval: Duration::from_secs(24 * 60 * 60),
            dispatch_batch: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_defaults() {
        let config = GenerationConfig::default();
        assert_eq!(config.days_ahead, 90);
        assert_eq!(config.max_occurrences_per_call, 100);
    }
}
