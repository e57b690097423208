use skytrax_types::{
    Phase, BETTING_DURATION_SECS, CRASHED_DURATION_SECS, CRASH_HISTORY_CAPACITY,
    IDLE_DURATION_SECS, RECENT_BETS_CAPACITY, STARTING_DURATION_SECS,
};
use std::time::Duration;
use thiserror::Error;

use crate::CrashPool;

/// Tunables for a single room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameConfig {
    pub idle_duration: Duration,
    pub starting_duration: Duration,
    pub betting_duration: Duration,
    pub crashed_duration: Duration,
    pub crash_pool: CrashPool,
    pub recent_bets_capacity: usize,
    pub crash_history_capacity: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be > 0")]
    ZeroDuration { field: &'static str },
    #[error("{field} must be > 0")]
    ZeroCapacity { field: &'static str },
    #[error("crash pool is empty")]
    EmptyCrashPool,
    #[error("crash pool entry {hundredths} is below 1.00x")]
    InvalidCrashPoint { hundredths: u64 },
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            idle_duration: Duration::from_secs(IDLE_DURATION_SECS),
            starting_duration: Duration::from_secs(STARTING_DURATION_SECS),
            betting_duration: Duration::from_secs(BETTING_DURATION_SECS),
            crashed_duration: Duration::from_secs(CRASHED_DURATION_SECS),
            crash_pool: CrashPool::default(),
            recent_bets_capacity: RECENT_BETS_CAPACITY,
            crash_history_capacity: CRASH_HISTORY_CAPACITY,
        }
    }
}

impl GameConfig {
    /// How long `phase` lasts, or `None` for `playing`, which ends on the crash.
    pub fn phase_duration(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Idle => Some(self.idle_duration),
            Phase::Starting => Some(self.starting_duration),
            Phase::Betting => Some(self.betting_duration),
            Phase::Playing => None,
            Phase::Crashed => Some(self.crashed_duration),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, duration) in [
            ("idle_duration", self.idle_duration),
            ("starting_duration", self.starting_duration),
            ("betting_duration", self.betting_duration),
            ("crashed_duration", self.crashed_duration),
        ] {
            if duration.is_zero() {
                return Err(ConfigError::ZeroDuration { field });
            }
        }
        if self.recent_bets_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "recent_bets_capacity",
            });
        }
        if self.crash_history_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "crash_history_capacity",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeline() {
        let config = GameConfig::default();
        assert_eq!(config.phase_duration(Phase::Idle), Some(Duration::from_secs(5)));
        assert_eq!(config.phase_duration(Phase::Starting), Some(Duration::from_secs(3)));
        assert_eq!(config.phase_duration(Phase::Betting), Some(Duration::from_secs(10)));
        assert_eq!(config.phase_duration(Phase::Playing), None);
        assert_eq!(config.phase_duration(Phase::Crashed), Some(Duration::from_secs(5)));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = GameConfig {
            betting_duration: Duration::ZERO,
            ..GameConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration {
                field: "betting_duration"
            })
        );

        let config = GameConfig {
            crash_history_capacity: 0,
            ..GameConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroCapacity {
                field: "crash_history_capacity"
            })
        );
    }
}
