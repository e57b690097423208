use commonware_cryptography::{sha256::Sha256, Hasher};
use commonware_utils::from_hex_formatted;
use serde::{Deserialize, Serialize};
use skytrax_engine::{CrashPool, GameConfig};
use skytrax_types::{
    Multiplier, BETTING_DURATION_SECS, CRASHED_DURATION_SECS, CRASH_HISTORY_CAPACITY,
    IDLE_DURATION_SECS, INITIAL_BALANCE, RECENT_BETS_CAPACITY, STARTING_DURATION_SECS,
};
use std::{collections::HashSet, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::Level;

pub mod api;
pub mod archive;
pub mod room;

pub use api::Api;

/// Server configuration, read from YAML.
///
/// Every field has a default, so an empty file describes a single room
/// with the stock timings and crash pool.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub json_logs: bool,

    pub rooms: Vec<String>,
    /// Hex master seed. Drawn at random (and logged) when absent.
    pub seed: Option<String>,
    pub mailbox_size: usize,
    pub event_buffer: usize,
    pub tick_interval_ms: u64,

    pub idle_duration_seconds: u64,
    pub starting_duration_seconds: u64,
    pub betting_duration_seconds: u64,
    pub crashed_duration_seconds: u64,
    /// Crash points as decimals (`[1.0, 1.5, 2.0]`). Defaults to the stock pool.
    pub crash_point_pool: Option<Vec<f64>>,
    pub recent_bets_capacity: usize,
    pub crash_history_capacity: usize,

    /// Starting balance of a new wallet account, in cents.
    pub initial_balance: u64,
    /// Append one JSON line per crash to this file.
    pub archive_path: Option<String>,
    pub rate_limit: Option<RateLimit>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_string(),
            json_logs: false,
            rooms: vec!["main".to_string()],
            seed: None,
            mailbox_size: 1_024,
            event_buffer: 1_024,
            tick_interval_ms: 50,
            idle_duration_seconds: IDLE_DURATION_SECS,
            starting_duration_seconds: STARTING_DURATION_SECS,
            betting_duration_seconds: BETTING_DURATION_SECS,
            crashed_duration_seconds: CRASHED_DURATION_SECS,
            crash_point_pool: None,
            recent_bets_capacity: RECENT_BETS_CAPACITY,
            crash_history_capacity: CRASH_HISTORY_CAPACITY,
            initial_balance: INITIAL_BALANCE,
            archive_path: None,
            rate_limit: None,
        }
    }
}

/// Per-client request quota for the HTTP API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimit {
    /// Sustained requests per second.
    pub per_second: u64,
    /// Requests allowed in a burst before the sustained rate applies.
    pub burst: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be hex: {value}")]
    InvalidHex { field: &'static str, value: String },
    #[error("seed must be 32 bytes (got {len})")]
    InvalidSeedLength { len: usize },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("at least one room is required")]
    NoRooms,
    #[error("invalid room name: {name:?}")]
    InvalidRoom { name: String },
    #[error("duplicate room: {name}")]
    DuplicateRoom { name: String },
    #[error("crash point {value} must be a finite number >= 1.00")]
    InvalidCrashPoint { value: f64 },
    #[error(transparent)]
    Game(#[from] skytrax_engine::ConfigError),
}

pub struct ValidatedConfig {
    pub port: u16,
    pub log_level: Level,
    pub json_logs: bool,

    pub rooms: Vec<String>,
    pub seed: Option<[u8; 32]>,
    pub mailbox_size: usize,
    pub event_buffer: usize,
    pub tick_interval: Duration,

    pub game: GameConfig,

    pub initial_balance: u64,
    pub archive_path: Option<PathBuf>,
    pub rate_limit: Option<RateLimit>,
}

fn non_zero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field, value });
    }
    Ok(())
}

fn parse_seed(value: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = from_hex_formatted(value).ok_or(ConfigError::InvalidHex {
        field: "seed",
        value: value.to_string(),
    })?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ConfigError::InvalidSeedLength { len: bytes.len() })
}

fn parse_pool(points: &[f64]) -> Result<CrashPool, ConfigError> {
    let points = points
        .iter()
        .map(|value| {
            Multiplier::from_f64(*value).ok_or(ConfigError::InvalidCrashPoint { value: *value })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CrashPool::new(points)?)
}

/// Seed of a single room, derived from the master seed and the room name.
pub fn room_seed(master: &[u8; 32], room: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(master);
    hasher.update(room.as_bytes());
    hasher.finalize().0
}

impl Config {
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        if self.rooms.is_empty() {
            return Err(ConfigError::NoRooms);
        }
        let mut seen = HashSet::new();
        for name in &self.rooms {
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(ConfigError::InvalidRoom { name: name.clone() });
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateRoom { name: name.clone() });
            }
        }

        non_zero("mailbox_size", self.mailbox_size as u64)?;
        non_zero("event_buffer", self.event_buffer as u64)?;
        non_zero("tick_interval_ms", self.tick_interval_ms)?;

        let seed = self.seed.as_deref().map(parse_seed).transpose()?;
        let crash_pool = match &self.crash_point_pool {
            Some(points) => parse_pool(points)?,
            None => CrashPool::default(),
        };
        let game = GameConfig {
            idle_duration: Duration::from_secs(self.idle_duration_seconds),
            starting_duration: Duration::from_secs(self.starting_duration_seconds),
            betting_duration: Duration::from_secs(self.betting_duration_seconds),
            crashed_duration: Duration::from_secs(self.crashed_duration_seconds),
            crash_pool,
            recent_bets_capacity: self.recent_bets_capacity,
            crash_history_capacity: self.crash_history_capacity,
        };
        game.validate()?;

        if let Some(rate_limit) = &self.rate_limit {
            non_zero("rate_limit.per_second", rate_limit.per_second)?;
            non_zero("rate_limit.burst", rate_limit.burst as u64)?;
        }

        Ok(ValidatedConfig {
            port: self.port,
            log_level,
            json_logs: self.json_logs,
            rooms: self.rooms,
            seed,
            mailbox_size: self.mailbox_size,
            event_buffer: self.event_buffer,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            game,
            initial_balance: self.initial_balance,
            archive_path: self.archive_path.map(PathBuf::from),
            rate_limit: self.rate_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        let validated = config.validate().unwrap();
        assert_eq!(validated.rooms, vec!["main".to_string()]);
        assert_eq!(validated.log_level, Level::INFO);
        assert_eq!(validated.game, GameConfig::default());
        assert_eq!(validated.tick_interval, Duration::from_millis(50));
        assert_eq!(validated.seed, None);
    }

    #[test]
    fn test_full_file() {
        let yaml = r#"
port: 9000
log_level: debug
json_logs: true
rooms: [main, high-rollers]
seed: "0x0101010101010101010101010101010101010101010101010101010101010101"
betting_duration_seconds: 15
crash_point_pool: [1.0, 1.5, 2.25]
archive_path: /tmp/rounds.jsonl
rate_limit:
  per_second: 10
  burst: 50
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let validated = config.validate().unwrap();
        assert_eq!(validated.port, 9000);
        assert!(validated.json_logs);
        assert_eq!(validated.rooms.len(), 2);
        assert_eq!(validated.seed, Some([1u8; 32]));
        assert_eq!(validated.game.betting_duration, Duration::from_secs(15));
        assert_eq!(
            validated.game.crash_pool.points(),
            &[
                Multiplier::ONE,
                Multiplier::from_hundredths(150),
                Multiplier::from_hundredths(225)
            ]
        );
        assert_eq!(
            validated.rate_limit,
            Some(RateLimit {
                per_second: 10,
                burst: 50
            })
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        let invalid = |config: Config| config.validate().err().unwrap();

        assert!(matches!(
            invalid(Config {
                log_level: "loud".to_string(),
                ..Config::default()
            }),
            ConfigError::InvalidLogLevel { .. }
        ));
        assert!(matches!(
            invalid(Config {
                rooms: vec![],
                ..Config::default()
            }),
            ConfigError::NoRooms
        ));
        assert!(matches!(
            invalid(Config {
                rooms: vec!["a".to_string(), "a".to_string()],
                ..Config::default()
            }),
            ConfigError::DuplicateRoom { .. }
        ));
        assert!(matches!(
            invalid(Config {
                rooms: vec!["a/b".to_string()],
                ..Config::default()
            }),
            ConfigError::InvalidRoom { .. }
        ));
        assert!(matches!(
            invalid(Config {
                seed: Some("zz".to_string()),
                ..Config::default()
            }),
            ConfigError::InvalidHex { field: "seed", .. }
        ));
        assert!(matches!(
            invalid(Config {
                seed: Some("0102".to_string()),
                ..Config::default()
            }),
            ConfigError::InvalidSeedLength { len: 2 }
        ));
        assert!(matches!(
            invalid(Config {
                crash_point_pool: Some(vec![1.5, 0.5]),
                ..Config::default()
            }),
            ConfigError::InvalidCrashPoint { .. }
        ));
        assert!(matches!(
            invalid(Config {
                crash_point_pool: Some(vec![]),
                ..Config::default()
            }),
            ConfigError::Game(skytrax_engine::ConfigError::EmptyCrashPool)
        ));
        assert!(matches!(
            invalid(Config {
                idle_duration_seconds: 0,
                ..Config::default()
            }),
            ConfigError::Game(skytrax_engine::ConfigError::ZeroDuration { .. })
        ));
        assert!(matches!(
            invalid(Config {
                tick_interval_ms: 0,
                ..Config::default()
            }),
            ConfigError::InvalidNonZero {
                field: "tick_interval_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_example_config_is_valid() {
        let config: Config = serde_yaml::from_str(include_str!("../config.example.yaml")).unwrap();
        let validated = config.validate().unwrap();
        assert_eq!(validated.rooms, vec!["main".to_string(), "high-rollers".to_string()]);
        assert!(validated.seed.is_some());
        assert_eq!(validated.game, GameConfig::default());
        assert_eq!(validated.initial_balance, INITIAL_BALANCE);
    }

    #[test]
    fn test_room_seeds_differ_per_room() {
        let master = [9u8; 32];
        assert_eq!(room_seed(&master, "main"), room_seed(&master, "main"));
        assert_ne!(room_seed(&master, "main"), room_seed(&master, "side"));
    }
}
