//! Round engine for skytrax.
//!
//! A [Game] owns one room: the phase timeline ([round::RoundMachine]), the
//! bets placed against it ([ledger::BetLedger]), and the per-player
//! autoplay policies. Time is always supplied by the caller as milliseconds
//! on a single clock, so the engine never sleeps and never reads a clock of
//! its own.

pub mod autoplay;
pub mod config;
pub mod crash;
pub mod curve;
mod game;
pub mod history;
pub mod ledger;
pub mod round;
pub mod wallet;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use config::{ConfigError, GameConfig};
pub use crash::{CrashPool, RoundRng};
pub use game::Game;
pub use ledger::Settlement;
pub use wallet::{MemoryWallet, Wallet, WalletError};
