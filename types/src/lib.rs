//! Common types shared by the skytrax engine, server, and clients.

pub mod api;
mod bet;
mod codec;
mod constants;
mod error;
mod event;
mod multiplier;
mod round;

pub use bet::{Bet, BetId, BetStatus, CompletedBet, Outcome, UserId};
pub use codec::{read_string, string_encode_size, write_string};
pub use constants::*;
pub use error::{BetError, CashoutError};
pub use event::Event;
pub use multiplier::{BelowOne, Multiplier};
pub use round::{Phase, RoundId, RoundSnapshot};
