use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, Write};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{read_string, string_encode_size, write_string, Multiplier, RoundId, MAX_USER_ID_LENGTH};

/// Bet identifier, unique within a room.
pub type BetId = u64;

/// Identity supplied by the authentication provider.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Write for UserId {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.0, writer);
    }
}

impl Read for UserId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self(read_string(reader, MAX_USER_ID_LENGTH)?))
    }
}

impl EncodeSize for UserId {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Placed,
    CashedOut,
    Lost,
}

/// A wager bound to exactly one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: BetId,
    pub user: UserId,
    pub round_id: RoundId,
    /// Stake in cents.
    pub amount: u64,
    pub status: BetStatus,
    pub cash_out_multiplier: Option<Multiplier>,
    /// Total return in cents (stake included).
    pub winnings: Option<u64>,
    pub created_at_ms: u64,
}

impl Bet {
    pub fn is_placed(&self) -> bool {
        self.status == BetStatus::Placed
    }

    /// What the bet would return if cashed out at `multiplier`.
    pub fn potential_winnings(&self, multiplier: Multiplier) -> u64 {
        multiplier.apply(self.amount)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
}

/// Immutable record of a resolved bet, kept in a player's recent history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedBet {
    pub id: BetId,
    pub amount: u64,
    pub timestamp_ms: u64,
    pub status: Outcome,
    /// Winnings for a won bet, the negated stake for a lost one.
    pub profit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashout_at: Option<Multiplier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_multiplier: Option<Multiplier>,
}

impl CompletedBet {
    pub fn won(bet: &Bet, multiplier: Multiplier, winnings: u64) -> Self {
        Self {
            id: bet.id,
            amount: bet.amount,
            timestamp_ms: bet.created_at_ms,
            status: Outcome::Won,
            profit: i64::try_from(winnings).unwrap_or(i64::MAX),
            cashout_at: Some(multiplier),
            crash_multiplier: None,
        }
    }

    pub fn lost(bet: &Bet, crash_point: Multiplier) -> Self {
        Self {
            id: bet.id,
            amount: bet.amount,
            timestamp_ms: bet.created_at_ms,
            status: Outcome::Lost,
            profit: i64::try_from(bet.amount).map(|amount| -amount).unwrap_or(i64::MIN),
            cashout_at: None,
            crash_multiplier: Some(crash_point),
        }
    }
}
