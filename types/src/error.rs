use bytes::{Buf, BufMut};
use commonware_codec::{Error as CodecError, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a bet can be refused.
///
/// Serialized as snake_case reason codes; turning them into prose is up to
/// the client.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BetError {
    #[error("bets are only accepted during the betting phase")]
    NotBettingPhase = 0,
    #[error("a bet is already active for this round")]
    BetAlreadyActive = 1,
    #[error("bet amount must be positive")]
    InvalidAmount = 2,
    #[error("insufficient funds")]
    InsufficientFunds = 3,
    #[error("wallet debit failed")]
    LedgerUpdateFailed = 4,
}

/// Reasons a cash-out can be refused.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashoutError {
    #[error("no active bet to cash out")]
    NoActiveBet,
    #[error("cash-out is only possible while the round is playing")]
    NotPlayingPhase,
    #[error("wallet credit failed")]
    LedgerUpdateFailed,
}

impl BetError {
    /// Reason code, identical to the serialized form.
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotBettingPhase => "not_betting_phase",
            Self::BetAlreadyActive => "bet_already_active",
            Self::InvalidAmount => "invalid_amount",
            Self::InsufficientFunds => "insufficient_funds",
            Self::LedgerUpdateFailed => "ledger_update_failed",
        }
    }
}

impl CashoutError {
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoActiveBet => "no_active_bet",
            Self::NotPlayingPhase => "not_playing_phase",
            Self::LedgerUpdateFailed => "ledger_update_failed",
        }
    }
}

impl Write for BetError {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for BetError {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        match u8::read(reader)? {
            0 => Ok(Self::NotBettingPhase),
            1 => Ok(Self::BetAlreadyActive),
            2 => Ok(Self::InvalidAmount),
            3 => Ok(Self::InsufficientFunds),
            4 => Ok(Self::LedgerUpdateFailed),
            i => Err(CodecError::InvalidEnum(i)),
        }
    }
}

impl FixedSize for BetError {
    const SIZE: usize = 1;
}
