//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::{Bet, BetId, CompletedBet, Multiplier, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceBetRequest {
    pub user: UserId,
    /// Stake in cents.
    pub amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetResponse {
    pub bet_id: BetId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashOutRequest {
    pub user: UserId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashOutResponse {
    pub multiplier: Multiplier,
    /// Total return in cents.
    pub winnings: u64,
}

/// `None` disarms the policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoBetRequest {
    pub amount: Option<u64>,
}

/// `None` disarms the policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCashoutRequest {
    pub target: Option<Multiplier>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user: UserId,
    pub balance: u64,
}

/// An in-flight bet as drawn next to the curve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBetView {
    pub bet_id: BetId,
    pub user: UserId,
    pub amount: u64,
    pub potential_winnings: u64,
}

/// Everything the bet widget needs for one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub user: UserId,
    pub balance: u64,
    pub active_bet: Option<Bet>,
    pub recent_bets: Vec<CompletedBet>,
    pub auto_bet: Option<u64>,
    pub auto_cashout: Option<Multiplier>,
}

/// Failure body: a machine-readable reason code, never prose.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
