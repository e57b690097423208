//! Bets placed against the current round.
//!
//! Each player holds at most one bet slot. A bet is created only after the
//! wallet debit succeeds and is marked cashed out only after the wallet credit
//! succeeds, so the wallet and the ledger never disagree about money.

use skytrax_types::{
    Bet, BetError, BetId, BetStatus, CashoutError, CompletedBet, Multiplier, Phase, RoundId,
    UserId,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::{history::BoundedHistory, Wallet, WalletError};

/// Result of a successful cash-out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub bet_id: BetId,
    pub multiplier: Multiplier,
    /// Total return in cents (stake included).
    pub winnings: u64,
}

pub struct BetLedger {
    next_bet_id: BetId,
    active: HashMap<UserId, Bet>,
    recent: HashMap<UserId, BoundedHistory<CompletedBet>>,
    recent_capacity: usize,
}

impl BetLedger {
    pub fn new(recent_capacity: usize) -> Self {
        Self {
            next_bet_id: 1,
            active: HashMap::new(),
            recent: HashMap::new(),
            recent_capacity,
        }
    }

    /// Debit `amount` and open a bet on `round_id`.
    pub fn place<W: Wallet>(
        &mut self,
        wallet: &W,
        user: &UserId,
        amount: u64,
        round_id: RoundId,
        phase: Phase,
        now_ms: u64,
    ) -> Result<BetId, BetError> {
        if phase != Phase::Betting {
            return Err(BetError::NotBettingPhase);
        }
        if self
            .active
            .get(user)
            .is_some_and(|bet| bet.round_id == round_id)
        {
            return Err(BetError::BetAlreadyActive);
        }
        if amount == 0 {
            return Err(BetError::InvalidAmount);
        }
        if wallet.balance(user) < amount {
            return Err(BetError::InsufficientFunds);
        }

        // The balance check above is advisory; the debit is authoritative
        match wallet.debit(user, amount) {
            Ok(()) => {}
            Err(WalletError::InsufficientFunds { .. }) => return Err(BetError::InsufficientFunds),
            Err(e) => {
                warn!(%user, amount, error = %e, "bet debit failed");
                return Err(BetError::LedgerUpdateFailed);
            }
        }

        let id = self.next_bet_id;
        self.next_bet_id += 1;
        self.active.insert(
            user.clone(),
            Bet {
                id,
                user: user.clone(),
                round_id,
                amount,
                status: BetStatus::Placed,
                cash_out_multiplier: None,
                winnings: None,
                created_at_ms: now_ms,
            },
        );
        info!(bet_id = id, %user, round_id, amount, "bet placed");
        Ok(id)
    }

    /// Credit the player's bet at `multiplier` and close it as won.
    pub fn cash_out<W: Wallet>(
        &mut self,
        wallet: &W,
        user: &UserId,
        round_id: RoundId,
        phase: Phase,
        multiplier: Multiplier,
    ) -> Result<Settlement, CashoutError> {
        if phase != Phase::Playing {
            return Err(CashoutError::NotPlayingPhase);
        }
        let Some(bet) = self.active.get_mut(user).filter(|bet| bet.is_placed()) else {
            return Err(CashoutError::NoActiveBet);
        };
        debug_assert_eq!(bet.round_id, round_id, "placed bet from a previous round");

        let winnings = bet.potential_winnings(multiplier);
        if let Err(e) = wallet.credit(user, winnings) {
            warn!(bet_id = bet.id, %user, winnings, error = %e, "cash-out credit failed");
            return Err(CashoutError::LedgerUpdateFailed);
        }

        bet.status = BetStatus::CashedOut;
        bet.cash_out_multiplier = Some(multiplier);
        bet.winnings = Some(winnings);
        let record = CompletedBet::won(bet, multiplier, winnings);
        let settlement = Settlement {
            bet_id: bet.id,
            multiplier,
            winnings,
        };
        self.record(user, record);
        info!(bet_id = settlement.bet_id, %user, round_id, %multiplier, winnings, "bet cashed out");
        Ok(settlement)
    }

    /// Mark every still-placed bet of `round_id` lost. Returns the losing bets.
    pub fn settle_crash(&mut self, round_id: RoundId, crash_point: Multiplier) -> Vec<Bet> {
        let mut lost = Vec::new();
        for bet in self.active.values_mut() {
            if bet.round_id != round_id || !bet.is_placed() {
                continue;
            }
            bet.status = BetStatus::Lost;
            lost.push(bet.clone());
        }
        lost.sort_by_key(|bet| bet.id);
        for bet in &lost {
            self.record(&bet.user, CompletedBet::lost(bet, crash_point));
        }
        if !lost.is_empty() {
            info!(round_id, %crash_point, lost = lost.len(), "settled crash");
        }
        lost
    }

    /// Free every slot holding a bet from before `round_id`.
    pub fn clear_resolved(&mut self, round_id: RoundId) {
        let before = self.active.len();
        self.active.retain(|_, bet| {
            debug_assert!(bet.round_id >= round_id || !bet.is_placed(), "unsettled bet");
            bet.round_id >= round_id
        });
        debug!(round_id, cleared = before - self.active.len(), "cleared bet slots");
    }

    /// The player's bet in the current slot, resolved or not.
    pub fn active_bet(&self, user: &UserId) -> Option<&Bet> {
        self.active.get(user)
    }

    /// Every still-placed bet, oldest first.
    pub fn active_bets(&self) -> Vec<&Bet> {
        let mut bets: Vec<_> = self.active.values().filter(|bet| bet.is_placed()).collect();
        bets.sort_by_key(|bet| bet.id);
        bets
    }

    /// Most recent first.
    pub fn recent_bets(&self, user: &UserId) -> Vec<CompletedBet> {
        self.recent
            .get(user)
            .map(BoundedHistory::to_vec)
            .unwrap_or_default()
    }

    fn record(&mut self, user: &UserId, completed: CompletedBet) {
        let history = self
            .recent
            .entry(user.clone())
            .or_insert_with(|| BoundedHistory::new(self.recent_capacity));
        if history.iter().any(|entry| entry.id == completed.id) {
            return;
        }
        history.record(completed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mocks::FailingWallet, MemoryWallet};
    use skytrax_types::Outcome;

    fn m(hundredths: u64) -> Multiplier {
        Multiplier::from_hundredths(hundredths)
    }

    #[test]
    fn test_place_checks_in_order() {
        let wallet = MemoryWallet::new(30_00);
        let mut ledger = BetLedger::new(10);
        let ada = UserId::from("ada");

        assert_eq!(
            ledger.place(&wallet, &ada, 0, 1, Phase::Playing, 0),
            Err(BetError::NotBettingPhase)
        );
        assert_eq!(
            ledger.place(&wallet, &ada, 0, 1, Phase::Betting, 0),
            Err(BetError::InvalidAmount)
        );
        assert_eq!(
            ledger.place(&wallet, &ada, 50_00, 1, Phase::Betting, 0),
            Err(BetError::InsufficientFunds)
        );
        assert_eq!(wallet.balance(&ada), 30_00);

        let id = ledger.place(&wallet, &ada, 10_00, 1, Phase::Betting, 7).unwrap();
        assert_eq!(wallet.balance(&ada), 20_00);
        assert_eq!(
            ledger.place(&wallet, &ada, 10_00, 1, Phase::Betting, 8),
            Err(BetError::BetAlreadyActive)
        );
        assert_eq!(wallet.balance(&ada), 20_00);

        let bet = ledger.active_bet(&ada).unwrap();
        assert_eq!(bet.id, id);
        assert_eq!(bet.status, BetStatus::Placed);
        assert_eq!(bet.created_at_ms, 7);
    }

    #[test]
    fn test_cash_out_credits_and_records() {
        let wallet = MemoryWallet::new(100_00);
        let mut ledger = BetLedger::new(10);
        let ada = UserId::from("ada");

        assert_eq!(
            ledger.cash_out(&wallet, &ada, 1, Phase::Playing, m(150)),
            Err(CashoutError::NoActiveBet)
        );
        ledger.place(&wallet, &ada, 10_00, 1, Phase::Betting, 0).unwrap();
        assert_eq!(
            ledger.cash_out(&wallet, &ada, 1, Phase::Betting, m(100)),
            Err(CashoutError::NotPlayingPhase)
        );

        let settlement = ledger
            .cash_out(&wallet, &ada, 1, Phase::Playing, m(150))
            .unwrap();
        assert_eq!(settlement.winnings, 15_00);
        assert_eq!(wallet.balance(&ada), 105_00);
        assert_eq!(
            ledger.cash_out(&wallet, &ada, 1, Phase::Playing, m(160)),
            Err(CashoutError::NoActiveBet)
        );

        let recent = ledger.recent_bets(&ada);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].status, Outcome::Won);
        assert_eq!(recent[0].profit, 15_00);
        assert_eq!(recent[0].cashout_at, Some(m(150)));
        assert!(ledger.active_bets().is_empty());
    }

    #[test]
    fn test_settle_crash_marks_remaining_bets_lost() {
        let wallet = MemoryWallet::new(100_00);
        let mut ledger = BetLedger::new(10);
        let users: Vec<_> = ["ada", "bob", "cy"].into_iter().map(UserId::from).collect();
        for user in &users {
            ledger.place(&wallet, user, 10_00, 4, Phase::Betting, 0).unwrap();
        }
        ledger
            .cash_out(&wallet, &users[1], 4, Phase::Playing, m(120))
            .unwrap();
        assert_eq!(ledger.active_bets().len(), 2);

        let lost = ledger.settle_crash(4, m(130));
        assert_eq!(
            lost.iter().map(|bet| bet.user.as_str()).collect::<Vec<_>>(),
            vec!["ada", "cy"]
        );
        assert!(ledger.active_bets().is_empty());

        // Settling twice changes nothing
        assert!(ledger.settle_crash(4, m(130)).is_empty());
        let recent = ledger.recent_bets(&users[0]);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].profit, -10_00);
        assert_eq!(recent[0].crash_multiplier, Some(m(130)));

        // The next round frees every slot
        ledger.clear_resolved(5);
        assert!(users.iter().all(|user| ledger.active_bet(user).is_none()));
        ledger.place(&wallet, &users[0], 5_00, 5, Phase::Betting, 0).unwrap();
    }

    #[test]
    fn test_recent_bets_bounded() {
        let wallet = MemoryWallet::new(1_000_00);
        let mut ledger = BetLedger::new(3);
        let ada = UserId::from("ada");
        for round in 1..=5 {
            ledger.place(&wallet, &ada, 1_00, round, Phase::Betting, round).unwrap();
            ledger.settle_crash(round, m(110));
            ledger.clear_resolved(round + 1);
        }
        let recent = ledger.recent_bets(&ada);
        assert_eq!(
            recent.iter().map(|bet| bet.timestamp_ms).collect::<Vec<_>>(),
            vec![5, 4, 3]
        );
    }

    #[test]
    fn test_failed_debit_creates_no_bet() {
        let wallet = FailingWallet::new(100_00);
        wallet.fail_debits(true);
        let mut ledger = BetLedger::new(10);
        let ada = UserId::from("ada");
        assert_eq!(
            ledger.place(&wallet, &ada, 10_00, 1, Phase::Betting, 0),
            Err(BetError::LedgerUpdateFailed)
        );
        assert!(ledger.active_bet(&ada).is_none());
        assert_eq!(wallet.balance(&ada), 100_00);
    }

    #[test]
    fn test_failed_credit_keeps_bet_placed() {
        let wallet = FailingWallet::new(100_00);
        let mut ledger = BetLedger::new(10);
        let ada = UserId::from("ada");
        ledger.place(&wallet, &ada, 10_00, 1, Phase::Betting, 0).unwrap();

        wallet.fail_credits(true);
        assert_eq!(
            ledger.cash_out(&wallet, &ada, 1, Phase::Playing, m(150)),
            Err(CashoutError::LedgerUpdateFailed)
        );
        assert!(ledger.active_bet(&ada).unwrap().is_placed());
        assert_eq!(wallet.balance(&ada), 90_00);

        // A later attempt can still settle
        wallet.fail_credits(false);
        let settlement = ledger
            .cash_out(&wallet, &ada, 1, Phase::Playing, m(170))
            .unwrap();
        assert_eq!(settlement.winnings, 17_00);
        assert_eq!(wallet.balance(&ada), 107_00);
    }
}
