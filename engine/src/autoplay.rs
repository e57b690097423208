//! Per-player autoplay policies.

use skytrax_types::{Multiplier, RoundId};

/// Standing instructions a player leaves with the room.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AutoPlay {
    /// Stake to place at the start of every betting phase.
    pub bet_amount: Option<u64>,
    /// Cash out as soon as the live multiplier reaches this value.
    pub cashout_target: Option<Multiplier>,
    fired_round: Option<RoundId>,
}

impl AutoPlay {
    /// Whether auto-cash-out should trigger now. Fires at most once per round.
    pub fn should_cash_out(&mut self, round_id: RoundId, multiplier: Multiplier) -> bool {
        let Some(target) = self.cashout_target else {
            return false;
        };
        if multiplier < target || self.fired_round == Some(round_id) {
            return false;
        }
        self.fired_round = Some(round_id);
        true
    }

    /// No policy armed.
    pub fn is_idle(&self) -> bool {
        self.bet_amount.is_none() && self.cashout_target.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_out_fires_once_per_round() {
        let mut auto = AutoPlay {
            cashout_target: Some(Multiplier::from_hundredths(150)),
            ..AutoPlay::default()
        };
        assert!(!auto.should_cash_out(1, Multiplier::from_hundredths(149)));
        assert!(auto.should_cash_out(1, Multiplier::from_hundredths(150)));
        assert!(!auto.should_cash_out(1, Multiplier::from_hundredths(170)));
        assert!(auto.should_cash_out(2, Multiplier::from_hundredths(151)));
    }

    #[test]
    fn test_idle() {
        let mut auto = AutoPlay::default();
        assert!(auto.is_idle());
        assert!(!auto.should_cash_out(1, Multiplier::from_hundredths(10_000)));
        auto.bet_amount = Some(1_00);
        assert!(!auto.is_idle());
    }
}
