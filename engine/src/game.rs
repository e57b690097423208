use skytrax_types::{
    api::{ActiveBetView, PlayerView},
    Bet, BetError, BetId, CashoutError, Event, Multiplier, Phase, RoundId, RoundSnapshot, UserId,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::{
    autoplay::AutoPlay,
    history::CrashSummary,
    ledger::{BetLedger, Settlement},
    round::{RoundMachine, Transition},
    ConfigError, GameConfig, Wallet,
};

/// One room: round timeline, bets, and autoplay policies behind a single owner.
///
/// Every mutating call takes the caller's current time and first catches the
/// timeline up to it, so requests are always judged against the phase and
/// multiplier in force at the instant they arrive.
pub struct Game<W: Wallet> {
    machine: RoundMachine,
    ledger: BetLedger,
    wallet: W,
    autoplay: BTreeMap<UserId, AutoPlay>,
    outbox: Vec<Event>,
}

impl<W: Wallet> Game<W> {
    pub fn new(config: &GameConfig, wallet: W, seed: [u8; 32]) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            machine: RoundMachine::new(config, seed),
            ledger: BetLedger::new(config.recent_bets_capacity),
            wallet,
            autoplay: BTreeMap::new(),
            outbox: Vec::new(),
        })
    }

    pub fn start(&mut self, now_ms: u64) {
        if let Some(transition) = self.machine.start(now_ms) {
            self.on_transition(transition, now_ms);
        }
        self.tick(now_ms);
    }

    /// Halt the timeline. Requests keep being answered against the frozen state.
    pub fn stop(&mut self) {
        self.machine.stop();
    }

    pub fn is_running(&self) -> bool {
        self.machine.is_running()
    }

    /// Bring the room up to `now_ms`: sample the multiplier, fire auto-cash-outs,
    /// and take every transition that has come due.
    ///
    /// Rounds replayed after a late wake-up settle as they would have live,
    /// except that no auto-bet is placed into a betting phase that already closed.
    pub fn tick(&mut self, now_ms: u64) {
        loop {
            if self.machine.phase() == Phase::Playing {
                self.machine.sample(now_ms);
                self.run_auto_cashouts();
            }
            let Some(transition) = self.machine.step(now_ms) else {
                break;
            };
            self.on_transition(transition, now_ms);
        }
    }

    pub fn place_bet(
        &mut self,
        user: &UserId,
        amount: u64,
        now_ms: u64,
    ) -> Result<BetId, BetError> {
        self.tick(now_ms);
        let round_id = self.machine.round_id();
        let bet_id = self.ledger.place(
            &self.wallet,
            user,
            amount,
            round_id,
            self.machine.phase(),
            now_ms,
        )?;
        self.outbox.push(Event::BetPlaced {
            round_id,
            bet_id,
            user: user.clone(),
            amount,
        });
        Ok(bet_id)
    }

    /// Settle the player's bet at the live multiplier as of `now_ms`.
    pub fn cash_out(&mut self, user: &UserId, now_ms: u64) -> Result<Settlement, CashoutError> {
        self.tick(now_ms);
        let round_id = self.machine.round_id();
        let settlement = self.ledger.cash_out(
            &self.wallet,
            user,
            round_id,
            self.machine.phase(),
            self.machine.multiplier(),
        )?;
        self.outbox.push(Event::BetCashedOut {
            round_id,
            bet_id: settlement.bet_id,
            user: user.clone(),
            multiplier: settlement.multiplier,
            winnings: settlement.winnings,
        });
        Ok(settlement)
    }

    /// Arm (or with `None`, disarm) an automatic bet placed every betting phase.
    pub fn set_auto_bet(&mut self, user: &UserId, amount: Option<u64>) -> Result<(), BetError> {
        if amount == Some(0) {
            return Err(BetError::InvalidAmount);
        }
        self.update_autoplay(user, |auto| auto.bet_amount = amount);
        info!(%user, ?amount, "auto-bet updated");
        Ok(())
    }

    /// Arm (or with `None`, disarm) an automatic cash-out threshold.
    pub fn set_auto_cashout(&mut self, user: &UserId, target: Option<Multiplier>) {
        self.update_autoplay(user, |auto| auto.cashout_target = target);
        info!(%user, ?target, "auto-cashout updated");
    }

    fn update_autoplay(&mut self, user: &UserId, update: impl FnOnce(&mut AutoPlay)) {
        let auto = self.autoplay.entry(user.clone()).or_default();
        update(auto);
        if auto.is_idle() {
            self.autoplay.remove(user);
        }
    }

    pub fn round_id(&self) -> RoundId {
        self.machine.round_id()
    }

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn multiplier(&self) -> Multiplier {
        self.machine.multiplier()
    }

    /// When the current timed phase ends. `None` while playing or stopped.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.machine.deadline_ms()
    }

    pub fn snapshot(&self, now_ms: u64) -> RoundSnapshot {
        RoundSnapshot {
            round_id: self.machine.round_id(),
            phase: self.machine.phase(),
            multiplier: self.machine.multiplier(),
            time_remaining_ms: self.machine.time_remaining_ms(now_ms),
            crash_history: self.machine.history().to_vec(),
        }
    }

    pub fn player(&self, user: &UserId) -> PlayerView {
        let auto = self.autoplay.get(user).copied().unwrap_or_default();
        PlayerView {
            user: user.clone(),
            balance: self.wallet.balance(user),
            active_bet: self.ledger.active_bet(user).cloned(),
            recent_bets: self.ledger.recent_bets(user),
            auto_bet: auto.bet_amount,
            auto_cashout: auto.cashout_target,
        }
    }

    /// Every bet still riding on the current round.
    pub fn active_bets(&self) -> Vec<ActiveBetView> {
        let multiplier = self.machine.multiplier();
        self.ledger
            .active_bets()
            .into_iter()
            .map(|bet| ActiveBetView {
                bet_id: bet.id,
                user: bet.user.clone(),
                amount: bet.amount,
                potential_winnings: bet.potential_winnings(multiplier),
            })
            .collect()
    }

    /// Most recent first.
    pub fn crash_history(&self) -> Vec<Multiplier> {
        self.machine.history().to_vec()
    }

    pub fn crash_summary(&self) -> Option<CrashSummary> {
        self.machine.history().summary()
    }

    /// Drain the events produced since the last call, in order.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    /// Settle every armed auto-cash-out whose threshold the curve has passed.
    ///
    /// Pays the threshold itself, so a sparse sample that overshoots it (or
    /// lands on the crash point) settles exactly as a dense one would have.
    fn run_auto_cashouts(&mut self) {
        let round_id = self.machine.round_id();
        let multiplier = self.machine.multiplier();
        for (user, auto) in self.autoplay.iter_mut() {
            let Some(target) = auto.cashout_target else {
                continue;
            };
            if !self.machine.passed_before_crash(target) {
                continue;
            }
            if !self.ledger.active_bet(user).is_some_and(Bet::is_placed) {
                continue;
            }
            if !auto.should_cash_out(round_id, multiplier) {
                continue;
            }
            match self.ledger.cash_out(
                &self.wallet,
                user,
                round_id,
                Phase::Playing,
                target,
            ) {
                Ok(settlement) => self.outbox.push(Event::BetCashedOut {
                    round_id,
                    bet_id: settlement.bet_id,
                    user: user.clone(),
                    multiplier: settlement.multiplier,
                    winnings: settlement.winnings,
                }),
                Err(e) => warn!(%user, round_id, error = %e, "auto-cashout failed"),
            }
        }
    }

    fn run_auto_bets(&mut self, round_id: RoundId, at_ms: u64) {
        let mut stopped = Vec::new();
        for (user, auto) in self.autoplay.iter_mut() {
            let Some(amount) = auto.bet_amount else {
                continue;
            };
            match self
                .ledger
                .place(&self.wallet, user, amount, round_id, Phase::Betting, at_ms)
            {
                Ok(bet_id) => self.outbox.push(Event::BetPlaced {
                    round_id,
                    bet_id,
                    user: user.clone(),
                    amount,
                }),
                Err(BetError::InsufficientFunds) => {
                    warn!(%user, round_id, amount, "auto-bet stopped: insufficient funds");
                    auto.bet_amount = None;
                    self.outbox.push(Event::AutoBetStopped {
                        round_id,
                        user: user.clone(),
                        reason: BetError::InsufficientFunds,
                    });
                    if auto.is_idle() {
                        stopped.push(user.clone());
                    }
                }
                Err(e) => warn!(%user, round_id, amount, error = %e, "auto-bet rejected"),
            }
        }
        for user in stopped {
            self.autoplay.remove(&user);
        }
    }

    fn on_transition(&mut self, transition: Transition, now_ms: u64) {
        let Transition {
            round_id,
            phase,
            at_ms,
        } = transition;
        info!(round_id, %phase, at_ms, "phase changed");
        self.outbox.push(Event::PhaseChanged {
            round_id,
            phase,
            at_ms,
        });
        match phase {
            Phase::Idle => self.ledger.clear_resolved(round_id),
            Phase::Betting => match self.machine.deadline_ms() {
                Some(closes_at) if closes_at > now_ms => self.run_auto_bets(round_id, at_ms),
                _ => debug!(
                    round_id,
                    at_ms,
                    now_ms,
                    "betting closed before it was observed, skipping auto-bets"
                ),
            },
            Phase::Crashed => {
                let crash_point = self.machine.multiplier();
                self.outbox.push(Event::RoundCompleted {
                    round_id,
                    crash_point,
                    occurred_at_ms: at_ms,
                });
                for bet in self.ledger.settle_crash(round_id, crash_point) {
                    self.outbox.push(Event::BetLost {
                        round_id,
                        bet_id: bet.id,
                        user: bet.user,
                        amount: bet.amount,
                        crash_point,
                    });
                }
            }
            Phase::Starting | Phase::Playing => {}
        }
    }
}
