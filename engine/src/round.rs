//! Round state machine.
//!
//! ```text
//! idle -> starting -> betting -> playing -> crashed -> idle -> ...
//! ```
//!
//! Every phase except `playing` ends when its configured duration elapses;
//! `playing` ends when the live multiplier reaches the crash target. Timed
//! transitions are stamped with their deadline rather than the time they were
//! observed, so a caller that shows up late replays each missed transition in
//! order and the timeline stays anchored to the clock.

use skytrax_types::{Multiplier, Phase, RoundId};
use std::time::Duration;
use tracing::{debug, info};

use crate::{crash, curve, history::BoundedHistory, GameConfig};

/// A phase the machine has just entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Round the new phase belongs to (a fresh id when entering `idle`).
    pub round_id: RoundId,
    pub phase: Phase,
    pub at_ms: u64,
}

pub struct RoundMachine {
    config: GameConfig,
    seed: [u8; 32],
    history: BoundedHistory<Multiplier>,

    round_id: RoundId,
    phase: Phase,
    entered_at_ms: u64,
    crash_target: Option<Multiplier>,
    multiplier: Multiplier,
    started: bool,
    running: bool,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl RoundMachine {
    pub fn new(config: &GameConfig, seed: [u8; 32]) -> Self {
        Self {
            config: config.clone(),
            seed,
            history: BoundedHistory::new(config.crash_history_capacity),
            round_id: 0,
            phase: Phase::Idle,
            entered_at_ms: 0,
            crash_target: None,
            multiplier: Multiplier::ONE,
            started: false,
            running: false,
        }
    }

    /// Start (or resume) the timeline.
    ///
    /// The first call opens round 1 in `idle` at `now_ms` and returns that
    /// entry. Resuming after [Self::stop] keeps the existing timeline: the
    /// next [Self::step] catches up on whatever elapsed in between.
    pub fn start(&mut self, now_ms: u64) -> Option<Transition> {
        if self.running {
            return None;
        }
        self.running = true;
        if self.started {
            info!(round_id = self.round_id, phase = %self.phase, "resumed round timeline");
            return None;
        }
        self.started = true;
        self.round_id = 1;
        self.phase = Phase::Idle;
        self.entered_at_ms = now_ms;
        info!(round_id = self.round_id, "started round timeline");
        Some(Transition {
            round_id: self.round_id,
            phase: self.phase,
            at_ms: now_ms,
        })
    }

    /// Halt the timeline. Subsequent samples and steps are no-ops until restarted.
    pub fn stop(&mut self) {
        if self.running {
            info!(round_id = self.round_id, phase = %self.phase, "stopped round timeline");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn round_id(&self) -> RoundId {
        self.round_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn multiplier(&self) -> Multiplier {
        self.multiplier
    }

    /// The crash point, once it is no longer a secret.
    pub fn revealed_crash_point(&self) -> Option<Multiplier> {
        match self.phase {
            Phase::Crashed => self.crash_target,
            _ => None,
        }
    }

    /// Whether the curve has passed `threshold` strictly before the crash point.
    ///
    /// Holds even when a late sample has already pinned the live multiplier
    /// to the crash point: the curve is continuous, so a lower threshold was
    /// crossed while the round was still flying.
    pub fn passed_before_crash(&self, threshold: Multiplier) -> bool {
        self.phase == Phase::Playing
            && self.multiplier >= threshold
            && self.crash_target.is_some_and(|target| threshold < target)
    }

    pub fn history(&self) -> &BoundedHistory<Multiplier> {
        &self.history
    }

    fn duration_ms(&self, phase: Phase) -> Option<u64> {
        self.config.phase_duration(phase).map(millis)
    }

    /// When the current timed phase ends, or `None` while playing or stopped.
    pub fn deadline_ms(&self) -> Option<u64> {
        if !self.running {
            return None;
        }
        self.duration_ms(self.phase)
            .map(|duration| self.entered_at_ms.saturating_add(duration))
    }

    pub fn time_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.deadline_ms()
            .map(|deadline| deadline.saturating_sub(now_ms))
    }

    /// Bring the live multiplier up to `now_ms`. Only moves while playing.
    pub fn sample(&mut self, now_ms: u64) -> Multiplier {
        if !self.running || self.phase != Phase::Playing {
            return self.multiplier;
        }
        let Some(target) = self.crash_target else {
            debug_assert!(false, "playing without a crash target");
            return self.multiplier;
        };
        let elapsed = Duration::from_millis(now_ms.saturating_sub(self.entered_at_ms));
        self.multiplier = curve::advance(self.multiplier, elapsed, target);
        self.multiplier
    }

    /// Take the next due transition, if any.
    ///
    /// Callers loop until `None`; each call moves exactly one phase forward.
    pub fn step(&mut self, now_ms: u64) -> Option<Transition> {
        if !self.running {
            return None;
        }
        let at_ms = match self.duration_ms(self.phase) {
            Some(duration) => {
                let deadline = self.entered_at_ms.saturating_add(duration);
                if now_ms < deadline {
                    return None;
                }
                deadline
            }
            None => {
                self.sample(now_ms);
                let target = self.crash_target?;
                if self.multiplier < target {
                    return None;
                }
                let reached =
                    self.entered_at_ms.saturating_add(millis(curve::elapsed_to_reach(target)));
                reached.min(now_ms).max(self.entered_at_ms)
            }
        };
        Some(self.enter(self.phase.next(), at_ms))
    }

    fn enter(&mut self, phase: Phase, at_ms: u64) -> Transition {
        debug_assert_eq!(self.phase.next(), phase, "phase transition out of order");
        match phase {
            Phase::Idle => {
                self.round_id += 1;
                self.crash_target = None;
                self.multiplier = Multiplier::ONE;
            }
            Phase::Playing => {
                let target = crash::crash_point(&self.config.crash_pool, &self.seed, self.round_id);
                debug!(round_id = self.round_id, "crash target drawn");
                self.crash_target = Some(target);
                self.multiplier = Multiplier::ONE;
            }
            Phase::Crashed => {
                let target = self.crash_target.unwrap_or(self.multiplier);
                self.multiplier = target;
                self.history.record(target);
                info!(round_id = self.round_id, crash_point = %target, "round crashed");
            }
            Phase::Starting | Phase::Betting => {}
        }
        self.phase = phase;
        self.entered_at_ms = at_ms;
        debug!(round_id = self.round_id, phase = %phase, at_ms, "entered phase");
        Transition {
            round_id: self.round_id,
            phase,
            at_ms,
        }
    }
}
