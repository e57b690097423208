use crate::room::{
    ingress::{Mailbox, Message},
    Config,
};
use futures::{
    channel::{mpsc, oneshot},
    StreamExt,
};
use skytrax_engine::{ConfigError, Game, Wallet};
use skytrax_types::{Event, Phase};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::{
    select,
    sync::broadcast,
    task::JoinHandle,
    time::{interval, sleep_until, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

/// Single owner of a room's [Game].
///
/// Requests, the phase timer, and the multiplier sampler are all handled on
/// one task, so every operation sees the game exactly as the previous one
/// left it.
pub struct Actor<W: Wallet> {
    name: String,
    game: Game<W>,
    mailbox: mpsc::Receiver<Message>,
    events: broadcast::Sender<Event>,
    tick_interval: Duration,

    // Engine time is wall-clock milliseconds, advanced by the monotonic clock
    epoch: Instant,
    epoch_ms: u64,
}

impl<W: Wallet + Send + 'static> Actor<W> {
    pub fn new(config: Config, wallet: W) -> Result<(Self, Mailbox), ConfigError> {
        let game = Game::new(&config.game, wallet, config.seed)?;
        let (sender, mailbox) = mpsc::channel(config.mailbox_size);
        let (events, _) = broadcast::channel(config.event_buffer);
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();

        Ok((
            Self {
                name: config.name,
                game,
                mailbox,
                events: events.clone(),
                tick_interval: config.tick_interval,
                epoch: Instant::now(),
                epoch_ms,
            },
            Mailbox::new(sender, events),
        ))
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.epoch_ms.saturating_add(elapsed)
    }

    fn instant_at(&self, ms: u64) -> Instant {
        self.epoch + Duration::from_millis(ms.saturating_sub(self.epoch_ms))
    }

    async fn run(mut self) {
        let mut sampler = interval(self.tick_interval);
        sampler.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.game.start(self.now_ms());
        self.publish();
        info!(room = %self.name, "room started");

        let mut stopped = None;
        loop {
            let deadline = self
                .game
                .next_deadline_ms()
                .map(|ms| self.instant_at(ms));
            let playing = self.game.is_running() && self.game.phase() == Phase::Playing;
            let phase_timer = sleep_until(deadline.unwrap_or_else(Instant::now));

            select! {
                message = self.mailbox.next() => {
                    let Some(message) = message else {
                        warn!(room = %self.name, "mailbox closed");
                        break;
                    };
                    if let Some(response) = self.handle(message) {
                        stopped = Some(response);
                        break;
                    }
                },
                _ = phase_timer, if deadline.is_some() => {
                    self.game.tick(self.now_ms());
                },
                _ = sampler.tick(), if playing => {
                    let now = self.now_ms();
                    self.game.tick(now);
                    debug!(room = %self.name, multiplier = %self.game.multiplier(), "sampled");
                },
            }
            self.publish();
        }

        self.game.stop();
        self.publish();
        info!(room = %self.name, round_id = self.game.round_id(), "room stopped");
        if let Some(response) = stopped {
            let _ = response.send(());
        }
    }

    /// Serve one request. Returns the responder of a stop request.
    fn handle(&mut self, message: Message) -> Option<oneshot::Sender<()>> {
        let now = self.now_ms();
        match message {
            Message::PlaceBet {
                user,
                amount,
                response,
            } => {
                let result = self.game.place_bet(&user, amount, now);
                if let Err(e) = &result {
                    debug!(room = %self.name, %user, amount, reason = e.code(), "bet rejected");
                }
                let _ = response.send(result);
            }
            Message::CashOut { user, response } => {
                let result = self.game.cash_out(&user, now);
                if let Err(e) = &result {
                    debug!(room = %self.name, %user, reason = e.code(), "cash-out rejected");
                }
                let _ = response.send(result);
            }
            Message::SetAutoBet {
                user,
                amount,
                response,
            } => {
                let _ = response.send(self.game.set_auto_bet(&user, amount));
            }
            Message::SetAutoCashout {
                user,
                target,
                response,
            } => {
                self.game.set_auto_cashout(&user, target);
                let _ = response.send(());
            }
            Message::Snapshot { response } => {
                self.game.tick(now);
                let _ = response.send(self.game.snapshot(now));
            }
            Message::ActiveBets { response } => {
                self.game.tick(now);
                let _ = response.send(self.game.active_bets());
            }
            Message::Player { user, response } => {
                self.game.tick(now);
                let _ = response.send(self.game.player(&user));
            }
            Message::Stop { response } => return Some(response),
        }
        None
    }

    fn publish(&mut self) {
        for event in self.game.take_events() {
            // No subscribers is not an error
            if self.events.send(event).is_err() {
                debug!(room = %self.name, "no event subscribers");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::ingress::MailboxError;
    use skytrax_engine::{mocks::test_config, MemoryWallet};
    use skytrax_types::{BetError, CashoutError, Multiplier, UserId};
    use std::sync::Arc;
    use tokio::time::sleep;

    fn room(crash_point: Multiplier, wallet: Arc<MemoryWallet>) -> (Actor<Arc<MemoryWallet>>, Mailbox) {
        Actor::new(
            Config {
                name: "test".to_string(),
                game: test_config(crash_point),
                seed: [0u8; 32],
                mailbox_size: 16,
                event_buffer: 1_024,
                tick_interval: Duration::from_millis(50),
            },
            wallet,
        )
        .unwrap()
    }

    fn drain(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut drained = Vec::new();
        while let Ok(event) = events.try_recv() {
            drained.push(event);
        }
        drained
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_through_mailbox() {
        let wallet = Arc::new(MemoryWallet::new(100_00));
        let (actor, mailbox) = room(Multiplier::from_hundredths(200), wallet.clone());
        let mut events = mailbox.subscribe();
        let handle = actor.start();
        let ada = UserId::from("ada");

        assert_eq!(
            mailbox.place_bet(ada.clone(), 50_00).await.unwrap(),
            Err(BetError::NotBettingPhase)
        );

        sleep(Duration::from_millis(8_000)).await;
        let bet_id = mailbox.place_bet(ada.clone(), 50_00).await.unwrap().unwrap();
        assert_eq!(wallet.balance(&ada), 50_00);
        assert_eq!(mailbox.active_bets().await.unwrap().len(), 1);

        sleep(Duration::from_millis(10_000 + 2_750)).await;
        let snapshot = mailbox.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, Phase::Playing);
        let settlement = mailbox.cash_out(ada.clone()).await.unwrap().unwrap();
        assert_eq!(settlement.bet_id, bet_id);
        assert_eq!(settlement.multiplier, Multiplier::from_hundredths(150));
        assert_eq!(settlement.winnings, 75_00);
        assert_eq!(wallet.balance(&ada), 125_00);

        // The sampler and phase timer carry the round to its crash unprompted
        sleep(Duration::from_millis(2_500)).await;
        let snapshot = mailbox.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, Phase::Crashed);
        assert_eq!(snapshot.crash_history, vec![Multiplier::from_hundredths(200)]);
        assert_eq!(
            mailbox.cash_out(ada.clone()).await.unwrap(),
            Err(CashoutError::NotPlayingPhase)
        );

        let player = mailbox.player(ada.clone()).await.unwrap();
        assert_eq!(player.balance, 125_00);
        assert_eq!(player.recent_bets.len(), 1);

        let seen = drain(&mut events);
        let phases: Vec<_> = seen
            .iter()
            .filter_map(|event| match event {
                Event::PhaseChanged { phase, .. } => Some(*phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                Phase::Idle,
                Phase::Starting,
                Phase::Betting,
                Phase::Playing,
                Phase::Crashed
            ]
        );
        assert!(seen
            .iter()
            .any(|event| matches!(event, Event::BetCashedOut { winnings: 75_00, .. })));
        assert!(seen
            .iter()
            .any(|event| matches!(event, Event::RoundCompleted { round_id: 1, .. })));

        mailbox.stop().await.unwrap();
        handle.await.unwrap();
        assert!(matches!(
            mailbox.snapshot().await,
            Err(MailboxError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_autoplay_through_mailbox() {
        let wallet = Arc::new(MemoryWallet::new(100_00));
        let (actor, mailbox) = room(Multiplier::from_hundredths(300), wallet.clone());
        let handle = actor.start();
        let bob = UserId::from("bob");

        assert_eq!(
            mailbox.set_auto_bet(bob.clone(), Some(0)).await.unwrap(),
            Err(BetError::InvalidAmount)
        );
        mailbox
            .set_auto_bet(bob.clone(), Some(10_00))
            .await
            .unwrap()
            .unwrap();
        mailbox
            .set_auto_cashout(bob.clone(), Some(Multiplier::from_hundredths(150)))
            .await
            .unwrap();

        // Into the playing phase, well past 1.50x but before the 3.00x crash
        sleep(Duration::from_millis(18_000 + 4_000)).await;
        let player = mailbox.player(bob.clone()).await.unwrap();
        let bet = player.active_bet.unwrap();
        assert_eq!(bet.cash_out_multiplier, Some(Multiplier::from_hundredths(150)));
        assert_eq!(bet.winnings, Some(15_00));
        assert_eq!(player.balance, 105_00);
        assert_eq!(player.auto_bet, Some(10_00));

        mailbox.stop().await.unwrap();
        handle.await.unwrap();
    }
}
