use futures::{
    channel::{mpsc, oneshot},
    SinkExt,
};
use skytrax_engine::Settlement;
use skytrax_types::{
    api::{ActiveBetView, PlayerView},
    BetError, BetId, CashoutError, Event, Multiplier, RoundSnapshot, UserId,
};
use thiserror::Error;
use tokio::sync::broadcast;

pub enum Message {
    PlaceBet {
        user: UserId,
        amount: u64,
        response: oneshot::Sender<Result<BetId, BetError>>,
    },
    CashOut {
        user: UserId,
        response: oneshot::Sender<Result<Settlement, CashoutError>>,
    },
    SetAutoBet {
        user: UserId,
        amount: Option<u64>,
        response: oneshot::Sender<Result<(), BetError>>,
    },
    SetAutoCashout {
        user: UserId,
        target: Option<Multiplier>,
        response: oneshot::Sender<()>,
    },
    Snapshot {
        response: oneshot::Sender<RoundSnapshot>,
    },
    ActiveBets {
        response: oneshot::Sender<Vec<ActiveBetView>>,
    },
    Player {
        user: UserId,
        response: oneshot::Sender<PlayerView>,
    },
    Stop {
        response: oneshot::Sender<()>,
    },
}

/// Handle to a running room. Cheap to clone.
#[derive(Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Message>,
    events: broadcast::Sender<Event>,
}

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("room mailbox closed")]
    Closed,
    #[error("room request canceled")]
    Canceled,
}

impl Mailbox {
    pub(super) fn new(sender: mpsc::Sender<Message>, events: broadcast::Sender<Event>) -> Self {
        Self { sender, events }
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> Message,
    ) -> Result<T, MailboxError> {
        let (response, receiver) = oneshot::channel();
        let mut sender = self.sender.clone();
        sender
            .send(message(response))
            .await
            .map_err(|_| MailboxError::Closed)?;
        receiver.await.map_err(|_| MailboxError::Canceled)
    }

    pub async fn place_bet(
        &self,
        user: UserId,
        amount: u64,
    ) -> Result<Result<BetId, BetError>, MailboxError> {
        self.request(|response| Message::PlaceBet {
            user,
            amount,
            response,
        })
        .await
    }

    pub async fn cash_out(
        &self,
        user: UserId,
    ) -> Result<Result<Settlement, CashoutError>, MailboxError> {
        self.request(|response| Message::CashOut { user, response })
            .await
    }

    pub async fn set_auto_bet(
        &self,
        user: UserId,
        amount: Option<u64>,
    ) -> Result<Result<(), BetError>, MailboxError> {
        self.request(|response| Message::SetAutoBet {
            user,
            amount,
            response,
        })
        .await
    }

    pub async fn set_auto_cashout(
        &self,
        user: UserId,
        target: Option<Multiplier>,
    ) -> Result<(), MailboxError> {
        self.request(|response| Message::SetAutoCashout {
            user,
            target,
            response,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<RoundSnapshot, MailboxError> {
        self.request(|response| Message::Snapshot { response }).await
    }

    pub async fn active_bets(&self) -> Result<Vec<ActiveBetView>, MailboxError> {
        self.request(|response| Message::ActiveBets { response })
            .await
    }

    pub async fn player(&self, user: UserId) -> Result<PlayerView, MailboxError> {
        self.request(|response| Message::Player { user, response })
            .await
    }

    /// Stop the room. Resolves once the actor has left its loop.
    pub async fn stop(&self) -> Result<(), MailboxError> {
        self.request(|response| Message::Stop { response }).await
    }

    /// Receive every event the room emits from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}
