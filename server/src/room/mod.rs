mod actor;
mod ingress;

pub use actor::Actor;
pub use ingress::{Mailbox, MailboxError, Message};
use skytrax_engine::GameConfig;
use std::time::Duration;

pub struct Config {
    pub name: String,
    pub game: GameConfig,
    pub seed: [u8; 32],
    pub mailbox_size: usize,
    pub event_buffer: usize,
    /// Multiplier sampling cadence while playing.
    pub tick_interval: Duration,
}
