//! Durable log of completed rounds.

use serde::{Deserialize, Serialize};
use skytrax_types::{Event, Multiplier, RoundId};
use std::path::PathBuf;
use tokio::{
    fs::OpenOptions,
    io::AsyncWriteExt,
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{error, info, warn};

/// One line of the archive file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub room: String,
    pub round_id: RoundId,
    pub crash_point: Multiplier,
    pub occurred_at_ms: u64,
}

/// Appends a [RoundRecord] for every `RoundCompleted` event of a room.
pub struct Archive {
    room: String,
    path: PathBuf,
}

impl Archive {
    pub fn new(room: String, path: PathBuf) -> Self {
        Self { room, path }
    }

    pub fn start(self, events: broadcast::Receiver<Event>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    async fn run(self, mut events: broadcast::Receiver<Event>) {
        let mut file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
        {
            Ok(file) => file,
            Err(e) => {
                error!(room = %self.room, path = %self.path.display(), error = %e, "failed to open archive");
                return;
            }
        };
        info!(room = %self.room, path = %self.path.display(), "archiving rounds");

        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(room = %self.room, skipped, "archive lagged behind, rounds may be missing");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Event::RoundCompleted {
                round_id,
                crash_point,
                occurred_at_ms,
            } = event
            else {
                continue;
            };
            let record = RoundRecord {
                room: self.room.clone(),
                round_id,
                crash_point,
                occurred_at_ms,
            };
            let mut line = match serde_json::to_vec(&record) {
                Ok(line) => line,
                Err(e) => {
                    error!(room = %self.room, round_id, error = %e, "failed to serialize round");
                    continue;
                }
            };
            line.push(b'\n');
            if let Err(e) = file.write_all(&line).await {
                error!(room = %self.room, round_id, error = %e, "failed to archive round");
                continue;
            }
            if let Err(e) = file.flush().await {
                error!(room = %self.room, round_id, error = %e, "failed to flush archive");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skytrax_types::{Phase, UserId};

    #[tokio::test]
    async fn test_archives_completed_rounds_only() {
        let path = std::env::temp_dir().join(format!("skytrax-archive-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let (sender, receiver) = broadcast::channel(16);
        let handle = Archive::new("main".to_string(), path.clone()).start(receiver);
        for event in [
            Event::PhaseChanged {
                round_id: 1,
                phase: Phase::Crashed,
                at_ms: 10,
            },
            Event::RoundCompleted {
                round_id: 1,
                crash_point: Multiplier::from_hundredths(245),
                occurred_at_ms: 10,
            },
            Event::BetPlaced {
                round_id: 2,
                bet_id: 1,
                user: UserId::from("ada"),
                amount: 1_00,
            },
            Event::RoundCompleted {
                round_id: 2,
                crash_point: Multiplier::ONE,
                occurred_at_ms: 20,
            },
        ] {
            sender.send(event).unwrap();
        }
        drop(sender);
        handle.await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let records: Vec<RoundRecord> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(
            records,
            vec![
                RoundRecord {
                    room: "main".to_string(),
                    round_id: 1,
                    crash_point: Multiplier::from_hundredths(245),
                    occurred_at_ms: 10,
                },
                RoundRecord {
                    room: "main".to_string(),
                    round_id: 2,
                    crash_point: Multiplier::ONE,
                    occurred_at_ms: 20,
                },
            ]
        );
        let _ = std::fs::remove_file(&path);
    }
}
