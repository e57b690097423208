use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};

use crate::{BetError, BetId, Multiplier, Phase, RoundId, UserId};

/// Everything a room reports to subscribers.
///
/// `RoundCompleted` doubles as the record an external store appends to its
/// durable round log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Event {
    PhaseChanged {
        round_id: RoundId,
        phase: Phase,
        at_ms: u64,
    },
    RoundCompleted {
        round_id: RoundId,
        crash_point: Multiplier,
        occurred_at_ms: u64,
    },
    BetPlaced {
        round_id: RoundId,
        bet_id: BetId,
        user: UserId,
        amount: u64,
    },
    BetCashedOut {
        round_id: RoundId,
        bet_id: BetId,
        user: UserId,
        multiplier: Multiplier,
        winnings: u64,
    },
    BetLost {
        round_id: RoundId,
        bet_id: BetId,
        user: UserId,
        amount: u64,
        crash_point: Multiplier,
    },
    /// Auto-bet disarmed itself because the wallet could no longer cover it.
    AutoBetStopped {
        round_id: RoundId,
        user: UserId,
        reason: BetError,
    },
}

impl Event {
    pub fn round_id(&self) -> RoundId {
        match self {
            Self::PhaseChanged { round_id, .. }
            | Self::RoundCompleted { round_id, .. }
            | Self::BetPlaced { round_id, .. }
            | Self::BetCashedOut { round_id, .. }
            | Self::BetLost { round_id, .. }
            | Self::AutoBetStopped { round_id, .. } => *round_id,
        }
    }

    /// The player an event concerns, if it is not room-wide.
    pub fn user(&self) -> Option<&UserId> {
        match self {
            Self::PhaseChanged { .. } | Self::RoundCompleted { .. } => None,
            Self::BetPlaced { user, .. }
            | Self::BetCashedOut { user, .. }
            | Self::BetLost { user, .. }
            | Self::AutoBetStopped { user, .. } => Some(user),
        }
    }
}

impl Write for Event {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::PhaseChanged {
                round_id,
                phase,
                at_ms,
            } => {
                0u8.write(writer);
                round_id.write(writer);
                phase.write(writer);
                at_ms.write(writer);
            }
            Self::RoundCompleted {
                round_id,
                crash_point,
                occurred_at_ms,
            } => {
                1u8.write(writer);
                round_id.write(writer);
                crash_point.write(writer);
                occurred_at_ms.write(writer);
            }
            Self::BetPlaced {
                round_id,
                bet_id,
                user,
                amount,
            } => {
                2u8.write(writer);
                round_id.write(writer);
                bet_id.write(writer);
                user.write(writer);
                amount.write(writer);
            }
            Self::BetCashedOut {
                round_id,
                bet_id,
                user,
                multiplier,
                winnings,
            } => {
                3u8.write(writer);
                round_id.write(writer);
                bet_id.write(writer);
                user.write(writer);
                multiplier.write(writer);
                winnings.write(writer);
            }
            Self::BetLost {
                round_id,
                bet_id,
                user,
                amount,
                crash_point,
            } => {
                4u8.write(writer);
                round_id.write(writer);
                bet_id.write(writer);
                user.write(writer);
                amount.write(writer);
                crash_point.write(writer);
            }
            Self::AutoBetStopped {
                round_id,
                user,
                reason,
            } => {
                5u8.write(writer);
                round_id.write(writer);
                user.write(writer);
                reason.write(writer);
            }
        }
    }
}

impl Read for Event {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let event = match u8::read(reader)? {
            0 => Self::PhaseChanged {
                round_id: u64::read(reader)?,
                phase: Phase::read(reader)?,
                at_ms: u64::read(reader)?,
            },
            1 => Self::RoundCompleted {
                round_id: u64::read(reader)?,
                crash_point: Multiplier::read(reader)?,
                occurred_at_ms: u64::read(reader)?,
            },
            2 => Self::BetPlaced {
                round_id: u64::read(reader)?,
                bet_id: u64::read(reader)?,
                user: UserId::read(reader)?,
                amount: u64::read(reader)?,
            },
            3 => Self::BetCashedOut {
                round_id: u64::read(reader)?,
                bet_id: u64::read(reader)?,
                user: UserId::read(reader)?,
                multiplier: Multiplier::read(reader)?,
                winnings: u64::read(reader)?,
            },
            4 => Self::BetLost {
                round_id: u64::read(reader)?,
                bet_id: u64::read(reader)?,
                user: UserId::read(reader)?,
                amount: u64::read(reader)?,
                crash_point: Multiplier::read(reader)?,
            },
            5 => Self::AutoBetStopped {
                round_id: u64::read(reader)?,
                user: UserId::read(reader)?,
                reason: BetError::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(event)
    }
}

impl EncodeSize for Event {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::PhaseChanged {
                round_id,
                phase,
                at_ms,
            } => round_id.encode_size() + phase.encode_size() + at_ms.encode_size(),
            Self::RoundCompleted {
                round_id,
                crash_point,
                occurred_at_ms,
            } => {
                round_id.encode_size() + crash_point.encode_size() + occurred_at_ms.encode_size()
            }
            Self::BetPlaced {
                round_id,
                bet_id,
                user,
                amount,
            } => {
                round_id.encode_size()
                    + bet_id.encode_size()
                    + user.encode_size()
                    + amount.encode_size()
            }
            Self::BetCashedOut {
                round_id,
                bet_id,
                user,
                multiplier,
                winnings,
            } => {
                round_id.encode_size()
                    + bet_id.encode_size()
                    + user.encode_size()
                    + multiplier.encode_size()
                    + winnings.encode_size()
            }
            Self::BetLost {
                round_id,
                bet_id,
                user,
                amount,
                crash_point,
            } => {
                round_id.encode_size()
                    + bet_id.encode_size()
                    + user.encode_size()
                    + amount.encode_size()
                    + crash_point.encode_size()
            }
            Self::AutoBetStopped {
                round_id,
                user,
                reason,
            } => round_id.encode_size() + user.encode_size() + reason.encode_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::Encode;

    #[test]
    fn test_encode_size_matches_encoding() {
        let events = [
            Event::PhaseChanged {
                round_id: 1,
                phase: Phase::Betting,
                at_ms: 8_000,
            },
            Event::BetCashedOut {
                round_id: 1,
                bet_id: 4,
                user: UserId::from("grace"),
                multiplier: Multiplier::from_hundredths(150),
                winnings: 75_00,
            },
            Event::AutoBetStopped {
                round_id: 2,
                user: UserId::from("grace"),
                reason: BetError::InsufficientFunds,
            },
        ];
        for event in events {
            let encoded = event.encode();
            assert_eq!(encoded.len(), event.encode_size());
            assert_eq!(Event::read(&mut &encoded[..]).unwrap(), event);
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(matches!(
            Event::read(&mut &[42u8][..]),
            Err(Error::InvalidEnum(42))
        ));
    }

    #[test]
    fn test_round_completed_json() {
        let event = Event::RoundCompleted {
            round_id: 9,
            crash_point: Multiplier::from_hundredths(312),
            occurred_at_ms: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "round_completed");
        assert_eq!(json["crashPoint"], 312);
        assert_eq!(json["occurredAtMs"], 1_700_000_000_000u64);
        assert_eq!(event.user(), None);
    }
}
