use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Multiplier;

/// Round identifier, unique within a room.
pub type RoundId = u64;

/// Round phases, in the order a round moves through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Phase {
    #[default]
    Idle = 0,
    Starting = 1,
    Betting = 2,
    Playing = 3,
    Crashed = 4,
}

impl Phase {
    /// The phase that follows this one. The cycle never ends.
    pub const fn next(self) -> Self {
        match self {
            Self::Idle => Self::Starting,
            Self::Starting => Self::Betting,
            Self::Betting => Self::Playing,
            Self::Playing => Self::Crashed,
            Self::Crashed => Self::Idle,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Betting => "betting",
            Self::Playing => "playing",
            Self::Crashed => "crashed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Write for Phase {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for Phase {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Starting),
            2 => Ok(Self::Betting),
            3 => Ok(Self::Playing),
            4 => Ok(Self::Crashed),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Phase {
    const SIZE: usize = 1;
}

/// Read-only projection of a room for rendering.
///
/// The crash target is deliberately absent: clients learn it from
/// `multiplier` once `phase` is `crashed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    pub round_id: RoundId,
    pub phase: Phase,
    pub multiplier: Multiplier,
    /// `None` while playing, since that phase ends on the crash rather than a timer.
    pub time_remaining_ms: Option<u64>,
    /// Most recent first.
    pub crash_history: Vec<Multiplier>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::Encode;

    #[test]
    fn test_phase_cycle_returns_to_idle() {
        let mut phase = Phase::Idle;
        let mut seen = Vec::new();
        for _ in 0..5 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                Phase::Starting,
                Phase::Betting,
                Phase::Playing,
                Phase::Crashed,
                Phase::Idle
            ]
        );
    }

    #[test]
    fn test_phase_codec() {
        for phase in [
            Phase::Idle,
            Phase::Starting,
            Phase::Betting,
            Phase::Playing,
            Phase::Crashed,
        ] {
            let encoded = phase.encode();
            assert_eq!(Phase::read(&mut &encoded[..]).unwrap(), phase);
        }
        assert!(matches!(
            Phase::read(&mut &[9u8][..]),
            Err(Error::InvalidEnum(9))
        ));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = RoundSnapshot {
            round_id: 7,
            phase: Phase::Betting,
            multiplier: Multiplier::ONE,
            time_remaining_ms: Some(4_000),
            crash_history: vec![Multiplier::from_hundredths(213)],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["phase"], "betting");
        assert_eq!(json["timeRemainingMs"], 4_000);
        assert_eq!(json["crashHistory"][0], 213);
    }
}
