use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Payout multiplier in hundredths (`Multiplier(150)` is 1.50x).
///
/// Every externally visible multiplier is held at two decimal places, so the
/// value shown to a player is exactly the value used to pay them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Multiplier(u64);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("multiplier {hundredths} is below 1.00x")]
pub struct BelowOne {
    pub hundredths: u64,
}

impl TryFrom<u64> for Multiplier {
    type Error = BelowOne;

    fn try_from(hundredths: u64) -> Result<Self, Self::Error> {
        if hundredths < Self::ONE.0 {
            return Err(BelowOne { hundredths });
        }
        Ok(Self(hundredths))
    }
}

impl From<Multiplier> for u64 {
    fn from(multiplier: Multiplier) -> Self {
        multiplier.0
    }
}

impl Multiplier {
    /// 1.00x, the value every round starts from.
    pub const ONE: Self = Self(100);

    pub const fn from_hundredths(hundredths: u64) -> Self {
        Self(hundredths)
    }

    pub const fn hundredths(self) -> u64 {
        self.0
    }

    /// Round a floating point multiplier to two decimals.
    ///
    /// Returns `None` for non-finite values and anything below 1.00x.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let hundredths = (value * 100.0).round();
        if hundredths < Self::ONE.0 as f64 {
            return None;
        }
        Some(Self(hundredths as u64))
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Apply the multiplier to an amount in cents, rounding half up to the cent.
    pub fn apply(self, amount: u64) -> u64 {
        let scaled = (amount as u128) * (self.0 as u128) + 50;
        u64::try_from(scaled / 100).unwrap_or(u64::MAX)
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}x", self.0 / 100, self.0 % 100)
    }
}

impl Write for Multiplier {
    fn write(&self, writer: &mut impl BufMut) {
        self.0.write(writer);
    }
}

impl Read for Multiplier {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Self::try_from(u64::read(reader)?).map_err(|_| Error::Invalid("Multiplier", "below 1.00x"))
    }
}

impl FixedSize for Multiplier {
    const SIZE: usize = u64::SIZE;
}
