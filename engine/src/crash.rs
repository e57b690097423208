//! Crash point generation.

use commonware_cryptography::sha256::Sha256;
use commonware_cryptography::Hasher;
use rand::{Rng, RngCore};
use skytrax_types::{Multiplier, RoundId, DEFAULT_CRASH_POOL};

use crate::ConfigError;

/// Weighted pool of crash points.
///
/// A draw picks one entry uniformly, so an entry listed twice is twice as
/// likely. The pool is never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrashPool(Vec<Multiplier>);

impl CrashPool {
    pub fn new(points: Vec<Multiplier>) -> Result<Self, ConfigError> {
        if points.is_empty() {
            return Err(ConfigError::EmptyCrashPool);
        }
        if let Some(point) = points.iter().find(|point| **point < Multiplier::ONE) {
            return Err(ConfigError::InvalidCrashPoint {
                hundredths: point.hundredths(),
            });
        }
        Ok(Self(points))
    }

    /// A pool that always crashes at `point`.
    pub fn fixed(point: Multiplier) -> Self {
        Self(vec![point.max(Multiplier::ONE)])
    }

    pub fn points(&self) -> &[Multiplier] {
        &self.0
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Multiplier {
        self.0[rng.gen_range(0..self.0.len())]
    }

    /// Share of the pool at or below `point`.
    pub fn probability_at_most(&self, point: Multiplier) -> f64 {
        let hits = self.0.iter().filter(|entry| **entry <= point).count();
        hits as f64 / self.0.len() as f64
    }
}

impl Default for CrashPool {
    fn default() -> Self {
        Self(
            DEFAULT_CRASH_POOL
                .iter()
                .map(|hundredths| Multiplier::from_hundredths(*hundredths))
                .collect(),
        )
    }
}

/// Crash point for `round_id` in a room keyed by `seed`.
pub fn crash_point(pool: &CrashPool, seed: &[u8; 32], round_id: RoundId) -> Multiplier {
    pool.draw(&mut RoundRng::new(seed, round_id))
}

/// Deterministic byte stream derived from a room seed and a round id.
///
/// Uses a SHA256 hash chain, so anyone holding the seed can replay the crash
/// point of every round.
#[derive(Clone)]
pub struct RoundRng {
    state: [u8; 32],
    index: usize,
}

impl RoundRng {
    pub fn new(seed: &[u8; 32], round_id: RoundId) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(&round_id.to_be_bytes());
        Self {
            state: hasher.finalize().0,
            index: 0,
        }
    }

    fn next_byte(&mut self) -> u8 {
        if self.index >= 32 {
            let mut hasher = Sha256::new();
            hasher.update(&self.state);
            self.state = hasher.finalize().0;
            self.index = 0;
        }
        let result = self.state[self.index];
        self.index += 1;
        result
    }
}

impl RngCore for RoundRng {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_be_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest.iter_mut() {
            *byte = self.next_byte();
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
