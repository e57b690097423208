use skytrax_types::Multiplier;
use std::collections::VecDeque;

/// Fixed-capacity log, most recent entry first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend `entry`, evicting the oldest entry once over capacity.
    pub fn record(&mut self, entry: T) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> BoundedHistory<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

/// Aggregate view over the crash history, for statistics panels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrashSummary {
    pub rounds: usize,
    pub mean: Multiplier,
    pub highest: Multiplier,
    /// Rounds that crashed at or below 2.00x.
    pub at_most_double: usize,
}

impl BoundedHistory<Multiplier> {
    pub fn summary(&self) -> Option<CrashSummary> {
        let highest = *self.entries.iter().max()?;
        let rounds = self.entries.len();
        let total: u64 = self.entries.iter().map(|point| point.hundredths()).sum();
        let double = Multiplier::from_hundredths(200);
        Some(CrashSummary {
            rounds,
            mean: Multiplier::from_hundredths(total / rounds as u64),
            highest,
            at_most_double: self.entries.iter().filter(|point| **point <= double).count(),
        })
    }
}
