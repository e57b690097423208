//! Test doubles for exercising a [crate::Game] without real infrastructure.

use skytrax_types::{Multiplier, UserId};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{CrashPool, GameConfig, MemoryWallet, Wallet, WalletError};

/// Seed used by tests that need reproducible crash points.
pub const TEST_SEED: [u8; 32] = [42u8; 32];

/// Default timings with every round crashing at `crash_point`.
pub fn test_config(crash_point: Multiplier) -> GameConfig {
    GameConfig {
        crash_pool: CrashPool::fixed(crash_point),
        ..GameConfig::default()
    }
}

/// [MemoryWallet] whose debits or credits can be made to fail on demand.
#[derive(Debug, Default)]
pub struct FailingWallet {
    inner: MemoryWallet,
    fail_debits: AtomicBool,
    fail_credits: AtomicBool,
}

impl FailingWallet {
    pub fn new(initial_balance: u64) -> Self {
        Self {
            inner: MemoryWallet::new(initial_balance),
            fail_debits: AtomicBool::new(false),
            fail_credits: AtomicBool::new(false),
        }
    }

    pub fn fail_debits(&self, fail: bool) {
        self.fail_debits.store(fail, Ordering::SeqCst);
    }

    pub fn fail_credits(&self, fail: bool) {
        self.fail_credits.store(fail, Ordering::SeqCst);
    }
}

impl Wallet for FailingWallet {
    fn debit(&self, user: &UserId, amount: u64) -> Result<(), WalletError> {
        if self.fail_debits.load(Ordering::SeqCst) {
            return Err(WalletError::Unavailable("debit disabled".to_string()));
        }
        self.inner.debit(user, amount)
    }

    fn credit(&self, user: &UserId, amount: u64) -> Result<(), WalletError> {
        if self.fail_credits.load(Ordering::SeqCst) {
            return Err(WalletError::Unavailable("credit disabled".to_string()));
        }
        self.inner.credit(user, amount)
    }

    fn balance(&self, user: &UserId) -> u64 {
        self.inner.balance(user)
    }
}
