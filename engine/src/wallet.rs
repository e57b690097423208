//! Wallet ledger seam.
//!
//! Balances live with the identity provider; the engine only ever asks for a
//! single atomic debit or credit and never writes back a balance it read.

use skytrax_types::{UserId, INITIAL_BALANCE, MAX_DEPOSIT, MIN_DEPOSIT};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tracing::error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: u64, requested: u64 },
    #[error("deposit of {amount} outside the allowed range")]
    InvalidDeposit { amount: u64 },
    #[error("balance overflow")]
    Overflow,
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Amounts are in cents.
pub trait Wallet {
    /// Remove `amount`, failing without side effects if the balance is short.
    fn debit(&self, user: &UserId, amount: u64) -> Result<(), WalletError>;

    fn credit(&self, user: &UserId, amount: u64) -> Result<(), WalletError>;

    fn balance(&self, user: &UserId) -> u64;
}

impl<W: Wallet + ?Sized> Wallet for Arc<W> {
    fn debit(&self, user: &UserId, amount: u64) -> Result<(), WalletError> {
        (**self).debit(user, amount)
    }

    fn credit(&self, user: &UserId, amount: u64) -> Result<(), WalletError> {
        (**self).credit(user, amount)
    }

    fn balance(&self, user: &UserId) -> u64 {
        (**self).balance(user)
    }
}

/// In-process ledger shared by every room of a server.
///
/// Accounts open lazily with `initial_balance` the first time they are touched.
#[derive(Debug)]
pub struct MemoryWallet {
    accounts: Mutex<HashMap<UserId, u64>>,
    initial_balance: u64,
}

impl Default for MemoryWallet {
    fn default() -> Self {
        Self::new(INITIAL_BALANCE)
    }
}

impl MemoryWallet {
    pub fn new(initial_balance: u64) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            initial_balance,
        }
    }

    /// Apply `op` to the user's balance under the lock, opening the account if needed.
    fn update(
        &self,
        user: &UserId,
        op: impl FnOnce(u64) -> Result<u64, WalletError>,
    ) -> Result<u64, WalletError> {
        let mut accounts = self.accounts.lock().map_err(|e| {
            error!("Failed to acquire wallet lock: {}", e);
            WalletError::Unavailable("wallet lock poisoned".to_string())
        })?;
        let balance = accounts
            .entry(user.clone())
            .or_insert(self.initial_balance);
        *balance = op(*balance)?;
        Ok(*balance)
    }

    /// Add funds from outside the game. Returns the new balance.
    pub fn deposit(&self, user: &UserId, amount: u64) -> Result<u64, WalletError> {
        if !(MIN_DEPOSIT..=MAX_DEPOSIT).contains(&amount) {
            return Err(WalletError::InvalidDeposit { amount });
        }
        self.update(user, |balance| {
            balance.checked_add(amount).ok_or(WalletError::Overflow)
        })
    }
}

impl Wallet for MemoryWallet {
    fn debit(&self, user: &UserId, amount: u64) -> Result<(), WalletError> {
        self.update(user, |balance| {
            balance
                .checked_sub(amount)
                .ok_or(WalletError::InsufficientFunds {
                    balance,
                    requested: amount,
                })
        })
        .map(|_| ())
    }

    fn credit(&self, user: &UserId, amount: u64) -> Result<(), WalletError> {
        self.update(user, |balance| {
            balance.checked_add(amount).ok_or(WalletError::Overflow)
        })
        .map(|_| ())
    }

    fn balance(&self, user: &UserId) -> u64 {
        match self.accounts.lock() {
            Ok(accounts) => accounts
                .get(user)
                .copied()
                .unwrap_or(self.initial_balance),
            Err(e) => {
                error!("Failed to acquire wallet lock in balance: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_accounts_open_with_initial_balance() {
        let wallet = MemoryWallet::default();
        let user = UserId::from("ada");
        assert_eq!(wallet.balance(&user), INITIAL_BALANCE);
        wallet.credit(&user, 5_00).unwrap();
        assert_eq!(wallet.balance(&user), INITIAL_BALANCE + 5_00);
    }

    #[test]
    fn test_debit_is_all_or_nothing() {
        let wallet = MemoryWallet::new(20_00);
        let user = UserId::from("ada");
        assert_eq!(
            wallet.debit(&user, 50_00),
            Err(WalletError::InsufficientFunds {
                balance: 20_00,
                requested: 50_00
            })
        );
        assert_eq!(wallet.balance(&user), 20_00);
        wallet.debit(&user, 20_00).unwrap();
        assert_eq!(wallet.balance(&user), 0);
    }

    #[test]
    fn test_deposit_limits() {
        let wallet = MemoryWallet::new(0);
        let user = UserId::from("ada");
        assert_eq!(
            wallet.deposit(&user, 50),
            Err(WalletError::InvalidDeposit { amount: 50 })
        );
        assert_eq!(
            wallet.deposit(&user, MAX_DEPOSIT + 1),
            Err(WalletError::InvalidDeposit {
                amount: MAX_DEPOSIT + 1
            })
        );
        assert_eq!(wallet.deposit(&user, 100_00), Ok(100_00));
    }

    #[test]
    fn test_concurrent_debits_never_overdraw() {
        let wallet = Arc::new(MemoryWallet::new(100_00));
        let user = UserId::from("shared");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let wallet = wallet.clone();
                let user = user.clone();
                thread::spawn(move || {
                    (0..10)
                        .filter(|_| wallet.debit(&user, 3_00).is_ok())
                        .count()
                })
            })
            .collect();
        let successes: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(successes, 33);
        assert_eq!(wallet.balance(&user), 100_00 - 33 * 3_00);
    }
}
