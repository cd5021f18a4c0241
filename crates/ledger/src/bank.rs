use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use tradepost_core::AccountId;

/// Funds-movement error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("unknown account: {0}")]
    UnknownAccount(AccountId),

    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: u64, required: u64 },

    #[error("balance overflow crediting {0}")]
    BalanceOverflow(AccountId),

    #[error("funds store unavailable: {0}")]
    Unavailable(String),
}

/// The fund-transfer primitive ledgers bind their state transitions to.
///
/// Implementations must be all-or-nothing: when a call returns an error, no
/// balance has changed. A remote implementation should apply a timeout and
/// report a timeout as failure; calling ledgers treat every error as
/// failed-and-rolled-back, never as "possibly succeeded".
pub trait FundsTransfer: Send + Sync {
    /// Move `amount` from `from` to `to`.
    fn transfer(&self, from: AccountId, to: AccountId, amount: u64) -> Result<(), TransferError>;

    /// Move several amounts from one payer to many recipients as a single
    /// atomic operation: either every leg commits or none does.
    fn transfer_split(
        &self,
        from: AccountId,
        legs: &[(AccountId, u64)],
    ) -> Result<(), TransferError>;
}

/// In-memory account balances.
///
/// Intended for tests/dev and in-process hosting. Debits require an opened,
/// sufficiently funded account; credits open the recipient on first use.
#[derive(Debug, Default)]
pub struct InMemoryBank {
    balances: RwLock<HashMap<AccountId, u64>>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `account` with an initial balance. No-op if already open.
    pub fn open_account(&self, account: AccountId, initial: u64) {
        if let Ok(mut balances) = self.balances.write() {
            balances.entry(account).or_insert(initial);
        }
    }

    /// Credit `amount` to `account`, opening it if needed.
    pub fn deposit(&self, account: AccountId, amount: u64) -> Result<(), TransferError> {
        let mut balances = self.write_balances()?;
        let balance = balances.entry(account).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(TransferError::BalanceOverflow(account))?;
        Ok(())
    }

    /// Current balance; zero for accounts never seen.
    pub fn balance_of(&self, account: AccountId) -> u64 {
        match self.balances.read() {
            Ok(balances) => balances.get(&account).copied().unwrap_or(0),
            Err(_) => 0,
        }
    }

    fn write_balances(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<AccountId, u64>>, TransferError> {
        self.balances
            .write()
            .map_err(|_| TransferError::Unavailable("balance lock poisoned".to_string()))
    }
}

impl FundsTransfer for InMemoryBank {
    fn transfer(&self, from: AccountId, to: AccountId, amount: u64) -> Result<(), TransferError> {
        self.transfer_split(from, &[(to, amount)])
    }

    fn transfer_split(
        &self,
        from: AccountId,
        legs: &[(AccountId, u64)],
    ) -> Result<(), TransferError> {
        let mut balances = self.write_balances()?;

        // Stage the outcome; commit only once every leg has cleared.
        let mut staged = balances.clone();
        for (to, amount) in legs {
            let payer = staged
                .get_mut(&from)
                .ok_or(TransferError::UnknownAccount(from))?;
            if *payer < *amount {
                return Err(TransferError::InsufficientFunds {
                    balance: *payer,
                    required: *amount,
                });
            }
            *payer -= *amount;

            let recipient = staged.entry(*to).or_insert(0);
            *recipient = recipient
                .checked_add(*amount)
                .ok_or(TransferError::BalanceOverflow(*to))?;
        }

        *balances = staged;
        Ok(())
    }
}
