use std::sync::Arc;

use chronoshare_address::Address;
use tokio::sync::Mutex;

use super::call::{Call, Outcome};
use super::engine::Ledger;
use crate::error::Result;
use crate::Amount;

/// Async handle that sequences concurrent callers onto one [`Ledger`].
///
/// Callers are served in whatever order the lock is granted.
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub async fn execute(&self, caller: Address, value: Amount, call: Call) -> Result<Outcome> {
        self.inner.lock().await.execute(caller, value, call)
    }

    pub async fn airdrop(&self, account: Address, amount: Amount) -> Result<Amount> {
        self.inner.lock().await.airdrop(account, amount)
    }

    pub async fn balance_of(&self, account: &Address) -> Amount {
        self.inner.lock().await.balance_of(account)
    }

    /// Runs a read-only closure against the committed state.
    pub async fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let ledger = self.inner.lock().await;
        f(&ledger)
    }
}
