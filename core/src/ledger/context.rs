use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chronoshare_address::Address;

use crate::error::{LedgerError, Result};
use crate::{Amount, Timestamp};

/// Caller identity, attached value and time of a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub value: Amount,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, value: Amount, now: Timestamp) -> Self {
        Self { caller, value, now }
    }

    /// Context for a synchronous call made by the component at `from`.
    /// Cross-component calls never carry value.
    pub fn forward(&self, from: Address) -> Self {
        Self {
            caller: from,
            value: 0,
            now: self.now,
        }
    }

    pub fn require_no_value(&self, operation: &'static str) -> Result<()> {
        if self.value != 0 {
            return Err(LedgerError::UnexpectedValue {
                operation,
                got: self.value,
            });
        }
        Ok(())
    }
}

/// Source of the ledger's current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock in unix seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Settable clock shared between the ledger and whoever drives time
/// (tests, the CLI's pinned time).
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
