use anyhow::Result;

use crate::ledger::{ChangeSet, LedgerSnapshot};

/// Decouples the ledger from where its committed state lives.
pub trait StateStore: Send + Sync {
    /// Everything committed so far. An empty store yields an empty snapshot.
    fn load(&self) -> Result<LedgerSnapshot>;

    /// Persists one committed call. Must be all-or-nothing.
    fn commit(&self, changes: &ChangeSet) -> Result<()>;
}
