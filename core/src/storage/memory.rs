use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use chronoshare_address::Address;
use dashmap::DashMap;

use crate::directory::SessionDirectory;
use crate::ledger::{ChangeSet, EventRecord, LedgerSnapshot};
use crate::registry::ParticipantRegistry;
use crate::session::VoteSession;
use crate::storage::StateStore;
use crate::Amount;

#[derive(Default)]
struct Tables {
    directory: RwLock<Option<SessionDirectory>>,
    sessions: DashMap<Address, VoteSession>,
    registries: DashMap<Address, ParticipantRegistry>,
    balances: DashMap<Address, Amount>,
    events: DashMap<u64, EventRecord>,
}

/// In-memory store. Clones share the same tables, so a ledger can be
/// dropped and reopened over the same data.
#[derive(Clone, Default)]
pub struct MemStore {
    tables: Arc<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self) -> usize {
        self.tables.events.len()
    }
}

impl StateStore for MemStore {
    fn load(&self) -> Result<LedgerSnapshot> {
        let directory = self
            .tables
            .directory
            .read()
            .map_err(|_| anyhow!("directory lock poisoned"))?
            .clone();

        let mut events: Vec<EventRecord> =
            self.tables.events.iter().map(|e| e.value().clone()).collect();
        events.sort_by_key(|e| e.seq);

        Ok(LedgerSnapshot {
            directory,
            sessions: self.tables.sessions.iter().map(|e| e.value().clone()).collect(),
            registries: self
                .tables
                .registries
                .iter()
                .map(|e| e.value().clone())
                .collect(),
            balances: self.tables.balances.iter().map(|e| (*e.key(), *e.value())).collect(),
            events,
        })
    }

    fn commit(&self, changes: &ChangeSet) -> Result<()> {
        if let Some(directory) = &changes.directory {
            *self
                .tables
                .directory
                .write()
                .map_err(|_| anyhow!("directory lock poisoned"))? = Some(directory.clone());
        }
        for session in &changes.sessions {
            self.tables.sessions.insert(session.address(), session.clone());
        }
        for registry in &changes.registries {
            self.tables
                .registries
                .insert(registry.address(), registry.clone());
        }
        for (account, balance) in &changes.balances {
            self.tables.balances.insert(*account, *balance);
        }
        for event in &changes.events {
            self.tables.events.insert(event.seq, event.clone());
        }
        Ok(())
    }
}
