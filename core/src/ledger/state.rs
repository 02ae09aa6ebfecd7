use std::collections::BTreeMap;

use chronoshare_address::Address;
use serde::{Deserialize, Serialize};

use super::events::EventRecord;
use crate::directory::SessionDirectory;
use crate::registry::ParticipantRegistry;
use crate::session::VoteSession;
use crate::Amount;

/// Address of the single directory every ledger hosts.
pub fn directory_address() -> Address {
    Address::contract(&Address::ZERO, "directory", 0)
}

/// Everything a store persists, as loaded on startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub directory: Option<SessionDirectory>,
    pub sessions: Vec<VoteSession>,
    pub registries: Vec<ParticipantRegistry>,
    pub balances: Vec<(Address, Amount)>,
    pub events: Vec<EventRecord>,
}

/// The committed effects of one successful call. Components appear whole,
/// balances carry their new absolute value, events are already sequenced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub directory: Option<SessionDirectory>,
    pub sessions: Vec<VoteSession>,
    pub registries: Vec<ParticipantRegistry>,
    pub balances: Vec<(Address, Amount)>,
    pub events: Vec<EventRecord>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.directory.is_none()
            && self.sessions.is_empty()
            && self.registries.is_empty()
            && self.balances.is_empty()
            && self.events.is_empty()
    }
}

/// Committed ledger state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    pub(crate) directory: SessionDirectory,
    pub(crate) sessions: BTreeMap<Address, VoteSession>,
    pub(crate) registries: BTreeMap<Address, ParticipantRegistry>,
    pub(crate) balances: BTreeMap<Address, Amount>,
    pub(crate) events: Vec<EventRecord>,
}

impl LedgerState {
    pub fn genesis() -> Self {
        Self {
            directory: SessionDirectory::new(directory_address()),
            sessions: BTreeMap::new(),
            registries: BTreeMap::new(),
            balances: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let mut events = snapshot.events;
        events.sort_by_key(|e| e.seq);
        Self {
            directory: snapshot
                .directory
                .unwrap_or_else(|| SessionDirectory::new(directory_address())),
            sessions: snapshot
                .sessions
                .into_iter()
                .map(|s| (s.address(), s))
                .collect(),
            registries: snapshot
                .registries
                .into_iter()
                .map(|r| (r.address(), r))
                .collect(),
            balances: snapshot.balances.into_iter().collect(),
            events,
        }
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    pub fn session(&self, address: &Address) -> Option<&VoteSession> {
        self.sessions.get(address)
    }

    pub fn registry(&self, address: &Address) -> Option<&ParticipantRegistry> {
        self.registries.get(address)
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn next_event_seq(&self) -> u64 {
        self.events.last().map(|e| e.seq + 1).unwrap_or(0)
    }

    pub(crate) fn apply(&mut self, changes: ChangeSet) {
        if let Some(directory) = changes.directory {
            self.directory = directory;
        }
        for session in changes.sessions {
            self.sessions.insert(session.address(), session);
        }
        for registry in changes.registries {
            self.registries.insert(registry.address(), registry);
        }
        self.balances.extend(changes.balances);
        self.events.extend(changes.events);
    }
}

impl Default for LedgerState {
    fn default() -> Self {
        Self::genesis()
    }
}
