use std::sync::Arc;

use chronoshare_address::Address;
use log::{debug, info, warn};

use super::call::{Call, Outcome};
use super::context::{CallContext, Clock, SystemClock};
use super::events::EventRecord;
use super::state::LedgerState;
use super::transaction::Transaction;
use crate::directory::{DeployedPair, SessionDirectory};
use crate::error::{LedgerError, Result};
use crate::registry::ParticipantRegistry;
use crate::session::VoteSession;
use crate::storage::{MemStore, StateStore};
use crate::{Amount, SessionId, Timestamp};

/// In-process execution host.
///
/// Calls are applied one at a time. Each runs against a working copy;
/// only an `Ok` result is written to the store and then to memory.
pub struct Ledger {
    state: LedgerState,
    store: Box<dyn StateStore>,
    clock: Arc<dyn Clock>,
    last_now: Timestamp,
}

impl Ledger {
    /// Empty in-memory ledger on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty in-memory ledger driven by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: LedgerState::genesis(),
            store: Box::new(MemStore::new()),
            clock,
            last_now: 0,
        }
    }

    /// Reloads the committed state from `store`.
    pub fn open(store: impl StateStore + 'static, clock: Arc<dyn Clock>) -> Result<Self> {
        let snapshot = store.load()?;
        let state = LedgerState::from_snapshot(snapshot);
        let last_now = state.events().last().map(|e| e.at).unwrap_or(0);
        info!(
            "ledger opened: {} sessions, {} events",
            state.directory().deployed_session_count(),
            state.events().len()
        );
        Ok(Self {
            state,
            store: Box::new(store),
            clock,
            last_now,
        })
    }

    /// Current time, never earlier than any time already handed out.
    pub fn now(&self) -> Timestamp {
        self.clock.now().max(self.last_now)
    }

    fn tick(&mut self) -> Timestamp {
        let observed = self.clock.now();
        if observed < self.last_now {
            warn!(
                "clock went backwards ({} < {}), holding at {}",
                observed, self.last_now, self.last_now
            );
        }
        self.last_now = observed.max(self.last_now);
        self.last_now
    }

    /// Executes `call` as `caller` with `value` attached.
    pub fn execute(&mut self, caller: Address, value: Amount, call: Call) -> Result<Outcome> {
        let now = self.tick();
        let ctx = CallContext::new(caller, value, now);
        let name = call.name();

        let mut tx = Transaction::new(&self.state);
        let outcome = match tx.run(&ctx, call) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("{} from {} rejected ({:?}): {}", name, caller, e.kind(), e);
                return Err(e);
            }
        };
        let first_seq = self.state.next_event_seq();
        let changes = tx.into_changes(first_seq);

        self.store.commit(&changes)?;
        self.state.apply(changes);
        info!("{} from {} committed at {}", name, caller.short(), now);
        for record in self.events_from(first_seq) {
            info!("event #{} from {}: {:?}", record.seq, record.emitter.short(), record.event);
        }
        Ok(outcome)
    }

    /// Mints `amount` into `account`. Operator bootstrap only.
    pub fn airdrop(&mut self, account: Address, amount: Amount) -> Result<Amount> {
        let mut tx = Transaction::new(&self.state);
        tx.airdrop(account, amount)?;
        let changes = tx.into_changes(self.state.next_event_seq());

        self.store.commit(&changes)?;
        self.state.apply(changes);
        info!("airdropped {} to {}", amount, account);
        Ok(self.balance_of(&account))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn directory(&self) -> &SessionDirectory {
        self.state.directory()
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state.balance_of(account)
    }

    pub fn pair(&self, session_id: SessionId) -> Result<DeployedPair> {
        self.state
            .directory()
            .pair(session_id)
            .ok_or(LedgerError::SessionNotFound(session_id))
    }

    pub fn session(&self, address: &Address) -> Result<&VoteSession> {
        self.state
            .session(address)
            .ok_or(LedgerError::ContractNotFound(*address))
    }

    pub fn registry(&self, address: &Address) -> Result<&ParticipantRegistry> {
        self.state
            .registry(address)
            .ok_or(LedgerError::ContractNotFound(*address))
    }

    pub fn session_by_id(&self, session_id: SessionId) -> Result<&VoteSession> {
        let pair = self.pair(session_id)?;
        self.session(&pair.session)
    }

    pub fn registry_by_id(&self, session_id: SessionId) -> Result<&ParticipantRegistry> {
        let pair = self.pair(session_id)?;
        self.registry(&pair.registry)
    }

    /// Events with `seq >= from`.
    pub fn events_from(&self, from: u64) -> &[EventRecord] {
        let events = self.state.events();
        let start = events.partition_point(|e| e.seq < from);
        &events[start..]
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
